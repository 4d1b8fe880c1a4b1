//! Classifies a user-supplied skill source string.
//!
//! Recognition is an ordered list of recognizers where the first match wins.
//! The URL shapes overlap (a GitHub tree URL, a GitHub blob URL and a bare
//! HTTPS URL can all live on the same host), so the order below is part of
//! the contract:
//!
//! 1. local path
//! 2. direct `SKILL.md` URL (GitHub/GitLab only for blob/raw file links)
//! 3. GitHub tree with subpath
//! 4. GitHub tree, ref only
//! 5. GitHub repository root
//! 6. GitLab tree with subpath
//! 7. GitLab tree, ref only
//! 8. GitLab repository root
//! 9. `owner/repo@skill` shorthand
//! 10. `owner/repo[/subpath]` shorthand
//! 11. well-known discovery endpoint
//! 12. anything else: a generic git remote

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use {
    regex::Regex,
    serde::{Deserialize, Serialize},
    tracing::debug,
    url::Url,
};

use crate::{
    error::{Error, Result},
    types::is_skill_file,
};

/// Hosts that never serve a well-known skills index.
pub const WELL_KNOWN_EXCLUDED_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "huggingface.co",
    "raw.githubusercontent.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Github,
    Gitlab,
    Git,
    Local,
    DirectUrl,
    WellKnown,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Git => "git",
            Self::Local => "local",
            Self::DirectUrl => "direct-url",
            Self::WellKnown => "well-known",
        }
    }

    /// Sources fetched by cloning a repository.
    pub fn is_git(self) -> bool {
        matches!(self, Self::Github | Self::Gitlab | Self::Git)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified skill source. Built once per resolution and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSource {
    pub kind: SourceKind,
    /// Repository or resource URL; empty for local sources.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Absolute path, set only for local sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_filter: Option<String>,
}

impl ParsedSource {
    fn remote(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            local_path: None,
            reference: None,
            subpath: None,
            skill_filter: None,
        }
    }

    fn local(path: PathBuf) -> Self {
        Self {
            kind: SourceKind::Local,
            url: String::new(),
            local_path: Some(path),
            reference: None,
            subpath: None,
            skill_filter: None,
        }
    }

    fn with_ref(mut self, reference: &str) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    fn with_subpath(mut self, subpath: &str) -> Self {
        let subpath = subpath.trim_matches('/');
        if !subpath.is_empty() {
            self.subpath = Some(subpath.to_string());
        }
        self
    }

    fn with_skill_filter(mut self, filter: &str) -> Self {
        self.skill_filter = Some(filter.to_string());
        self
    }

    /// Human-readable origin for logs and errors.
    pub fn display_location(&self) -> String {
        match &self.local_path {
            Some(path) => path.display().to_string(),
            None => self.url.clone(),
        }
    }
}

// ── Patterns ─────────────────────────────────────────────────────────────────

fn regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => unreachable!("invalid built-in pattern {pattern}: {e}"),
    }
}

static DRIVE_LETTER: LazyLock<Regex> = LazyLock::new(|| regex(r"^[A-Za-z]:[/\\]"));
static GITHUB_TREE_SUBPATH: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+)/tree/([^/]+)/(.+?)/?$")
});
static GITHUB_TREE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+)/tree/([^/]+)/?$")
});
static GITHUB_REPO: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(?:https?://)?(?:www\.)?github\.com/([^/]+)/([^/]+?)/?$"));
static GITLAB_TREE_SUBPATH: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(https?)://([^/]+)/(.+?)/-/tree/([^/]+)/(.+?)/?$"));
static GITLAB_TREE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(https?)://([^/]+)/(.+?)/-/tree/([^/]+)/?$"));
static GITLAB_REPO: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(?:https?://)?(?:www\.)?gitlab\.com/([^/]+)/([^/]+?)/?$"));
static SHORTHAND_WITH_SKILL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^([^/@\s]+)/([^/@\s]+)@([^/@\s]+)$"));
static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^([^/@\s]+)/([^/@\s]+)(?:/([^@\s]+?))?/?$"));

fn strip_git_suffix(repo: &str) -> &str {
    repo.strip_suffix(".git").unwrap_or(repo)
}

fn github_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{}.git", strip_git_suffix(repo))
}

fn gitlab_url(scheme: &str, host: &str, path: &str) -> String {
    format!("{scheme}://{host}/{}.git", strip_git_suffix(path))
}

fn http_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn ends_with_skill_file(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(is_skill_file)
}

fn is_github_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com")
}

fn is_gitlab_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("gitlab.com") || host.eq_ignore_ascii_case("www.gitlab.com")
}

// ── Recognizers ──────────────────────────────────────────────────────────────

type Recognizer = fn(&str) -> Result<Option<ParsedSource>>;

/// Recognizers in precedence order; the first `Some` wins.
const RECOGNIZERS: &[(&str, Recognizer)] = &[
    ("local-path", local_path),
    ("direct-url", direct_url),
    ("github-tree-subpath", github_tree_with_subpath),
    ("github-tree", github_tree),
    ("github-repo", github_repo),
    ("gitlab-tree-subpath", gitlab_tree_with_subpath),
    ("gitlab-tree", gitlab_tree),
    ("gitlab-repo", gitlab_repo),
    ("github-shorthand-skill", github_shorthand_with_skill),
    ("github-shorthand", github_shorthand),
    ("well-known", well_known),
];

/// Classify a raw source string.
pub fn parse_source(input: &str) -> Result<ParsedSource> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::EmptySource);
    }

    for (name, recognize) in RECOGNIZERS {
        if let Some(parsed) = recognize(input)? {
            debug!(recognizer = name, kind = %parsed.kind, source = input, "classified skill source");
            return Ok(parsed);
        }
    }

    debug!(source = input, "treating skill source as generic git remote");
    Ok(ParsedSource::remote(SourceKind::Git, input))
}

fn local_path(input: &str) -> Result<Option<ParsedSource>> {
    let looks_local = input.starts_with('/')
        || input.starts_with("./")
        || input.starts_with("../")
        || input.starts_with(".\\")
        || input.starts_with("..\\")
        || input == "."
        || input == ".."
        || DRIVE_LETTER.is_match(input);
    if !looks_local {
        return Ok(None);
    }

    let path = std::path::absolute(Path::new(input)).map_err(|source| Error::LocalPath {
        path: input.to_string(),
        source,
    })?;
    Ok(Some(ParsedSource::local(path)))
}

/// A single `SKILL.md` over HTTP(S). On GitHub and GitLab only file links
/// (`/blob/`, `/raw/`, `/-/raw/`, `/-/blob/`) count; tree URLs fall through
/// to the repository recognizers.
fn direct_url(input: &str) -> Result<Option<ParsedSource>> {
    let Some(url) = http_url(input) else {
        return Ok(None);
    };
    if !ends_with_skill_file(url.path()) {
        return Ok(None);
    }

    let host = url.host_str().unwrap_or_default();
    let resolved = if is_github_host(host) {
        match github_raw_url(url.path()) {
            Some(raw) => raw,
            None => return Ok(None),
        }
    } else if is_gitlab_host(host) {
        if url.path().contains("/-/raw/") {
            input.to_string()
        } else if url.path().contains("/-/blob/") {
            input.replacen("/-/blob/", "/-/raw/", 1)
        } else {
            return Ok(None);
        }
    } else {
        input.to_string()
    };

    Ok(Some(ParsedSource::remote(SourceKind::DirectUrl, resolved)))
}

/// `/<owner>/<repo>/(blob|raw)/<ref>/<path>` to its raw.githubusercontent.com form.
fn github_raw_url(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.trim_start_matches('/').splitn(5, '/').collect();
    match segments.as_slice() {
        [owner, repo, "blob" | "raw", reference, rest] if !rest.is_empty() => Some(format!(
            "https://raw.githubusercontent.com/{owner}/{repo}/{reference}/{rest}"
        )),
        _ => None,
    }
}

fn github_tree_with_subpath(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITHUB_TREE_SUBPATH.captures(input).map(|c| {
        ParsedSource::remote(SourceKind::Github, github_url(&c[1], &c[2]))
            .with_ref(&c[3])
            .with_subpath(&c[4])
    }))
}

fn github_tree(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITHUB_TREE.captures(input).map(|c| {
        ParsedSource::remote(SourceKind::Github, github_url(&c[1], &c[2])).with_ref(&c[3])
    }))
}

fn github_repo(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITHUB_REPO
        .captures(input)
        .map(|c| ParsedSource::remote(SourceKind::Github, github_url(&c[1], &c[2]))))
}

fn gitlab_tree_with_subpath(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITLAB_TREE_SUBPATH
        .captures(input)
        .filter(|c| !is_github_host(&c[2]))
        .map(|c| {
            ParsedSource::remote(SourceKind::Gitlab, gitlab_url(&c[1], &c[2], &c[3]))
                .with_ref(&c[4])
                .with_subpath(&c[5])
        }))
}

fn gitlab_tree(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITLAB_TREE
        .captures(input)
        .filter(|c| !is_github_host(&c[2]))
        .map(|c| {
            ParsedSource::remote(SourceKind::Gitlab, gitlab_url(&c[1], &c[2], &c[3]))
                .with_ref(&c[4])
        }))
}

fn gitlab_repo(input: &str) -> Result<Option<ParsedSource>> {
    Ok(GITLAB_REPO.captures(input).map(|c| {
        ParsedSource::remote(
            SourceKind::Gitlab,
            gitlab_url("https", "gitlab.com", &format!("{}/{}", &c[1], &c[2])),
        )
    }))
}

/// Bare shorthand never carries a scheme, a leading `.`/`/`, or a colon
/// (which would make it an SSH remote such as `git@host:owner/repo`).
fn is_shorthand_candidate(input: &str) -> bool {
    !input.contains(':') && !input.starts_with('.') && !input.starts_with('/')
}

fn github_shorthand_with_skill(input: &str) -> Result<Option<ParsedSource>> {
    if !is_shorthand_candidate(input) {
        return Ok(None);
    }
    Ok(SHORTHAND_WITH_SKILL.captures(input).map(|c| {
        ParsedSource::remote(SourceKind::Github, github_url(&c[1], &c[2])).with_skill_filter(&c[3])
    }))
}

fn github_shorthand(input: &str) -> Result<Option<ParsedSource>> {
    if !is_shorthand_candidate(input) {
        return Ok(None);
    }
    Ok(SHORTHAND.captures(input).map(|c| {
        let source = ParsedSource::remote(SourceKind::Github, github_url(&c[1], &c[2]));
        match c.get(3) {
            Some(subpath) => source.with_subpath(subpath.as_str()),
            None => source,
        }
    }))
}

fn well_known(input: &str) -> Result<Option<ParsedSource>> {
    let Some(url) = http_url(input) else {
        return Ok(None);
    };
    let Some(host) = url.host_str() else {
        return Ok(None);
    };
    if WELL_KNOWN_EXCLUDED_HOSTS
        .iter()
        .any(|excluded| host.eq_ignore_ascii_case(excluded))
    {
        return Ok(None);
    }
    let path = url.path().to_ascii_lowercase();
    if ends_with_skill_file(&path) || path.ends_with(".git") {
        return Ok(None);
    }

    Ok(Some(ParsedSource::remote(
        SourceKind::WellKnown,
        input.trim_end_matches('/'),
    )))
}
