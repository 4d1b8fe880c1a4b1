//! Pluggable providers for skills hosted as a single document over HTTP.
//!
//! A [`ProviderRegistry`] is an ordered list: the first registered provider
//! whose [`SkillProvider::matches`] accepts a URL handles it.

pub mod direct;
pub mod huggingface;
pub mod mintlify;

use std::sync::{Arc, RwLock};

use {async_trait::async_trait, tokio_util::sync::CancellationToken, url::Url};

use crate::{
    error::{Error, Result},
    frontmatter,
    http::HttpFetcher,
    types::{Frontmatter, RemoteSkill, is_skill_file},
};

pub use {direct::DirectProvider, huggingface::HuggingFaceProvider, mintlify::MintlifyProvider};

/// Outcome of [`SkillProvider::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMatch {
    pub matches: bool,
    /// Provenance tag, set when `matches` is true.
    pub source_identifier: Option<String>,
}

impl ProviderMatch {
    pub fn yes(source_identifier: impl Into<String>) -> Self {
        Self {
            matches: true,
            source_identifier: Some(source_identifier.into()),
        }
    }

    pub fn no() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait SkillProvider: Send + Sync {
    /// Stable identifier, e.g. `huggingface`.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Whether this provider handles `url`. Pure: no I/O.
    fn matches(&self, url: &str) -> ProviderMatch;

    /// Fetch and validate the skill document at `url`.
    async fn fetch_skill(
        &self,
        url: &str,
        http: &HttpFetcher,
        cancel: &CancellationToken,
    ) -> Result<RemoteSkill>;

    /// Browsing URL to raw-content URL. Identity by default.
    fn to_raw_url(&self, url: &str) -> String {
        url.to_string()
    }

    /// Provenance tag derived from the URL alone.
    fn source_identifier(&self, url: &str) -> String;
}

/// Ordered, thread-safe set of providers.
///
/// Lookups take a shared lock and may run concurrently; registration takes
/// the exclusive lock. There is no unregistration.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn SkillProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers. Mintlify, when enabled, sits in
    /// front of the plain direct provider since both accept the same URLs.
    pub fn with_defaults(enable_mintlify: bool) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(HuggingFaceProvider));
        if enable_mintlify {
            registry.register(Arc::new(MintlifyProvider));
        }
        registry.register(Arc::new(DirectProvider));
        registry
    }

    /// Append `provider` at the lowest priority.
    pub fn register(&self, provider: Arc<dyn SkillProvider>) {
        tracing::debug!(provider = provider.id(), "registering skill provider");
        self.providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(provider);
    }

    /// First provider that matches `url`, in registration order.
    pub fn find(&self, url: &str) -> Option<Arc<dyn SkillProvider>> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.matches(url).matches)
            .cloned()
    }

    /// `(id, display name)` of every provider in priority order.
    pub fn providers(&self) -> Vec<(&'static str, &'static str)> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|p| (p.id(), p.display_name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Parse a fetched document's front matter and require a name and description.
pub(crate) fn validated_frontmatter(origin: &str, content: &str) -> Result<Frontmatter> {
    let (fm, _body) = frontmatter::extract(content)
        .map_err(|e| Error::invalid_skill(origin, e.to_string()))?;
    if fm.name.is_empty() {
        return Err(Error::invalid_skill(origin, "front matter has no `name`"));
    }
    if fm.description.is_empty() {
        return Err(Error::invalid_skill(
            origin,
            "front matter has no `description`",
        ));
    }
    Ok(fm)
}

/// `http(s)` URL whose last path segment is the skill file.
pub(crate) fn parse_skill_document_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let last = parsed.path_segments()?.next_back()?;
    is_skill_file(last).then_some(parsed)
}

/// Name of the directory that holds the document, e.g. `pdf` for
/// `https://host/skills/pdf/SKILL.md`. Empty when the file sits at the root.
pub(crate) fn parent_dir_name(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [.., parent, _file] => (*parent).to_string(),
        _ => String::new(),
    }
}

/// Install-name hint for a skill document URL.
///
/// A document at the root of a raw repository link
/// (`raw.githubusercontent.com/<owner>/<repo>/<ref>/SKILL.md` or
/// `<project>/-/raw/<ref>/SKILL.md`) would otherwise be named after the ref,
/// so the repository name is used instead.
pub(crate) fn document_dir_hint(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let github_raw = url.host_str() == Some("raw.githubusercontent.com");
    match segments.as_slice() {
        [_owner, repo, _ref, _file] if github_raw => (*repo).to_string(),
        [.., repo, "-", "raw", _ref, _file] => (*repo).to_string(),
        _ => parent_dir_name(url),
    }
}
