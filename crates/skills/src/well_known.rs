//! Skills published under `<base>/.well-known/skills/`.
//!
//! The index at `<base>/.well-known/skills/index.json` is attacker-controlled.
//! It is validated as a whole before any entry is used: one bad entry rejects
//! the entire index. Declared file paths end up in fetch URLs, so absolute
//! paths and `..` segments are refused.

use std::collections::BTreeMap;

use {
    serde::{Deserialize, Serialize},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    url::Url,
};

use crate::{
    error::{Error, Result},
    http::HttpFetcher,
    naming::{self, MAX_NAME_LEN},
    providers::validated_frontmatter,
    types::{RemoteSkill, SKILL_FILE, is_skill_file},
};

const WELL_KNOWN_DIR: &str = ".well-known/skills";
const INDEX_FILE: &str = "index.json";

/// Index document as served. Nothing in it is trusted until
/// [`WellKnownIndex::validate`] succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownIndex {
    #[serde(default)]
    pub skills: Vec<WellKnownSkillEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownSkillEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// An index in which every entry passed validation, together with the
/// skills directory it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIndex {
    skills_base: String,
    skills: Vec<WellKnownSkillEntry>,
}

impl WellKnownIndex {
    /// Validate every entry; any problem rejects the whole index with one
    /// error listing all problems found.
    pub fn validate(self, index_url: &str, skills_base: &str) -> Result<ValidatedIndex> {
        if self.skills.is_empty() {
            return Err(Error::invalid_index(index_url, "index lists no skills"));
        }

        let problems: Vec<String> = self
            .skills
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| {
                entry_problems(entry)
                    .into_iter()
                    .map(move |p| format!("entry {i} ('{}'): {p}", entry.name))
            })
            .collect();
        if !problems.is_empty() {
            return Err(Error::invalid_index(index_url, problems.join("; ")));
        }

        Ok(ValidatedIndex {
            skills_base: skills_base.trim_end_matches('/').to_string(),
            skills: self.skills,
        })
    }
}

fn entry_problems(entry: &WellKnownSkillEntry) -> Vec<String> {
    let mut problems = Vec::new();

    if entry.name.is_empty() {
        problems.push("name is empty".to_string());
    } else if entry.name.len() > MAX_NAME_LEN {
        problems.push(format!("name is longer than {MAX_NAME_LEN} characters"));
    } else if !naming::is_valid_skill_name(&entry.name) {
        problems.push("name must be lowercase alphanumeric with inner hyphens".to_string());
    }

    if entry.description.trim().is_empty() {
        problems.push("description is empty".to_string());
    }

    if entry.files.is_empty() {
        problems.push("files is empty".to_string());
    } else if !entry.files.iter().any(|f| is_skill_file(f)) {
        problems.push(format!("files does not include {SKILL_FILE}"));
    }

    for file in &entry.files {
        if let Some(reason) = unsafe_file_path(file) {
            problems.push(format!("file '{file}' {reason}"));
        }
    }

    problems
}

/// Why `path` may not be used as a relative file path, if it may not.
pub(crate) fn unsafe_file_path(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        Some("is empty")
    } else if path.starts_with('/') || path.starts_with('\\') {
        Some("is absolute")
    } else if path.split(['/', '\\']).any(|segment| segment == "..") {
        Some("contains a parent-directory segment")
    } else {
        None
    }
}

impl ValidatedIndex {
    pub fn skills(&self) -> &[WellKnownSkillEntry] {
        &self.skills
    }

    /// `<base>/.well-known/skills` the index was served from.
    pub fn skills_base(&self) -> &str {
        &self.skills_base
    }

    /// Pick an entry by name, or the only entry when no name is given.
    pub fn select(&self, name: Option<&str>) -> Result<&WellKnownSkillEntry> {
        match name {
            Some(name) => self
                .skills
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::SkillNotFound {
                    name: name.to_string(),
                    location: self.skills_base.clone(),
                }),
            None => match self.skills.as_slice() {
                [only] => Ok(only),
                many => Err(Error::invalid_skill(
                    &self.skills_base,
                    format!(
                        "index lists {} skills, choose one of: {}",
                        many.len(),
                        many.iter()
                            .map(|e| e.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )),
            },
        }
    }
}

/// Candidate `(skills base, index URL)` pairs for `base_url`, in order: the
/// URL as given, then the host root when the URL has a path. Query and
/// fragment are dropped.
pub fn index_candidates(base_url: &str) -> Result<Vec<(String, String)>> {
    let mut parsed =
        Url::parse(base_url).map_err(|e| Error::invalid_index(base_url, e.to_string()))?;
    parsed.set_query(None);
    parsed.set_fragment(None);

    let trimmed = parsed.as_str().trim_end_matches('/');
    let mut bases = vec![format!("{trimmed}/{WELL_KNOWN_DIR}")];
    if !matches!(parsed.path(), "" | "/") {
        bases.push(format!(
            "{}/{WELL_KNOWN_DIR}",
            parsed.origin().ascii_serialization()
        ));
    }

    Ok(bases
        .into_iter()
        .map(|base| {
            let index = format!("{base}/{INDEX_FILE}");
            (base, index)
        })
        .collect())
}

/// Find and validate the index for `base_url`.
///
/// Network errors, non-200 responses, unparsable bodies and invalid indexes
/// all move on to the next candidate; only exhausting the candidates fails.
pub async fn discover_index(
    http: &HttpFetcher,
    base_url: &str,
    cancel: &CancellationToken,
) -> Result<ValidatedIndex> {
    let mut last_reason = String::from("no candidate URLs");

    for (skills_base, index_url) in index_candidates(base_url)? {
        debug!(url = %index_url, "trying well-known skills index");
        let body = match http.get_text(&index_url, cancel).await {
            Ok(body) => body,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                debug!(url = %index_url, error = %e, "well-known index unavailable");
                last_reason = e.to_string();
                continue;
            },
        };

        let index: WellKnownIndex = match serde_json::from_str(&body) {
            Ok(index) => index,
            Err(e) => {
                warn!(url = %index_url, error = %e, "unparsable well-known index");
                last_reason = format!("invalid JSON at {index_url}: {e}");
                continue;
            },
        };

        match index.validate(&index_url, &skills_base) {
            Ok(valid) => {
                info!(url = %index_url, skills = valid.skills.len(), "found well-known skills index");
                return Ok(valid);
            },
            Err(e) => {
                warn!(url = %index_url, error = %e, "rejected well-known index");
                last_reason = e.to_string();
            },
        }
    }

    Err(Error::WellKnownIndexNotFound {
        base: base_url.to_string(),
        reason: last_reason,
    })
}

/// Fetch one entry: its `SKILL.md` (required) and every other declared file
/// (best effort; failures are skipped).
pub async fn fetch_entry(
    http: &HttpFetcher,
    index: &ValidatedIndex,
    entry: &WellKnownSkillEntry,
    cancel: &CancellationToken,
) -> Result<RemoteSkill> {
    let skill_base = format!("{}/{}", index.skills_base, entry.name);
    let doc_url = format!("{skill_base}/{SKILL_FILE}");

    let content = http.get_text(&doc_url, cancel).await?;
    let fm = validated_frontmatter(&doc_url, &content)?;

    let mut files = BTreeMap::new();
    for file in entry.files.iter().filter(|f| !is_skill_file(f)) {
        let file_url = format!("{skill_base}/{file}");
        match http.get_text(&file_url, cancel).await {
            Ok(body) => {
                files.insert(file.clone(), body);
            },
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(url = %file_url, error = %e, "skipping well-known skill file");
            },
        }
    }

    let install_name = naming::resolve_install_name(&fm, &entry.name, &entry.name);
    info!(skill = %entry.name, files = files.len(), "fetched well-known skill");
    Ok(RemoteSkill {
        name: fm.name,
        description: fm.description,
        content,
        install_name,
        source_url: doc_url,
        files,
        metadata: fm.metadata,
    })
}

/// Discover the index at `base_url` and fetch the selected skill.
pub async fn fetch_well_known_skill(
    http: &HttpFetcher,
    base_url: &str,
    skill: Option<&str>,
    cancel: &CancellationToken,
) -> Result<RemoteSkill> {
    let index = discover_index(http, base_url, cancel).await?;
    let entry = index.select(skill)?;
    fetch_entry(http, &index, entry, cancel).await
}
