use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// File that marks a directory as a skill. Matched case-insensitively.
pub const SKILL_FILE: &str = "SKILL.md";

/// Free-form `metadata` block from the front matter.
pub type Metadata = BTreeMap<String, serde_yaml::Value>;

/// Front-matter key that overrides the derived install name.
pub const INSTALL_NAME_KEY: &str = "install-name";

/// Whether `name` is the skill marker file, ignoring case.
pub fn is_skill_file(name: &str) -> bool {
    name.eq_ignore_ascii_case(SKILL_FILE)
}

// ── Front matter ─────────────────────────────────────────────────────────────

/// Structured header of a skill document.
///
/// A document without a (closed) header yields the default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub name: String,
    pub description: String,
    pub metadata: Metadata,
}

impl Frontmatter {
    /// Non-blank string value of `metadata.<key>`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)?
            .as_str()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

// ── Remote skill ─────────────────────────────────────────────────────────────

/// A fetched, validated skill ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteSkill {
    pub name: String,
    pub description: String,
    /// Full `SKILL.md` text, front matter included.
    pub content: String,
    pub install_name: String,
    /// Where the document was fetched from.
    pub source_url: String,
    /// Auxiliary files keyed by relative path (well-known sources only).
    pub files: BTreeMap<String, String>,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_file_match_ignores_case() {
        assert!(is_skill_file("SKILL.md"));
        assert!(is_skill_file("skill.md"));
        assert!(is_skill_file("Skill.MD"));
        assert!(!is_skill_file("SKILL.markdown"));
    }

    #[test]
    fn metadata_str_skips_blank_and_non_string() {
        let mut fm = Frontmatter::default();
        fm.metadata
            .insert("install-name".into(), serde_yaml::Value::String("  ".into()));
        fm.metadata
            .insert("count".into(), serde_yaml::Value::Number(3.into()));
        fm.metadata
            .insert("site".into(), serde_yaml::Value::String(" docs ".into()));
        assert_eq!(fm.metadata_str("install-name"), None);
        assert_eq!(fm.metadata_str("count"), None);
        assert_eq!(fm.metadata_str("site"), Some("docs"));
        assert_eq!(fm.metadata_str("missing"), None);
    }
}
