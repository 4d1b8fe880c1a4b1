//! Locating skill directories on disk.

use std::path::{Path, PathBuf};

use {tracing::debug, walkdir::WalkDir};

use crate::{
    error::{Error, Result},
    types::is_skill_file,
};

/// The skill marker file directly inside `dir`, whatever its case.
pub fn skill_file_in(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .find(|e| is_skill_file(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
}

/// Search `root` for a directory containing a skill marker file.
///
/// `.git` trees are skipped and symlinks are not followed. Traversal is
/// depth-first in file-name order, so the result is deterministic. With
/// `filter`, only a directory whose own name equals it (ignoring case) is
/// accepted; otherwise the first skill directory found wins.
pub fn find_skill_dir(root: &Path, filter: Option<&str>) -> Result<PathBuf> {
    let location = root.display().to_string();
    if !root.is_dir() {
        return Err(Error::NoSkillFound { location });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            },
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(filter) = filter
            && !entry.file_name().to_string_lossy().eq_ignore_ascii_case(filter)
        {
            continue;
        }
        if skill_file_in(entry.path()).is_some() {
            debug!(dir = %entry.path().display(), "found skill directory");
            return Ok(entry.into_path());
        }
    }

    Err(match filter {
        Some(name) => Error::SkillNotFound {
            name: name.to_string(),
            location,
        },
        None => Error::NoSkillFound { location },
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn skill(dir: &Path, file: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(file), "---\nname: s\ndescription: d\n---\n").unwrap();
    }

    #[test]
    fn root_skill_wins() {
        let tmp = tempfile::tempdir().unwrap();
        skill(tmp.path(), "SKILL.md");
        skill(&tmp.path().join("nested"), "SKILL.md");
        assert_eq!(find_skill_dir(tmp.path(), None).unwrap(), tmp.path());
    }

    #[test]
    fn first_in_name_order_and_case_insensitive_marker() {
        let tmp = tempfile::tempdir().unwrap();
        skill(&tmp.path().join("skills/zeta"), "SKILL.md");
        skill(&tmp.path().join("skills/alpha"), "skill.md");
        std::fs::create_dir_all(tmp.path().join("docs")).unwrap();

        let found = find_skill_dir(tmp.path(), None).unwrap();
        assert_eq!(found, tmp.path().join("skills/alpha"));
        assert_eq!(
            skill_file_in(&found).unwrap(),
            tmp.path().join("skills/alpha/skill.md")
        );
    }

    #[test]
    fn filter_matches_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        skill(&tmp.path().join("skills/alpha"), "SKILL.md");
        skill(&tmp.path().join("skills/React-Best-Practices"), "SKILL.md");

        let found = find_skill_dir(tmp.path(), Some("react-best-practices")).unwrap();
        assert_eq!(found, tmp.path().join("skills/React-Best-Practices"));

        let err = find_skill_dir(tmp.path(), Some("missing")).unwrap_err();
        assert!(matches!(err, Error::SkillNotFound { ref name, .. } if name == "missing"));
    }

    #[test]
    fn git_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        skill(&tmp.path().join(".git/hooks"), "SKILL.md");
        let err = find_skill_dir(tmp.path(), None).unwrap_err();
        assert!(matches!(err, Error::NoSkillFound { .. }));
    }

    #[test]
    fn missing_root_is_no_skill() {
        let tmp = tempfile::tempdir().unwrap();
        let err = find_skill_dir(&tmp.path().join("nope"), None).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
