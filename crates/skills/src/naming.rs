//! Install-name derivation and skill-name validation.

use crate::types::{Frontmatter, INSTALL_NAME_KEY};

/// Longest accepted skill name.
pub const MAX_NAME_LEN: usize = 64;

/// Reduce `input` to a directory-safe slug over `[a-z0-9-]`.
///
/// Lower-cases, maps spaces and underscores to hyphens, drops everything else
/// outside the alphabet, collapses hyphen runs and trims hyphens at the ends.
/// Idempotent.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let c = match c.to_ascii_lowercase() {
            ' ' | '_' | '-' => '-',
            c @ ('a'..='z' | '0'..='9') => c,
            _ => continue,
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Pick the install name for a skill, first non-empty candidate wins:
/// `metadata.install-name`, the directory hint, the header name, then
/// `fallback`.
///
/// A directory hint outranks the skill's self-declared name. `fallback` is
/// sanitized but not checked for emptiness; callers pass something non-empty.
pub fn resolve_install_name(
    frontmatter: &Frontmatter,
    directory_hint: &str,
    fallback: &str,
) -> String {
    [
        frontmatter.metadata_str(INSTALL_NAME_KEY).unwrap_or_default(),
        directory_hint,
        frontmatter.name.as_str(),
    ]
    .into_iter()
    .map(sanitize)
    .find(|name| !name.is_empty())
    .unwrap_or_else(|| sanitize(fallback))
}

/// Validate a published skill name: 1-64 chars, lowercase ASCII alphanumeric
/// and inner hyphens, no leading or trailing hyphen.
pub fn is_valid_skill_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("My Skill", "my-skill")]
    #[case("react_best_practices", "react-best-practices")]
    #[case("--Leading and trailing--", "leading-and-trailing")]
    #[case("a  _ - b", "a-b")]
    #[case("Ünïcödé!", "ncd")]
    #[case("../../etc/passwd", "etcpasswd")]
    #[case("---", "")]
    #[case("", "")]
    fn sanitize_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn sanitize_is_idempotent_and_well_formed() {
        let inputs = [
            "Hello World",
            "__x__y__",
            "-a-",
            "MiXeD_case 42",
            "dots.and/slashes",
            " - - ",
            "tab\tseparated",
            "日本語-skill",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            );
            assert!(!once.starts_with('-') && !once.ends_with('-'));
            assert!(!once.contains("--"));
        }
    }

    fn frontmatter(name: &str, install_name: Option<&str>) -> Frontmatter {
        let mut fm = Frontmatter {
            name: name.into(),
            ..Default::default()
        };
        if let Some(v) = install_name {
            fm.metadata
                .insert(INSTALL_NAME_KEY.into(), serde_yaml::Value::String(v.into()));
        }
        fm
    }

    #[test]
    fn install_name_from_metadata_wins() {
        let fm = frontmatter("Header Name", Some("Custom Name"));
        assert_eq!(resolve_install_name(&fm, "dir", "fallback"), "custom-name");
    }

    #[test]
    fn directory_hint_beats_header_name() {
        let fm = frontmatter("Header Name", None);
        assert_eq!(resolve_install_name(&fm, "My_Dir", "fallback"), "my-dir");
    }

    #[test]
    fn header_name_then_fallback() {
        let fm = frontmatter("Header Name", None);
        assert_eq!(resolve_install_name(&fm, "", "fallback"), "header-name");
        // A hint that sanitizes to nothing is skipped.
        assert_eq!(resolve_install_name(&fm, "!!!", "fallback"), "header-name");

        let empty = frontmatter("", None);
        assert_eq!(resolve_install_name(&empty, "", "Fall Back"), "fall-back");
    }

    #[test]
    fn test_validate_name() {
        assert!(is_valid_skill_name("my-skill"));
        assert!(is_valid_skill_name("a"));
        assert!(is_valid_skill_name("skill123"));
        assert!(!is_valid_skill_name(""));
        assert!(!is_valid_skill_name("-bad"));
        assert!(!is_valid_skill_name("bad-"));
        assert!(!is_valid_skill_name("-"));
        assert!(!is_valid_skill_name("Bad"));
        assert!(!is_valid_skill_name("has space"));
        assert!(!is_valid_skill_name("../x"));
        assert!(is_valid_skill_name(&"a".repeat(64)));
        assert!(!is_valid_skill_name(&"a".repeat(65)));
    }
}
