//! Splits a skill document into its `---` delimited header and body.

use serde::Deserialize;

use crate::{
    error::Result,
    types::{Frontmatter, Metadata},
};

const DELIMITER: &str = "---";

/// Header shape as written; every key is optional and may be `null`.
#[derive(Deserialize, Default)]
struct RawFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl From<RawFrontmatter> for Frontmatter {
    fn from(raw: RawFrontmatter) -> Self {
        Self {
            name: raw.name.unwrap_or_default().trim().to_string(),
            description: raw.description.unwrap_or_default().trim().to_string(),
            metadata: raw.metadata.unwrap_or_default(),
        }
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == DELIMITER
}

/// Extract the front matter and body of `content`.
///
/// A document that does not open with a `---` line, or whose header is never
/// closed, has no front matter: the default [`Frontmatter`] is returned with
/// the whole input as body. Only a closed header that fails to parse is an
/// error.
pub fn extract(content: &str) -> Result<(Frontmatter, &str)> {
    let mut lines = content.split_inclusive('\n');
    let header_start = match lines.next() {
        Some(first) if is_delimiter(first) => first.len(),
        _ => return Ok((Frontmatter::default(), content)),
    };

    let mut offset = header_start;
    for line in lines {
        if is_delimiter(line) {
            let header = &content[header_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((parse_header(header)?, body));
        }
        offset += line.len();
    }

    Ok((Frontmatter::default(), content))
}

fn parse_header(header: &str) -> Result<Frontmatter> {
    if header.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    let raw: RawFrontmatter = serde_yaml::from_str(header)?;
    Ok(raw.into())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_body() {
        let doc = "---\nname: commit\ndescription: Create git commits\nmetadata:\n  install-name: git-commit\n  tags: [a, b]\n---\n# Commit\n\nRun `git add`.\n";
        let (fm, body) = extract(doc).unwrap();
        assert_eq!(fm.name, "commit");
        assert_eq!(fm.description, "Create git commits");
        assert_eq!(fm.metadata_str("install-name"), Some("git-commit"));
        assert!(fm.metadata.contains_key("tags"));
        assert_eq!(body, "# Commit\n\nRun `git add`.\n");
    }

    #[test]
    fn header_plus_body_reconstructs_document() {
        let doc = "---\nname: x\ndescription: y\n---\nline one\n\n  indented\n---\nafter rule\n";
        let (_, body) = extract(doc).unwrap();
        let header_len = doc.len() - body.len();
        assert_eq!(&doc[header_len..], body);
        assert_eq!(
            body.lines().collect::<Vec<_>>(),
            vec!["line one", "", "  indented", "---", "after rule"]
        );
    }

    #[test]
    fn no_header_returns_input_unchanged() {
        let doc = "# Title\n---\nname: not-a-header\n---\n";
        let (fm, body) = extract(doc).unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, doc);
    }

    #[test]
    fn unclosed_header_degrades_to_body() {
        let doc = "---\nname: test\ndescription: never closed\n";
        let (fm, body) = extract(doc).unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, doc);
    }

    #[test]
    fn malformed_closed_header_is_an_error() {
        let doc = "---\nname: [unterminated\n---\nbody\n";
        assert!(extract(doc).is_err());
    }

    #[test]
    fn empty_header_and_null_values() {
        let (fm, body) = extract("---\n---\nbody").unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, "body");

        let (fm, _) = extract("---\nname:\ndescription: d\nmetadata:\n---\n").unwrap();
        assert_eq!(fm.name, "");
        assert_eq!(fm.description, "d");
        assert!(fm.metadata.is_empty());
    }

    #[test]
    fn crlf_delimiters_are_recognized() {
        let doc = "---\r\nname: win\r\ndescription: crlf\r\n---\r\nbody\r\n";
        let (fm, body) = extract(doc).unwrap();
        assert_eq!(fm.name, "win");
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn empty_input() {
        let (fm, body) = extract("").unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, "");
    }
}
