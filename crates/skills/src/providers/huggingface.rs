use {async_trait::async_trait, tokio_util::sync::CancellationToken, url::Url};

use crate::{
    error::Result,
    http::HttpFetcher,
    naming,
    providers::{ProviderMatch, SkillProvider, validated_frontmatter},
    types::RemoteSkill,
};

const HOST: &str = "huggingface.co";
const UNKNOWN: &str = "huggingface/unknown";

/// `SKILL.md` documents inside Hugging Face Spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuggingFaceProvider;

impl HuggingFaceProvider {
    /// `(owner, space)` following `/spaces/` in the path.
    fn space(url: &str) -> Option<(String, String)> {
        let parsed = Url::parse(url).ok()?;
        let mut segments = parsed.path_segments()?.skip_while(|s| *s != "spaces").skip(1);
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let space = segments.next().filter(|s| !s.is_empty())?;
        Some((owner.to_string(), space.to_string()))
    }
}

#[async_trait]
impl SkillProvider for HuggingFaceProvider {
    fn id(&self) -> &'static str {
        "huggingface"
    }

    fn display_name(&self) -> &'static str {
        "Hugging Face"
    }

    fn matches(&self, url: &str) -> ProviderMatch {
        let Ok(parsed) = Url::parse(url) else {
            return ProviderMatch::no();
        };
        let on_host = parsed
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(HOST));
        let path = parsed.path().to_ascii_lowercase();
        if on_host && path.contains("/spaces/") && path.ends_with("/skill.md") {
            ProviderMatch::yes(self.source_identifier(url))
        } else {
            ProviderMatch::no()
        }
    }

    async fn fetch_skill(
        &self,
        url: &str,
        http: &HttpFetcher,
        cancel: &CancellationToken,
    ) -> Result<RemoteSkill> {
        let raw_url = self.to_raw_url(url);
        let content = http.get_text(&raw_url, cancel).await?;
        let fm = validated_frontmatter(&raw_url, &content)?;

        let space = Self::space(url).map(|(_, space)| space).unwrap_or_default();
        let install_name = naming::resolve_install_name(&fm, &space, "skill");

        Ok(RemoteSkill {
            name: fm.name,
            description: fm.description,
            content,
            install_name,
            source_url: url.to_string(),
            files: Default::default(),
            metadata: fm.metadata,
        })
    }

    fn to_raw_url(&self, url: &str) -> String {
        url.replacen("/blob/", "/raw/", 1)
    }

    fn source_identifier(&self, url: &str) -> String {
        match Self::space(url) {
            Some((owner, space)) => format!("huggingface/{owner}/{space}"),
            None => UNKNOWN.to_string(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::http::{HttpClient, HttpResponse},
        std::sync::{Arc, Mutex},
    };

    const BLOB: &str = "https://huggingface.co/spaces/acme/pdf-tools/blob/main/SKILL.md";
    const RAW: &str = "https://huggingface.co/spaces/acme/pdf-tools/raw/main/SKILL.md";

    /// Records requested URLs and answers every request with `body`.
    struct Recording {
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for Recording {
        async fn get(&self, url: &str) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(url.to_string());
            Ok(HttpResponse {
                status: 200,
                body: self.body.to_string(),
            })
        }
    }

    #[test]
    fn matches_space_documents_only() {
        let p = HuggingFaceProvider;
        assert!(p.matches(BLOB).matches);
        assert!(p.matches(&BLOB.to_uppercase().replace("HTTPS://", "https://")).matches);
        assert!(!p.matches("https://huggingface.co/acme/model/blob/main/SKILL.md").matches);
        assert!(!p.matches("https://huggingface.co/spaces/acme/x/blob/main/README.md").matches);
        assert!(!p.matches("https://example.com/spaces/acme/x/SKILL.md").matches);
    }

    #[test]
    fn raw_url_rewrite_is_idempotent() {
        let p = HuggingFaceProvider;
        assert_eq!(p.to_raw_url(BLOB), RAW);
        assert_eq!(p.to_raw_url(RAW), RAW);
    }

    #[test]
    fn source_identifier_degrades_to_unknown() {
        let p = HuggingFaceProvider;
        assert_eq!(p.source_identifier(BLOB), "huggingface/acme/pdf-tools");
        assert_eq!(
            p.source_identifier("https://huggingface.co/spaces/"),
            "huggingface/unknown"
        );
        assert_eq!(p.source_identifier("::"), "huggingface/unknown");
    }

    #[tokio::test]
    async fn fetches_raw_document() {
        let client = Arc::new(Recording {
            body: "---\nname: PDF\ndescription: Work with PDFs\n---\nbody\n",
            seen: Mutex::new(Vec::new()),
        });
        let http = HttpFetcher::with_default_timeout(client.clone());

        let skill = HuggingFaceProvider
            .fetch_skill(BLOB, &http, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*client.seen.lock().unwrap(), vec![RAW.to_string()]);
        assert_eq!(skill.name, "PDF");
        assert_eq!(skill.install_name, "pdf-tools");
        assert_eq!(skill.source_url, BLOB);
    }
}
