use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use crate::{
    error::Result,
    http::HttpFetcher,
    naming,
    providers::{
        ProviderMatch, SkillProvider, document_dir_hint, parse_skill_document_url,
        validated_frontmatter,
    },
    types::RemoteSkill,
};

/// Hosts whose documents are reached through repositories or their own provider.
const EXCLUDED_HOSTS: &[&str] = &["github.com", "gitlab.com", "huggingface.co"];

/// Any `SKILL.md` served over HTTP(S), fetched with a plain GET.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectProvider;

impl DirectProvider {
    fn is_excluded(url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        EXCLUDED_HOSTS.iter().any(|host| lower.contains(host))
    }
}

#[async_trait]
impl SkillProvider for DirectProvider {
    fn id(&self) -> &'static str {
        "direct"
    }

    fn display_name(&self) -> &'static str {
        "Direct URL"
    }

    fn matches(&self, url: &str) -> ProviderMatch {
        if parse_skill_document_url(url).is_none() || Self::is_excluded(url) {
            return ProviderMatch::no();
        }
        ProviderMatch::yes(self.source_identifier(url))
    }

    async fn fetch_skill(
        &self,
        url: &str,
        http: &HttpFetcher,
        cancel: &CancellationToken,
    ) -> Result<RemoteSkill> {
        let content = http.get_text(url, cancel).await?;
        let fm = validated_frontmatter(url, &content)?;

        let dir_hint = parse_skill_document_url(url)
            .map(|u| document_dir_hint(&u))
            .unwrap_or_default();
        let install_name = naming::resolve_install_name(&fm, &dir_hint, "skill");

        tracing::debug!(%url, %install_name, "fetched direct skill");
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

    fn source_identifier(&self, url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| "unknown".to_string())
    }
}
