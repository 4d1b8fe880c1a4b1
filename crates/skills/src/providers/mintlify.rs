use {async_trait::async_trait, tokio_util::sync::CancellationToken};

use crate::{
    error::{Error, Result},
    http::HttpFetcher,
    naming,
    providers::{DirectProvider, ProviderMatch, SkillProvider, validated_frontmatter},
    types::RemoteSkill,
};

/// Front-matter metadata key identifying the Mintlify site.
pub const SITE_KEY: &str = "mintlify-proj";

/// Skills published by Mintlify documentation sites.
///
/// `matches` accepts every URL the direct provider accepts; only documents
/// carrying `metadata.mintlify-proj` are accepted on fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MintlifyProvider;

#[async_trait]
impl SkillProvider for MintlifyProvider {
    fn id(&self) -> &'static str {
        "mintlify"
    }

    fn display_name(&self) -> &'static str {
        "Mintlify"
    }

    fn matches(&self, url: &str) -> ProviderMatch {
        if DirectProvider.matches(url).matches {
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
        let content = http.get_text(url, cancel).await?;
        let fm = validated_frontmatter(url, &content)?;

        let site = fm.metadata_str(SITE_KEY).ok_or_else(|| {
            Error::invalid_skill(url, format!("not a Mintlify skill: no `metadata.{SITE_KEY}`"))
        })?;
        let install_name = naming::sanitize(site);
        if install_name.is_empty() {
            return Err(Error::invalid_skill(
                url,
                format!("`metadata.{SITE_KEY}` has no usable characters"),
            ));
        }

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
        format!("mintlify/{}", DirectProvider.source_identifier(url))
    }
}
