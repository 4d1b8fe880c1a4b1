//! End-to-end resolution: classify a source, fetch it and install it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    config::SkillsConfig,
    discover,
    error::{Error, Result},
    git::{self, GitClient, GitFetcher, GitSkillSource, SystemGit},
    http::{HttpFetcher, ReqwestHttpClient},
    install,
    naming,
    providers::{DirectProvider, ProviderRegistry, SkillProvider, validated_frontmatter},
    source::{ParsedSource, SourceKind, parse_source},
    types::RemoteSkill,
    well_known,
};

/// Caller choices that the source string cannot express.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Skill to pick from a multi-skill repository or well-known index.
    /// Overrides an `owner/repo@skill` filter.
    pub skill: Option<String>,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledSkill {
    pub install_name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Repository or document URL, or the local directory given.
    pub source_url: String,
}

/// A fetched skill before installation.
#[derive(Debug, Clone)]
pub enum ResolvedSkill {
    /// A skill directory on disk (local sources and git clones).
    Directory {
        dir: PathBuf,
        install_name: String,
        origin: String,
    },
    /// A skill held in memory (providers and well-known indexes).
    Remote(RemoteSkill),
}

impl ResolvedSkill {
    pub fn install_name(&self) -> &str {
        match self {
            Self::Directory { install_name, .. } => install_name,
            Self::Remote(skill) => &skill.install_name,
        }
    }
}

pub struct SkillResolver {
    registry: Arc<ProviderRegistry>,
    http: HttpFetcher,
    git: GitFetcher,
}

impl SkillResolver {
    pub fn new(registry: Arc<ProviderRegistry>, http: HttpFetcher, git: GitFetcher) -> Self {
        Self {
            registry,
            http,
            git,
        }
    }

    /// Resolver wired to `reqwest`, the system `git` and the configured cache.
    pub fn from_config(config: &SkillsConfig) -> Self {
        let git: Arc<dyn GitClient> = Arc::new(SystemGit);
        Self::new(
            Arc::new(ProviderRegistry::with_defaults(config.enable_mintlify)),
            HttpFetcher::new(
                Arc::new(ReqwestHttpClient::from_config(config)),
                config.http_timeout(),
            ),
            GitFetcher::new(git, config.skills_cache_dir()),
        )
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Fetch the skill described by `source` without installing it.
    pub async fn fetch(
        &self,
        source: &ParsedSource,
        options: &InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSkill> {
        let filter = options.skill.clone().or_else(|| source.skill_filter.clone());
        debug!(kind = %source.kind, location = %source.display_location(), ?filter, "resolving skill source");

        match source.kind {
            SourceKind::Local => {
                let root = source
                    .local_path
                    .clone()
                    .ok_or_else(|| Error::NoSkillFound {
                        location: source.display_location(),
                    })?;
                let search_root = root.clone();
                let dir = tokio::task::spawn_blocking(move || {
                    discover::find_skill_dir(&search_root, filter.as_deref())
                })
                .await
                .map_err(|e| Error::external("skill search task failed", e))??;
                let root_name = dir_name(&root).unwrap_or_else(|| "skill".to_string());
                let origin = root.display().to_string();
                self.directory_skill(dir, &root, &root_name, origin).await
            },
            SourceKind::Github | SourceKind::Gitlab | SourceKind::Git => {
                let mut git_source = GitSkillSource::from(source);
                git_source.skill_filter = filter;
                let dir = self.git.fetch(&git_source, cancel).await?;
                let repo_dir = self
                    .git
                    .cache_path(&git_source.url, git_source.reference.as_deref());
                let root_name = git::repo_name(&source.url);
                self.directory_skill(dir, &repo_dir, &root_name, source.url.clone())
                    .await
            },
            SourceKind::DirectUrl => self.fetch_direct(&source.url, cancel).await,
            SourceKind::WellKnown => {
                let skill = well_known::fetch_well_known_skill(
                    &self.http,
                    &source.url,
                    filter.as_deref(),
                    cancel,
                )
                .await?;
                Ok(ResolvedSkill::Remote(skill))
            },
        }
    }

    /// Classify `input`, fetch it and install it under
    /// `<install_dir>/<install-name>`, replacing any previous install.
    pub async fn install(
        &self,
        input: &str,
        install_dir: &Path,
        options: &InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstalledSkill> {
        let source = parse_source(input)?;
        let resolved = self.fetch(&source, options, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let install_name = resolved.install_name().to_string();
        let target = install_dir.join(&install_name);
        let source_url = match &resolved {
            ResolvedSkill::Directory { dir, origin, .. } => {
                install::install_dir(dir, &target).await?;
                origin.clone()
            },
            ResolvedSkill::Remote(skill) => {
                install::write_remote_skill(skill, &target).await?;
                skill.source_url.clone()
            },
        };

        info!(skill = %install_name, kind = %source.kind, path = %target.display(), "skill installed");
        Ok(InstalledSkill {
            install_name,
            path: target,
            kind: source.kind,
            source_url,
        })
    }

    async fn fetch_direct(&self, url: &str, cancel: &CancellationToken) -> Result<ResolvedSkill> {
        let skill = match self.registry.find(url) {
            Some(provider) => {
                debug!(provider = provider.id(), source = %provider.source_identifier(url), "provider selected");
                provider.fetch_skill(url, &self.http, cancel).await?
            },
            // GitLab raw links are classified as direct but excluded by the
            // direct provider's host check.
            None if url.contains("/-/raw/") => {
                debug!(%url, "no provider matched, fetching as a plain document");
                DirectProvider.fetch_skill(url, &self.http, cancel).await?
            },
            None => {
                return Err(Error::NoProvider {
                    url: url.to_string(),
                });
            },
        };
        Ok(ResolvedSkill::Remote(skill))
    }

    /// Validate the skill file in `dir` and derive its install name.
    ///
    /// The directory name is the hint, except for `root` itself, which is
    /// named `root_name` (a clone's cache directory name is not meaningful).
    async fn directory_skill(
        &self,
        dir: PathBuf,
        root: &Path,
        root_name: &str,
        origin: String,
    ) -> Result<ResolvedSkill> {
        let skill_file = discover::skill_file_in(&dir).ok_or_else(|| Error::NoSkillFound {
            location: dir.display().to_string(),
        })?;
        let content = tokio::fs::read_to_string(&skill_file)
            .await
            .map_err(|e| Error::io(format!("failed to read {}", skill_file.display()), e))?;
        let fm = validated_frontmatter(&skill_file.display().to_string(), &content)?;

        let hint = if dir == root {
            root_name.to_string()
        } else {
            dir_name(&dir).unwrap_or_default()
        };
        let install_name = naming::resolve_install_name(&fm, &hint, root_name);
        if install_name.is_empty() {
            return Err(Error::invalid_skill(
                skill_file.display().to_string(),
                "no usable install name",
            ));
        }

        Ok(ResolvedSkill::Directory {
            dir,
            install_name,
            origin,
        })
    }
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(cache: &Path) -> SkillResolver {
        SkillResolver::new(
            Arc::new(ProviderRegistry::with_defaults(false)),
            HttpFetcher::with_default_timeout(Arc::new(ReqwestHttpClient::default())),
            GitFetcher::new(Arc::new(SystemGit), cache),
        )
    }

    fn write_skill(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), body).unwrap();
    }

    #[tokio::test]
    async fn local_directory_uses_its_name() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("My_Tool");
        write_skill(&src, "---\nname: Something Else\ndescription: d\n---\nbody\n");
        let dest = tmp.path().join("installed");

        let installed = resolver(&tmp.path().join("cache"))
            .install(
                src.to_str().unwrap(),
                &dest,
                &InstallOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(installed.install_name, "my-tool");
        assert_eq!(installed.kind, SourceKind::Local);
        assert_eq!(installed.path, dest.join("my-tool"));
        assert!(dest.join("my-tool/SKILL.md").is_file());
    }

    #[tokio::test]
    async fn install_name_metadata_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("repo");
        write_skill(
            &src.join("skills/pdf"),
            "---\nname: pdf\ndescription: d\nmetadata:\n  install-name: PDF Tools\n---\n",
        );
        let installed = resolver(&tmp.path().join("cache"))
            .install(
                src.to_str().unwrap(),
                &tmp.path().join("out"),
                &InstallOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(installed.install_name, "pdf-tools");
    }

    #[tokio::test]
    async fn local_skill_without_description_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("broken");
        write_skill(&src, "---\nname: broken\n---\n");

        let err = resolver(&tmp.path().join("cache"))
            .install(
                src.to_str().unwrap(),
                &tmp.path().join("out"),
                &InstallOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSkill { .. }));
        assert!(!tmp.path().join("out/broken").exists());
    }

    #[tokio::test]
    async fn options_skill_filters_local_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("bundle");
        write_skill(&src.join("alpha"), "---\nname: alpha\ndescription: a\n---\n");
        write_skill(&src.join("beta"), "---\nname: beta\ndescription: b\n---\n");

        let options = InstallOptions {
            skill: Some("beta".into()),
        };
        let installed = resolver(&tmp.path().join("cache"))
            .install(
                src.to_str().unwrap(),
                &tmp.path().join("out"),
                &options,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(installed.install_name, "beta");
    }

    #[tokio::test]
    async fn direct_url_without_provider_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = SkillResolver::new(
            Arc::new(ProviderRegistry::new()),
            HttpFetcher::with_default_timeout(Arc::new(ReqwestHttpClient::default())),
            GitFetcher::new(Arc::new(SystemGit), tmp.path()),
        );
        let err = resolver
            .install(
                "https://docs.example.com/skill.md",
                tmp.path(),
                &InstallOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoProvider { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = resolver(tmp.path())
            .install(
                "  ",
                tmp.path(),
                &InstallOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptySource));
    }
}
