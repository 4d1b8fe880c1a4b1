//! Git-backed skill sources: a shallow-clone cache keyed by `(url, ref)`.
//!
//! The cache directory for a pair is created on first clone, refreshed in
//! place on later fetches and only deleted when it no longer opens as a
//! repository. Concurrent fetches of the same key are not serialised.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use {
    async_trait::async_trait,
    sha2::{Digest, Sha256},
    tokio::process::Command,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    discover,
    error::{Error, Result},
    install::safe_relative_path,
    naming,
    source::ParsedSource,
};

/// The repository operations the fetch path needs.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Depth-1, single-branch clone of `url` into `dest`, pinned to
    /// `reference` when given.
    async fn clone_shallow(
        &self,
        url: &str,
        reference: Option<&str>,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Fails when `dir` cannot be opened as a repository.
    async fn open(&self, dir: &Path) -> Result<()>;

    /// Forced refresh of an existing clone.
    async fn pull(
        &self,
        dir: &Path,
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// [`GitClient`] backed by gitoxide for inspection and the `git` binary for
/// network operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl SystemGit {
    async fn run(
        &self,
        operation: &'static str,
        args: &[&OsStr],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = output => result.map_err(|e| Error::command_execution(operation, e))?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::command_failed(operation, stderr.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl GitClient for SystemGit {
    async fn clone_shallow(
        &self,
        url: &str,
        reference: Option<&str>,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![
            OsStr::new("clone"),
            OsStr::new("--depth"),
            OsStr::new("1"),
            OsStr::new("--single-branch"),
        ];
        if let Some(reference) = reference {
            args.push(OsStr::new("--branch"));
            args.push(OsStr::new(reference));
        }
        args.extend([OsStr::new("--"), OsStr::new(url), dest.as_os_str()]);
        self.run("git clone", &args, cancel).await
    }

    async fn open(&self, dir: &Path) -> Result<()> {
        let path = dir.to_path_buf();
        let opened = tokio::task::spawn_blocking(move || {
            gix::open(&path).map(|_| ()).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| Error::external("repository check task failed", e))?;
        opened.map_err(|reason| Error::NotGitRepository {
            path: dir.to_path_buf(),
            reason,
        })
    }

    async fn pull(
        &self,
        dir: &Path,
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let refspec = reference.unwrap_or("HEAD");
        self.run(
            "git fetch",
            &[
                OsStr::new("-C"),
                dir.as_os_str(),
                OsStr::new("fetch"),
                OsStr::new("--depth"),
                OsStr::new("1"),
                OsStr::new("origin"),
                OsStr::new(refspec),
            ],
            cancel,
        )
        .await?;
        self.run(
            "git reset",
            &[
                OsStr::new("-C"),
                dir.as_os_str(),
                OsStr::new("reset"),
                OsStr::new("--hard"),
                OsStr::new("FETCH_HEAD"),
            ],
            cancel,
        )
        .await
    }
}

/// Human-readable repository name: the last URL segment without `.git`.
pub fn repo_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = naming::sanitize(last.strip_suffix(".git").unwrap_or(last));
    if name.is_empty() {
        "repo".to_string()
    } else {
        name
    }
}

/// Cache directory name for `(url, reference)`:
/// `<repo-name>-<hex of the first 8 bytes of sha256("url[@ref]")>`.
pub fn cache_key(url: &str, reference: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    if let Some(reference) = reference {
        hasher.update(b"@");
        hasher.update(reference.as_bytes());
    }
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{hex}", repo_name(url))
}

/// What the git fetch path needs from a classified source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSkillSource {
    pub url: String,
    pub reference: Option<String>,
    pub subpath: Option<String>,
    pub skill_filter: Option<String>,
}

impl From<&ParsedSource> for GitSkillSource {
    fn from(source: &ParsedSource) -> Self {
        Self {
            url: source.url.clone(),
            reference: source.reference.clone(),
            subpath: source.subpath.clone(),
            skill_filter: source.skill_filter.clone(),
        }
    }
}

/// Clones or refreshes repositories under `cache_dir` and locates skills
/// inside them.
pub struct GitFetcher {
    git: Arc<dyn GitClient>,
    cache_dir: PathBuf,
}

impl GitFetcher {
    pub fn new(git: Arc<dyn GitClient>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            git,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, url: &str, reference: Option<&str>) -> PathBuf {
        self.cache_dir.join(cache_key(url, reference))
    }

    /// Bring the cached clone up to date and return the skill directory
    /// inside it.
    pub async fn fetch(
        &self,
        source: &GitSkillSource,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let reference = source.reference.as_deref();
        let subpath = source
            .subpath
            .as_deref()
            .map(safe_relative_path)
            .transpose()?;
        let repo_dir = self.cache_path(&source.url, reference);
        tokio::fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            Error::io(
                format!("failed to create cache directory {}", self.cache_dir.display()),
                e,
            )
        })?;

        if tokio::fs::try_exists(&repo_dir).await.unwrap_or(false) {
            self.refresh(source, &repo_dir, cancel).await?;
        } else {
            self.clone_fresh(source, &repo_dir, cancel).await?;
        }

        let search_root = match subpath {
            Some(subpath) => contained_subdir(&repo_dir, &subpath)?,
            None => repo_dir,
        };
        let filter = source.skill_filter.clone();
        tokio::task::spawn_blocking(move || {
            discover::find_skill_dir(&search_root, filter.as_deref())
        })
        .await
        .map_err(|e| Error::external("skill search task failed", e))?
    }

    async fn refresh(
        &self,
        source: &GitSkillSource,
        repo_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let reference = source.reference.as_deref();
        match self.git.open(repo_dir).await {
            Ok(()) => match self.git.pull(repo_dir, reference, cancel).await {
                Ok(()) => {
                    debug!(url = %source.url, dir = %repo_dir.display(), "refreshed cached clone");
                    Ok(())
                },
                Err(Error::Cancelled) => Err(Error::Cancelled),
                Err(e) => {
                    warn!(url = %source.url, error = %e, "refresh failed, using cached clone");
                    Ok(())
                },
            },
            Err(e) => {
                warn!(dir = %repo_dir.display(), error = %e, "cached clone is corrupt, recloning");
                tokio::fs::remove_dir_all(repo_dir).await.map_err(|e| {
                    Error::io(format!("failed to remove {}", repo_dir.display()), e)
                })?;
                self.clone_fresh(source, repo_dir, cancel).await
            },
        }
    }

    async fn clone_fresh(
        &self,
        source: &GitSkillSource,
        repo_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let reference = source.reference.as_deref();
        info!(url = %source.url, reference = ?reference, dir = %repo_dir.display(), "cloning skill repository");
        if let Err(e) = self
            .git
            .clone_shallow(&source.url, reference, repo_dir, cancel)
            .await
        {
            let _ = tokio::fs::remove_dir_all(repo_dir).await;
            return Err(e);
        }
        Ok(())
    }
}

/// `root/subpath`, refusing anything that resolves outside `root` through
/// a symlink.
fn contained_subdir(root: &Path, subpath: &Path) -> Result<PathBuf> {
    let candidate = root.join(subpath);
    let (Ok(resolved), Ok(root)) = (std::fs::canonicalize(&candidate), std::fs::canonicalize(root))
    else {
        return Err(Error::NoSkillFound {
            location: candidate.display().to_string(),
        });
    };
    if !resolved.starts_with(&root) {
        return Err(Error::UnsafePath {
            path: subpath.display().to_string(),
            reason: "resolves outside the repository",
        });
    }
    Ok(candidate)
}
