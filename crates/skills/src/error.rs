use std::{error::Error as StdError, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Input ───────────────────────────────────────────────────────────────
    #[error("empty source input")]
    EmptySource,
    #[error("failed to resolve local path '{path}': {source}")]
    LocalPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsafe path '{path}': {reason}")]
    UnsafePath { path: String, reason: &'static str },

    // ── Network ─────────────────────────────────────────────────────────────
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("request to {url} timed out after {}s", timeout.as_secs())]
    Timeout { url: String, timeout: Duration },
    #[error("operation cancelled")]
    Cancelled,

    // ── Validation ──────────────────────────────────────────────────────────
    #[error("invalid front matter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),
    #[error("invalid skill at {origin}: {reason}")]
    InvalidSkill { origin: String, reason: String },
    #[error("invalid well-known index at {url}: {reason}")]
    InvalidIndex { url: String, reason: String },
    #[error("no valid well-known skills index found for {base} (last error: {reason})")]
    WellKnownIndexNotFound { base: String, reason: String },
    #[error("skill '{name}' not found in {location}")]
    SkillNotFound { name: String, location: String },
    #[error("no SKILL.md found in {location}")]
    NoSkillFound { location: String },
    #[error("no provider recognizes {url}")]
    NoProvider { url: String },

    // ── Filesystem / processes ──────────────────────────────────────────────
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to execute `{operation}`: {source}")]
    CommandExecution {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("`{operation}` failed: {stderr}")]
    CommandFailed {
        operation: &'static str,
        stderr: String,
    },
    #[error("{path} is not a git repository: {reason}")]
    NotGitRepository { path: PathBuf, reason: String },

    // ── Config ──────────────────────────────────────────────────────────────
    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn transport<E>(url: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Transport {
            url: url.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_skill(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSkill {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_index(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIndex {
            url: url.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn command_execution(operation: &'static str, source: std::io::Error) -> Self {
        Self::CommandExecution { operation, source }
    }

    #[must_use]
    pub fn command_failed(operation: &'static str, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation,
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error was produced by a cancelled operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
