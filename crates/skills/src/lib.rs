//! Skill source resolution: classify a user-supplied source string, fetch the
//! skill it names and install it on disk.
//!
//! Skills are directories containing a `SKILL.md` file with YAML front matter
//! and markdown instructions. Sources can be local directories, git
//! repositories (GitHub, GitLab or any remote), direct document URLs handled
//! by [`providers`], or sites publishing a `/.well-known/skills/index.json`.

pub mod config;
pub mod discover;
pub mod error;
pub mod frontmatter;
pub mod git;
pub mod http;
pub mod install;
pub mod naming;
pub mod providers;
pub mod resolve;
pub mod source;
pub mod types;
pub mod well_known;

pub use {
    config::SkillsConfig,
    error::{Error, Result},
    git::{GitClient, GitFetcher, SystemGit},
    http::{HttpClient, HttpFetcher, HttpResponse, ReqwestHttpClient},
    providers::{ProviderRegistry, SkillProvider},
    resolve::{InstallOptions, InstalledSkill, SkillResolver},
    source::{ParsedSource, SourceKind, parse_source},
    types::{Frontmatter, RemoteSkill},
};
