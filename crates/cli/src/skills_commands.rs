use std::path::PathBuf;

use {
    anyhow::Context,
    clap::Subcommand,
    mcphub_skills::{InstallOptions, ProviderRegistry, SkillResolver, SkillsConfig, parse_source},
    tokio_util::sync::CancellationToken,
    tracing::warn,
};

#[derive(Subcommand)]
pub enum SkillAction {
    /// Install a skill from a local path, git repository, URL or site.
    Add {
        /// e.g. `owner/repo`, `owner/repo@skill`, a GitHub/GitLab URL,
        /// `https://host/path/SKILL.md`, `https://docs.example.com` or `./dir`.
        source: String,
        /// Skill to pick when the source holds several.
        #[arg(long)]
        skill: Option<String>,
        /// Install root (overrides the config value).
        #[arg(long, env = "MCPHUB_SKILLS_DIR")]
        dir: Option<PathBuf>,
        /// Print the result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show how a source string is classified, without fetching it.
    Parse { source: String },
    /// List the HTTP skill providers in priority order.
    Providers,
}

pub async fn handle_skills(action: SkillAction, config: &SkillsConfig) -> anyhow::Result<()> {
    match action {
        SkillAction::Add {
            source,
            skill,
            dir,
            json,
        } => {
            let install_dir = dir.unwrap_or_else(|| config.install_dir());
            let resolver = SkillResolver::from_config(config);
            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            let installed = resolver
                .install(&source, &install_dir, &InstallOptions { skill }, &cancel)
                .await
                .with_context(|| format!("failed to install skill from '{source}'"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&installed)?);
            } else {
                println!(
                    "Installed skill '{}' ({}) to {}",
                    installed.install_name,
                    installed.kind,
                    installed.path.display()
                );
            }
        },
        SkillAction::Parse { source } => {
            let parsed = parse_source(&source)?;
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        },
        SkillAction::Providers => {
            let registry = ProviderRegistry::with_defaults(config.enable_mintlify);
            for (id, name) in registry.providers() {
                println!("  {id:<12} {name}");
            }
        },
    }
    Ok(())
}

/// Cancel in-flight fetches on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });
}
