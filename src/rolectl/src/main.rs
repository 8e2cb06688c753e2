//! Hive rolectl - role permission inspection tool
//!
//! Loads a permission catalog and seed roles from a TOML file and answers
//! questions about them:
//! - whether a role may perform a permission or controller/action
//! - a role's effective and setable permissions
//! - the ordered role list, as JSON

use anyhow::{Context, Result};
use clap::Parser;
use hive_authz::{InMemoryRoleStore, PermissionRequest, PermissionResolver, PermissionSet, Role, RoleStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod config;

use config::RolectlConfig;

/// Hive role permission CLI
#[derive(Parser)]
#[command(name = "hive-rolectl")]
#[command(about = "Inspect role permissions against an access control catalog")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rolectl.toml", env = "ROLECTL_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Check whether a role is granted a permission or controller/action
    Check {
        /// Role name
        role: String,
        /// Permission name (e.g. edit_issues) or controller/action (e.g. issues/edit)
        request: String,
    },

    /// List the permissions a role is effectively granted
    Effective {
        /// Role name
        role: String,
    },

    /// List the permissions an administrator may toggle on a role
    Setable {
        /// Role name
        role: String,
    },

    /// Print all roles in list order as JSON
    Roles,

    /// Validate configuration and builtin fixtures
    Validate,
}

/// Catalog-backed resolver plus the seeded store
struct Workspace {
    resolver: PermissionResolver,
    store: InMemoryRoleStore,
}

impl Workspace {
    async fn bootstrap(config: &RolectlConfig) -> Result<Self> {
        let catalog = config.build_catalog()?;
        let resolver = PermissionResolver::with_config(Arc::new(catalog), config.resolver_config());

        let store = InMemoryRoleStore::seeded(config.roles.iter().cloned())
            .await
            .context("Failed to seed roles")?;

        if config.resolver.require_fixtures {
            store
                .ensure_fixtures()
                .await
                .context("Builtin role fixtures are incomplete")?;
        }

        info!("Workspace ready with {} roles", config.roles.len());
        Ok(Self { resolver, store })
    }

    async fn role(&self, name: &str) -> Result<Role> {
        self.store
            .find_by_name(name)
            .await?
            .with_context(|| format!("No role named '{}'", name))
    }
}

fn print_permissions(set: &PermissionSet) {
    for permission in set {
        println!("{}", permission);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RolectlConfig::load(&cli.config)?;
    config.validate()?;

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},hive_authz={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Loaded configuration from {:?}", cli.config);

    let workspace = Workspace::bootstrap(&config).await?;

    match cli.command {
        Command::Check { role, request } => {
            let role = workspace.role(&role).await?;
            let request = PermissionRequest::parse(&request)
                .with_context(|| format!("Malformed request '{}' for role '{}'", request, role))?;

            let allowed = workspace.resolver.is_allowed(&role, &request);
            println!("{}: {} {}", role, if allowed { "allowed" } else { "denied" }, request);
        }
        Command::Effective { role } => {
            let role = workspace.role(&role).await?;
            print_permissions(&workspace.resolver.effective_permissions(&role));
        }
        Command::Setable { role } => {
            let role = workspace.role(&role).await?;
            print_permissions(&workspace.resolver.setable_permissions(&role));
        }
        Command::Roles => {
            let roles = workspace.store.list().await?;
            println!("{}", serde_json::to_string_pretty(&roles)?);
        }
        Command::Validate => {
            debug!("Cache settings: {:?}", workspace.resolver.cache_stats());
            println!(
                "Configuration OK: {} permissions, {} roles",
                workspace.resolver.catalog().all_permissions().len(),
                workspace.store.list().await?.len()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> RolectlConfig {
        RolectlConfig::from_toml(include_str!("../rolectl.toml")).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_shipped_config() {
        let workspace = Workspace::bootstrap(&shipped()).await.unwrap();

        let reporter = workspace.role("Reporter").await.unwrap();
        let new_issue = PermissionRequest::parse("issues/new").unwrap();
        assert!(workspace.resolver.is_allowed(&reporter, &new_issue));

        let anonymous = workspace.role("Anonymous").await.unwrap();
        assert!(!workspace.resolver.is_allowed(&anonymous, &new_issue));
        assert!(workspace.role("Nobody").await.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_requires_fixtures() {
        let mut config = shipped();
        config.roles.retain(|r| !r.is_founder());
        assert!(Workspace::bootstrap(&config).await.is_err());

        config.resolver.require_fixtures = false;
        assert!(Workspace::bootstrap(&config).await.is_ok());
    }
}
