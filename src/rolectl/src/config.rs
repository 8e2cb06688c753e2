//! rolectl configuration loading and validation

use anyhow::{Context, Result};
use hive_authz::{AccessControlCatalog, CatalogConfig, ResolverConfig, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Complete rolectl configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RolectlConfig {
    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub resolver: ResolverSection,

    pub catalog: CatalogConfig,

    /// Roles seeded into the store at startup, in list order
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSection {
    #[serde(default = "default_true")]
    pub enable_cache: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Refuse to start unless all seven builtin roles are seeded
    #[serde(default = "default_true")]
    pub require_fixtures: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            enable_cache: default_true(),
            max_entries: default_max_entries(),
            require_fixtures: default_true(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_max_entries() -> usize { 10_000 }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl RolectlConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {:?}", path.as_ref()))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Log level must be one of {:?}, got '{}'",
                LOG_LEVELS,
                self.logging.level
            );
        }

        if self.resolver.enable_cache && self.resolver.max_entries == 0 {
            anyhow::bail!("Resolver max_entries must be positive when the cache is enabled");
        }

        if self.catalog.permissions.is_empty() {
            anyhow::bail!("Catalog must define at least one permission");
        }

        let mut seen = HashSet::new();
        for role in &self.roles {
            if !seen.insert(role.name.as_str()) {
                anyhow::bail!("Role '{}' is defined more than once", role.name);
            }
        }

        Ok(())
    }

    /// Build the access control catalog
    pub fn build_catalog(&self) -> Result<AccessControlCatalog> {
        AccessControlCatalog::from_config(self.catalog.clone()).context("Invalid permission catalog")
    }

    /// Resolver settings
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            enable_cache: self.resolver.enable_cache,
            max_entries: self.resolver.max_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[[catalog.permissions]]
name = "view_issues"
actions = ["issues/index"]
public = true

[[catalog.permissions]]
name = "edit_issues"
actions = ["issues/edit"]
module = "issue_tracking"

[[catalog.permissions]]
name = "add_issue_watchers"
actions = ["watchers/new"]
require = "member"

[[roles]]
name = "Administrator"
builtin = 3
permissions = ["edit_issues", ":edit_issues"]

[[roles]]
name = "Reporter"
level = "project"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = RolectlConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.resolver.enable_cache);
        assert_eq!(config.resolver.max_entries, 10_000);
        assert!(config.resolver.require_fixtures);
        assert_eq!(config.roles.len(), 2);
        assert!(config.roles[0].is_administrator());
        assert_eq!(config.roles[0].permissions.len(), 1);
        config.validate().unwrap();

        let catalog = config.build_catalog().unwrap();
        assert!(catalog.members_only_permissions().contains("add_issue_watchers"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = RolectlConfig::load(file.path()).unwrap();
        assert_eq!(config.catalog.permissions.len(), 3);

        assert!(RolectlConfig::load("/nonexistent/rolectl.toml").is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = RolectlConfig::from_toml(SAMPLE).unwrap();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = RolectlConfig::from_toml(SAMPLE).unwrap();
        config.resolver.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = RolectlConfig::from_toml(SAMPLE).unwrap();
        config.roles.push(Role::new("Reporter"));
        assert!(config.validate().is_err());

        let mut config = RolectlConfig::from_toml(SAMPLE).unwrap();
        config.catalog.permissions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shipped_example_config() {
        let config = RolectlConfig::from_toml(include_str!("../rolectl.toml")).unwrap();
        config.validate().unwrap();

        let catalog = config.build_catalog().unwrap();
        assert_eq!(catalog.available_project_modules(), vec!["issue_tracking", "wiki"]);
        assert_eq!(config.roles.iter().filter(|r| r.is_builtin()).count(), 7);
    }

    #[test]
    fn test_invalid_catalog_reported() {
        let broken = SAMPLE.replace("issues/edit", "issues");
        let config = RolectlConfig::from_toml(&broken).unwrap();
        assert!(config.build_catalog().is_err());
    }
}
