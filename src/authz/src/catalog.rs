//! Access control catalog
//!
//! The catalog is the static registry of every permission the application
//! knows about. It is built once at startup, either with [`CatalogBuilder`]
//! or from a deserialized [`CatalogConfig`], and then shared read-only
//! behind an `Arc` by every resolver.
//!
//! # Example
//!
//! ```rust
//! use hive_authz::catalog::{CatalogBuilder, Requirement};
//!
//! let catalog = CatalogBuilder::new()
//!     .public_permission("view_issues", ["issues/index", "issues/show"])
//!     .project_module("issue_tracking", |m| {
//!         m.permission("edit_issues", ["issues/edit", "issues/update"])
//!             .permission_requiring("add_issue_notes", ["journals/new"], Requirement::LoggedIn)
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(catalog.all_permissions().len(), 3);
//! assert!(catalog.public_permissions().contains("view_issues"));
//! ```

use crate::error::{AuthzError, Result};
use crate::permission::{PermissionId, PermissionSet};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

static NO_ACTIONS: BTreeSet<String> = BTreeSet::new();

/// Membership a permission demands beyond the role holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Only meaningful for authenticated users
    #[serde(alias = "loggedin")]
    LoggedIn,
    /// Only meaningful for project members (implies logged in)
    Member,
}

/// A single permission definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDef {
    /// Canonical permission name
    pub name: PermissionId,

    /// `controller/action` strings this permission authorizes
    #[serde(default, deserialize_with = "deserialize_actions")]
    pub actions: BTreeSet<String>,

    /// Granted to every role without being stored
    #[serde(default)]
    pub public: bool,

    /// Membership restriction, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<Requirement>,

    /// Project module grouping this permission
    #[serde(default, rename = "module", skip_serializing_if = "Option::is_none")]
    pub project_module: Option<String>,
}

impl PermissionDef {
    /// Create a plain permission definition
    pub fn new<I, S>(name: PermissionId, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            actions: trimmed_actions(actions),
            public: false,
            require: None,
            project_module: None,
        }
    }

    /// True if the permission only applies to logged-in users
    pub fn require_logged_in(&self) -> bool {
        matches!(self.require, Some(Requirement::LoggedIn | Requirement::Member))
    }

    /// True if the permission only applies to members
    pub fn require_member(&self) -> bool {
        matches!(self.require, Some(Requirement::Member))
    }

    fn validate(&self) -> Result<()> {
        if self.public && self.require.is_some() {
            return Err(AuthzError::InvalidCatalog(format!(
                "permission '{}' cannot be both public and restricted",
                self.name
            )));
        }

        for action in &self.actions {
            let well_formed = action.trim() == action.as_str()
                && action
                    .rsplit_once('/')
                    .map(|(controller, name)| !controller.is_empty() && !name.is_empty())
                    .unwrap_or(false);

            if !well_formed {
                return Err(AuthzError::InvalidCatalog(format!(
                    "permission '{}' has malformed action '{}' (expected controller/action)",
                    self.name, action
                )));
            }
        }

        Ok(())
    }
}

fn trimmed_actions<I, S>(actions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    actions
        .into_iter()
        .map(|a| {
            let a: String = a.into();
            a.trim().to_string()
        })
        .collect()
}

fn deserialize_actions<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(trimmed_actions)
}

/// Serializable catalog definition, as found in configuration files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub permissions: Vec<PermissionDef>,
}

/// Immutable registry of known permissions
#[derive(Debug, Clone)]
pub struct AccessControlCatalog {
    definitions: Vec<PermissionDef>,
    index: HashMap<PermissionId, usize>,
    all: PermissionSet,
    public: PermissionSet,
    logged_in_only: PermissionSet,
    members_only: PermissionSet,
}

impl AccessControlCatalog {
    /// Start building a catalog
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Build a catalog from its configuration form
    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        Self::from_definitions(config.permissions)
    }

    /// Validate definitions and derive the lookup subsets
    pub fn from_definitions(definitions: Vec<PermissionDef>) -> Result<Self> {
        let mut index = HashMap::with_capacity(definitions.len());

        for (i, def) in definitions.iter().enumerate() {
            def.validate()?;
            if index.insert(def.name.clone(), i).is_some() {
                return Err(AuthzError::InvalidCatalog(format!(
                    "duplicate permission '{}'",
                    def.name
                )));
            }
        }

        let select = |pred: fn(&PermissionDef) -> bool| -> PermissionSet {
            definitions
                .iter()
                .filter(|d| pred(d))
                .map(|d| d.name.clone())
                .collect()
        };

        let all = select(|_: &PermissionDef| true);
        let public = select(|d: &PermissionDef| d.public);
        let logged_in_only = select(PermissionDef::require_logged_in);
        let members_only = select(PermissionDef::require_member);

        info!(
            "Access control catalog built: {} permissions ({} public, {} logged-in only, {} members only)",
            all.len(),
            public.len(),
            logged_in_only.len(),
            members_only.len()
        );

        Ok(Self {
            definitions,
            index,
            all,
            public,
            logged_in_only,
            members_only,
        })
    }

    /// Every known permission, in definition order
    pub fn all_permissions(&self) -> &PermissionSet {
        &self.all
    }

    /// Permissions implicitly granted to every role
    pub fn public_permissions(&self) -> &PermissionSet {
        &self.public
    }

    /// Permissions meaningless for anonymous users
    pub fn logged_in_only_permissions(&self) -> &PermissionSet {
        &self.logged_in_only
    }

    /// Permissions meaningless for non-members
    pub fn members_only_permissions(&self) -> &PermissionSet {
        &self.members_only
    }

    /// Actions authorized by a permission (empty for unknown permissions)
    pub fn actions_for(&self, permission: &str) -> &BTreeSet<String> {
        self.permission(permission)
            .map(|d| &d.actions)
            .unwrap_or(&NO_ACTIONS)
    }

    /// Look up a permission definition
    pub fn permission(&self, name: &str) -> Option<&PermissionDef> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// All definitions, in definition order
    pub fn definitions(&self) -> &[PermissionDef] {
        &self.definitions
    }

    /// Distinct project modules, in order of first appearance
    pub fn available_project_modules(&self) -> Vec<&str> {
        let mut modules: Vec<&str> = Vec::new();
        for module in self.definitions.iter().filter_map(|d| d.project_module.as_deref()) {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        modules
    }

    /// Permissions available when only the given modules are enabled
    ///
    /// Permissions outside any module are always available.
    pub fn modules_permissions(&self, modules: &[&str]) -> PermissionSet {
        self.definitions
            .iter()
            .filter(|d| match d.project_module.as_deref() {
                None => true,
                Some(module) => modules.contains(&module),
            })
            .map(|d| d.name.clone())
            .collect()
    }
}

/// Fluent catalog construction
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    definitions: Vec<PermissionDef>,
    current_module: Option<String>,
    errors: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plain permission
    pub fn permission<I, S>(self, name: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define(name, actions, |_| {})
    }

    /// Register a permission granted to every role
    pub fn public_permission<I, S>(self, name: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define(name, actions, |d| d.public = true)
    }

    /// Register a permission restricted by membership
    pub fn permission_requiring<I, S>(self, name: &str, actions: I, require: Requirement) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define(name, actions, |d| d.require = Some(require))
    }

    /// Register a fully specified definition as-is
    pub fn permission_with(mut self, def: PermissionDef) -> Self {
        self.definitions.push(def);
        self
    }

    /// Group the permissions registered inside `f` under a project module
    pub fn project_module(mut self, name: &str, f: impl FnOnce(Self) -> Self) -> Self {
        let outer = self.current_module.replace(name.to_string());
        self = f(self);
        self.current_module = outer;
        self
    }

    fn define<I, S>(mut self, name: &str, actions: I, customize: impl FnOnce(&mut PermissionDef)) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match PermissionId::parse(name) {
            Some(id) => {
                let mut def = PermissionDef::new(id, actions);
                def.project_module = self.current_module.clone();
                customize(&mut def);
                self.definitions.push(def);
            }
            None => self.errors.push(format!("blank permission name '{}'", name)),
        }
        self
    }

    /// Validate and freeze the catalog
    pub fn build(self) -> Result<AccessControlCatalog> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(AuthzError::InvalidCatalog(first));
        }
        AccessControlCatalog::from_definitions(self.definitions)
    }
}
