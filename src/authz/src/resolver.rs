//! Permission resolver
//!
//! Decides what a role is granted, combining the role's stored permissions
//! with the catalog's public permissions. Everything here is a pure function
//! of `(role.permissions, role.builtin, catalog)`.
//!
//! # Memoization
//!
//! The union of authorized actions is the expensive part of a check, so the
//! resolver keeps one entry per saved role in a `DashMap`. Each entry carries
//! the BLAKE3 fingerprint of the permission set it was computed from; a role
//! whose stored permissions changed no longer matches its entry and is
//! recomputed. Unsaved roles are never memoized.
//!
//! # Example
//!
//! ```rust
//! use hive_authz::{CatalogBuilder, PermissionRequest, PermissionResolver, Role};
//! use std::sync::Arc;
//!
//! let catalog = CatalogBuilder::new()
//!     .public_permission("view_issues", ["issues/index"])
//!     .permission("edit_issues", ["issues/edit"])
//!     .permission("manage_roles", ["roles/edit"])
//!     .build()
//!     .unwrap();
//!
//! let resolver = PermissionResolver::new(Arc::new(catalog));
//! let role = Role::new("Developer").with_permissions(["edit_issues"]);
//!
//! assert!(resolver.has_permission(&role, "view_issues"));
//! assert!(!resolver.has_permission(&role, "manage_roles"));
//! assert!(resolver.is_allowed(&role, &PermissionRequest::action("issues", "edit")));
//! ```

use crate::catalog::AccessControlCatalog;
use crate::permission::{PermissionId, PermissionSet};
use crate::role::{BuiltinKind, Role, RoleId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use crate::role::compare_by_position;

/// What a caller wants to do
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionRequest {
    /// A bare permission
    Permission(PermissionId),
    /// A controller/action pair
    Action { controller: String, action: String },
}

impl PermissionRequest {
    /// Build a controller/action request
    pub fn action(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Action {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Parse `controller/action` or a bare permission name
    ///
    /// Returns `None` for blank input or a pair with an empty half.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.rsplit_once('/') {
            Some((controller, action)) => {
                let (controller, action) = (controller.trim(), action.trim());
                if controller.is_empty() || action.is_empty() {
                    None
                } else {
                    Some(Self::action(controller, action))
                }
            }
            None => PermissionId::parse(raw).map(Self::Permission),
        }
    }
}

impl From<PermissionId> for PermissionRequest {
    fn from(id: PermissionId) -> Self {
        Self::Permission(id)
    }
}

impl fmt::Display for PermissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission(id) => write!(f, "{}", id),
            Self::Action { controller, action } => write!(f, "{}/{}", controller, action),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Memoize effective permissions per saved role
    pub enable_cache: bool,

    /// Maximum number of memoized roles
    pub max_entries: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            max_entries: 10_000,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of memoized roles
    pub entries: usize,
    /// Configured capacity
    pub max_entries: usize,
    /// Lookups answered from the memo
    pub hits: usize,
    /// Lookups with no memo entry
    pub misses: usize,
    /// Lookups whose entry was computed from an older permission set
    pub stale: usize,
}

/// Everything a role is granted
#[derive(Debug)]
struct Grant {
    permissions: PermissionSet,
    actions: HashSet<String>,
}

#[derive(Debug, Clone)]
struct CachedGrant {
    fingerprint: [u8; 32],
    grant: Arc<Grant>,
}

/// Resolves role permissions against an access control catalog
///
/// # Thread Safety
///
/// The resolver is `Send + Sync` and cheap to clone; clones share the
/// catalog and the memo.
#[derive(Clone)]
pub struct PermissionResolver {
    /// Immutable permission registry
    catalog: Arc<AccessControlCatalog>,

    /// Memoized grants, keyed by role id
    cache: Arc<DashMap<RoleId, CachedGrant>>,

    /// Memo counters
    stats: Arc<DashMap<&'static str, usize>>,

    config: ResolverConfig,
}

impl PermissionResolver {
    /// Create a resolver with default settings
    pub fn new(catalog: Arc<AccessControlCatalog>) -> Self {
        Self::with_config(catalog, ResolverConfig::default())
    }

    /// Create a resolver with custom settings
    pub fn with_config(catalog: Arc<AccessControlCatalog>, config: ResolverConfig) -> Self {
        Self {
            catalog,
            cache: Arc::new(DashMap::new()),
            stats: Arc::new(DashMap::new()),
            config,
        }
    }

    /// The catalog this resolver checks against
    pub fn catalog(&self) -> &AccessControlCatalog {
        &self.catalog
    }

    /// Stored permissions plus every public permission
    pub fn effective_permissions(&self, role: &Role) -> PermissionSet {
        self.grant(role).permissions.clone()
    }

    /// True if the role is granted `permission`
    ///
    /// The input is normalized first; blank input is never granted.
    pub fn has_permission(&self, role: &Role, permission: &str) -> bool {
        match PermissionId::parse(permission) {
            Some(id) => self.grants(role, &id),
            None => false,
        }
    }

    /// True if the role may perform the request
    ///
    /// Action requests match the exact `controller/action` string against
    /// the actions of every granted permission.
    pub fn is_allowed(&self, role: &Role, request: &PermissionRequest) -> bool {
        let allowed = match request {
            PermissionRequest::Permission(id) => self.grants(role, id),
            PermissionRequest::Action { controller, action } => {
                if controller.is_empty() || action.is_empty() {
                    false
                } else {
                    let path = format!("{}/{}", controller, action);
                    self.grant(role).actions.contains(&path)
                }
            }
        };

        debug!("Role '{}' {} for {}", role.name, if allowed { "allowed" } else { "denied" }, request);
        allowed
    }

    /// Permissions an administrator may toggle on this role
    ///
    /// Public permissions are implicit and never setable. Members-only
    /// permissions are withheld from the non-member role and logged-in-only
    /// permissions from the anonymous role.
    pub fn setable_permissions(&self, role: &Role) -> PermissionSet {
        let setable = self
            .catalog
            .all_permissions()
            .difference(self.catalog.public_permissions());

        match role.builtin_kind() {
            Some(BuiltinKind::NonMember) => setable.difference(self.catalog.members_only_permissions()),
            Some(BuiltinKind::Anonymous) => setable.difference(self.catalog.logged_in_only_permissions()),
            _ => setable,
        }
    }

    /// Copy of `role` with `perms` added; the caller persists it
    pub fn add_permissions<I, S>(&self, role: &Role, perms: I) -> Role
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        role.with_permissions_added(perms)
    }

    /// Copy of `role` with `perms` removed; the caller persists it
    pub fn remove_permissions<I, S>(&self, role: &Role, perms: I) -> Role
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        role.with_permissions_removed(perms)
    }

    /// Drop the memo entry for one role
    pub fn invalidate(&self, role_id: RoleId) {
        self.cache.remove(&role_id);
    }

    /// Drop every memo entry and reset counters
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.stats.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            max_entries: self.config.max_entries,
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            stale: self.get_stat("stale"),
        }
    }

    fn grants(&self, role: &Role, id: &PermissionId) -> bool {
        role.permissions.contains(id.as_str())
            || self.catalog.public_permissions().contains(id.as_str())
    }

    fn grant(&self, role: &Role) -> Arc<Grant> {
        let id = match role.id {
            Some(id) if self.config.enable_cache => id,
            _ => return Arc::new(self.compute_grant(role)),
        };

        let fingerprint = role.permissions.fingerprint();

        if let Some(entry) = self.cache.get(&id) {
            if entry.fingerprint == fingerprint {
                self.increment_stat("hits");
                return Arc::clone(&entry.grant);
            }
            self.increment_stat("stale");
        } else {
            self.increment_stat("misses");
        }

        let grant = Arc::new(self.compute_grant(role));

        // Replacing a stale entry never grows the memo
        if self.cache.contains_key(&id) || self.cache.len() < self.config.max_entries {
            self.cache.insert(
                id,
                CachedGrant {
                    fingerprint,
                    grant: Arc::clone(&grant),
                },
            );
        }

        grant
    }

    fn compute_grant(&self, role: &Role) -> Grant {
        let permissions = role.permissions.union(self.catalog.public_permissions());

        let actions: HashSet<String> = permissions
            .iter()
            .flat_map(|p| self.catalog.actions_for(p.as_str()).iter().cloned())
            .collect();

        debug!(
            "Resolved role '{}': {} permissions, {} actions",
            role.name,
            permissions.len(),
            actions.len()
        );

        Grant { permissions, actions }
    }

    fn increment_stat(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
