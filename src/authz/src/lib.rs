//! # Hive Role Authorization
//!
//! Role-based permission resolution for the Hive project workspace.
//!
//! ## Features
//!
//! - **Explicit catalog**: the access control registry is built once and
//!   passed around behind an `Arc`, never read from a global
//! - **Normalized permission sets**: blanks dropped, duplicates collapsed and
//!   identifiers canonicalized on every mutation path
//! - **Controller/action checks** over the union of granted permissions
//! - **Memoized resolution** keyed by role and permission-set fingerprint
//! - **Role store** trait with an in-memory implementation for list
//!   positions, deletion guards and builtin fixture lookup
//!
//! ## Example
//!
//! ```rust
//! use hive_authz::{CatalogBuilder, InMemoryRoleStore, PermissionResolver, Role, RoleStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = CatalogBuilder::new()
//!         .public_permission("view_issues", ["issues/index"])
//!         .permission("edit_issues", ["issues/edit"])
//!         .build()?;
//!     let resolver = PermissionResolver::new(Arc::new(catalog));
//!
//!     let store = InMemoryRoleStore::new();
//!     let role = store.insert(Role::new("Developer")).await?;
//!     let role = store.add_permissions(role.id.unwrap(), &["edit_issues".to_string()]).await?;
//!
//!     assert!(resolver.has_permission(&role, "edit_issues"));
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod permission;
pub mod resolver;
pub mod role;
pub mod store;

// Re-export commonly used types
pub use catalog::{AccessControlCatalog, CatalogBuilder, CatalogConfig, PermissionDef, Requirement};
pub use error::{AuthzError, Result};
pub use permission::{PermissionId, PermissionSet};
pub use resolver::{CacheStats, PermissionRequest, PermissionResolver, ResolverConfig};
pub use role::{compare_by_position, BuiltinKind, Role, RoleId, RoleLevel};
pub use store::{InMemoryRoleStore, MemberId, RoleStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
