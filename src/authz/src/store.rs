//! Role storage
//!
//! [`RoleStore`] is the repository the rest of the application reads roles
//! through. It owns persistence concerns the resolver stays out of: name
//! uniqueness, list positions, deletion guards, member associations and the
//! lookup of builtin fixture roles.

use crate::error::{AuthzError, Result};
use crate::role::{compare_by_position, BuiltinKind, Role, RoleId, RoleLevel};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Identifier of a member holding a role
pub type MemberId = u64;

/// Role store trait
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Get a role by ID
    async fn get(&self, id: RoleId) -> Result<Option<Role>>;

    /// Get a role by exact name
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// List all roles, ordered by position
    async fn list(&self) -> Result<Vec<Role>>;

    /// Validate and save a new role at the bottom of the list
    ///
    /// Fails if the role is builtin and its kind already has a role.
    async fn insert(&self, role: Role) -> Result<Role>;

    /// Validate and save changes to an existing role
    ///
    /// Position is kept. Changing the builtin code is rejected.
    async fn update(&self, role: Role) -> Result<Role>;

    /// Move a role to `position`, renumbering the others
    async fn move_to(&self, id: RoleId, position: u32) -> Result<Role>;

    /// Delete an ordinary role that no member holds
    async fn delete(&self, id: RoleId) -> Result<()>;

    /// Associate a member with a role
    async fn add_member(&self, role_id: RoleId, member_id: MemberId) -> Result<()>;

    /// Dissociate a member from a role, returning whether it was associated
    async fn remove_member(&self, role_id: RoleId, member_id: MemberId) -> Result<bool>;

    /// Number of members holding a role
    async fn member_count(&self, role_id: RoleId) -> Result<usize>;

    /// Atomically add permissions to a stored role
    async fn add_permissions(&self, id: RoleId, perms: &[String]) -> Result<Role>;

    /// Atomically remove permissions from a stored role
    async fn remove_permissions(&self, id: RoleId, perms: &[String]) -> Result<Role>;

    /// The singleton role of a builtin kind
    async fn builtin(&self, kind: BuiltinKind) -> Result<Role> {
        self.list()
            .await?
            .into_iter()
            .find(|r| r.builtin_kind() == Some(kind))
            .ok_or(AuthzError::MissingFixture(kind))
    }

    /// Fail unless every builtin kind has its role
    async fn ensure_fixtures(&self) -> Result<()> {
        for kind in BuiltinKind::ALL {
            self.builtin(kind).await?;
        }
        Ok(())
    }

    /// Ordinary roles, ordered by position
    async fn givable(&self) -> Result<Vec<Role>> {
        self.builtins(false).await
    }

    /// Builtin roles if `builtin`, ordinary roles otherwise
    async fn builtins(&self, builtin: bool) -> Result<Vec<Role>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.is_builtin() == builtin)
            .collect())
    }

    /// Roles at a scope level, ordered by position
    async fn find_all_givable(&self, level: RoleLevel) -> Result<Vec<Role>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.level == level)
            .collect())
    }
}

#[derive(Default)]
struct StoreState {
    roles: HashMap<RoleId, Role>,
    members: HashMap<RoleId, HashSet<MemberId>>,
    next_id: RoleId,
}

impl StoreState {
    fn ordered_ids(&self) -> Vec<RoleId> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by(|a, b| compare_by_position(Some(a), Some(b)).then(a.id.cmp(&b.id)));
        roles.into_iter().filter_map(|r| r.id).collect()
    }

    /// Assign contiguous 1-based positions following `order`
    fn renumber(&mut self, order: &[RoleId]) {
        for (i, id) in order.iter().enumerate() {
            if let Some(role) = self.roles.get_mut(id) {
                role.position = i as u32 + 1;
            }
        }
    }

    fn ensure_unique_name(&self, name: &str, except: Option<RoleId>) -> Result<()> {
        let taken = self
            .roles
            .values()
            .any(|r| r.name == name && r.id != except);

        if taken {
            Err(AuthzError::DuplicateRole(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// At most one role per builtin kind
    fn ensure_unique_builtin(&self, role: &Role) -> Result<()> {
        let Some(kind) = role.builtin_kind() else {
            return Ok(());
        };

        if self.roles.values().any(|r| r.builtin_kind() == Some(kind)) {
            Err(AuthzError::InvalidInput(format!(
                "a {} builtin role already exists",
                kind
            )))
        } else {
            Ok(())
        }
    }

    fn role_mut(&mut self, id: RoleId) -> Result<&mut Role> {
        self.roles.get_mut(&id).ok_or(AuthzError::RoleNotFound(id))
    }
}

/// In-memory role store implementation
#[derive(Clone, Default)]
pub struct InMemoryRoleStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryRoleStore {
    /// Create an empty in-memory role store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `roles`, in order
    pub async fn seeded(roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        let store = Self::new();
        for role in roles {
            store.insert(role).await?;
        }
        Ok(store)
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, id: RoleId) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .ordered_ids()
            .iter()
            .filter_map(|id| state.roles.get(id).cloned())
            .collect())
    }

    async fn insert(&self, mut role: Role) -> Result<Role> {
        role.validate()?;

        let mut state = self.state.write().await;
        state.ensure_unique_name(&role.name, None)?;
        state.ensure_unique_builtin(&role)?;

        state.next_id += 1;
        let id = state.next_id;
        role.id = Some(id);
        role.position = state.roles.len() as u32 + 1;

        info!("Inserted role '{}' (id={}, builtin={})", role.name, id, role.builtin);
        state.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn update(&self, mut role: Role) -> Result<Role> {
        let id = role
            .id
            .ok_or_else(|| AuthzError::InvalidInput(format!("role '{}' has not been saved", role.name)))?;
        role.validate()?;

        let mut state = self.state.write().await;
        state.ensure_unique_name(&role.name, Some(id))?;

        let stored = state.role_mut(id)?;
        if role.builtin != stored.builtin {
            return Err(AuthzError::InvalidInput(format!(
                "builtin code of role '{}' cannot change",
                stored.name
            )));
        }
        role.position = stored.position;
        *stored = role.clone();

        info!("Updated role '{}' (id={})", role.name, id);
        Ok(role)
    }

    async fn move_to(&self, id: RoleId, position: u32) -> Result<Role> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&id) {
            return Err(AuthzError::RoleNotFound(id));
        }

        let mut order = state.ordered_ids();
        order.retain(|&other| other != id);
        let index = (position.max(1) as usize - 1).min(order.len());
        order.insert(index, id);
        state.renumber(&order);

        let role = state.role_mut(id)?.clone();
        info!("Moved role '{}' to position {}", role.name, role.position);
        Ok(role)
    }

    async fn delete(&self, id: RoleId) -> Result<()> {
        let mut state = self.state.write().await;
        let role = state.roles.get(&id).ok_or(AuthzError::RoleNotFound(id))?;

        let has_members = state.members.get(&id).is_some_and(|m| !m.is_empty());
        let refusal = if has_members {
            Some("role is assigned to members")
        } else if role.is_builtin() {
            Some("builtin roles are fixtures")
        } else {
            None
        };

        if let Some(reason) = refusal {
            warn!("Refused to delete role '{}': {}", role.name, reason);
            return Err(AuthzError::NotDeletable {
                name: role.name.clone(),
                reason: reason.to_string(),
            });
        }

        let name = role.name.clone();
        state.roles.remove(&id);
        state.members.remove(&id);
        let order = state.ordered_ids();
        state.renumber(&order);

        info!("Deleted role '{}' (id={})", name, id);
        Ok(())
    }

    async fn add_member(&self, role_id: RoleId, member_id: MemberId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role_id) {
            return Err(AuthzError::RoleNotFound(role_id));
        }
        state.members.entry(role_id).or_default().insert(member_id);
        Ok(())
    }

    async fn remove_member(&self, role_id: RoleId, member_id: MemberId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&role_id) {
            return Err(AuthzError::RoleNotFound(role_id));
        }
        Ok(state
            .members
            .get_mut(&role_id)
            .is_some_and(|m| m.remove(&member_id)))
    }

    async fn member_count(&self, role_id: RoleId) -> Result<usize> {
        let state = self.state.read().await;
        if !state.roles.contains_key(&role_id) {
            return Err(AuthzError::RoleNotFound(role_id));
        }
        Ok(state.members.get(&role_id).map_or(0, HashSet::len))
    }

    async fn add_permissions(&self, id: RoleId, perms: &[String]) -> Result<Role> {
        let mut state = self.state.write().await;
        let stored = state.role_mut(id)?;
        *stored = stored.with_permissions_added(perms);

        info!("Added permissions {:?} to role '{}'", perms, stored.name);
        Ok(stored.clone())
    }

    async fn remove_permissions(&self, id: RoleId, perms: &[String]) -> Result<Role> {
        let mut state = self.state.write().await;
        let stored = state.role_mut(id)?;
        *stored = stored.with_permissions_removed(perms);

        info!("Removed permissions {:?} from role '{}'", perms, stored.name);
        Ok(stored.clone())
    }
}
