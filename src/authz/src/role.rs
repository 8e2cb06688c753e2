//! Role value objects
//!
//! A [`Role`] is the persisted record a role store hands to callers: its
//! name, list position, builtin classification, scope level and stored
//! permission set. Roles are plain values; nothing here performs I/O.

use crate::error::{AuthzError, Result};
use crate::permission::PermissionSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Store-assigned role identifier
pub type RoleId = u64;

/// Maximum role name length, in characters
pub const MAX_NAME_LENGTH: usize = 30;

/// Fixed system roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinKind {
    NonMember = 1,
    Anonymous = 2,
    Administrator = 3,
    CoreMember = 4,
    Contributor = 5,
    Founder = 6,
    Citizen = 7,
}

impl BuiltinKind {
    /// Every builtin kind, in code order
    pub const ALL: [BuiltinKind; 7] = [
        BuiltinKind::NonMember,
        BuiltinKind::Anonymous,
        BuiltinKind::Administrator,
        BuiltinKind::CoreMember,
        BuiltinKind::Contributor,
        BuiltinKind::Founder,
        BuiltinKind::Citizen,
    ];

    /// Decode a stored builtin code; 0 and unknown codes yield `None`
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Stored builtin code
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for BuiltinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuiltinKind::NonMember => "non-member",
            BuiltinKind::Anonymous => "anonymous",
            BuiltinKind::Administrator => "administrator",
            BuiltinKind::CoreMember => "core member",
            BuiltinKind::Contributor => "contributor",
            BuiltinKind::Founder => "founder",
            BuiltinKind::Citizen => "citizen",
        };
        f.write_str(label)
    }
}

/// Scope at which a role applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLevel {
    Platform = 0,
    Enterprise = 1,
    #[default]
    Project = 2,
}

/// Persisted role record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Store identifier; `None` until the role is first saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RoleId>,

    /// Unique display name
    pub name: String,

    /// 1-based position in the role list
    #[serde(default = "default_position")]
    pub position: u32,

    /// Whether the role may be manually assigned to a member
    #[serde(default = "default_true")]
    pub assignable: bool,

    /// Raw builtin code (0 for ordinary roles)
    #[serde(default)]
    pub builtin: i32,

    /// Scope level
    #[serde(default)]
    pub level: RoleLevel,

    /// Explicitly stored permissions
    #[serde(default)]
    pub permissions: PermissionSet,
}

fn default_position() -> u32 { 1 }
fn default_true() -> bool { true }

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\s'\-]*$").expect("role name pattern compiles"))
}

impl Role {
    /// Create an ordinary, unsaved role
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            position: default_position(),
            assignable: true,
            builtin: 0,
            level: RoleLevel::default(),
            permissions: PermissionSet::new(),
        }
    }

    /// Create an unsaved builtin fixture role
    pub fn builtin_role(name: impl Into<String>, kind: BuiltinKind) -> Self {
        Self {
            builtin: kind.code(),
            ..Self::new(name)
        }
    }

    pub fn with_level(mut self, level: RoleLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_assignable(mut self, assignable: bool) -> Self {
        self.assignable = assignable;
        self
    }

    /// Replace the stored permissions, normalizing the input
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.permissions = PermissionSet::from_raw(permissions);
        self
    }

    /// True until the role has been saved
    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    /// Validate persisted attributes
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AuthzError::Validation("name can't be blank".to_string()));
        }

        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(AuthzError::Validation(format!(
                "name '{}' is too long (maximum is {} characters)",
                self.name, MAX_NAME_LENGTH
            )));
        }

        if !name_pattern().is_match(&self.name) {
            return Err(AuthzError::Validation(format!(
                "name '{}' may only contain letters, digits, spaces, underscores, apostrophes and hyphens",
                self.name
            )));
        }

        Ok(())
    }

    /// Decoded builtin kind; `None` for ordinary roles and unknown codes
    pub fn builtin_kind(&self) -> Option<BuiltinKind> {
        BuiltinKind::from_code(self.builtin)
    }

    /// True for the seven fixed system roles
    pub fn is_builtin(&self) -> bool {
        self.builtin_kind().is_some()
    }

    fn is_kind(&self, kind: BuiltinKind) -> bool {
        self.builtin_kind() == Some(kind)
    }

    pub fn is_non_member(&self) -> bool {
        self.is_kind(BuiltinKind::NonMember)
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_kind(BuiltinKind::Anonymous)
    }

    pub fn is_administrator(&self) -> bool {
        self.is_kind(BuiltinKind::Administrator)
    }

    /// True for a project core team member role
    pub fn is_core_member(&self) -> bool {
        self.is_kind(BuiltinKind::CoreMember)
    }

    /// True for a project contributor role
    pub fn is_contributor(&self) -> bool {
        self.is_kind(BuiltinKind::Contributor)
    }

    pub fn is_founder(&self) -> bool {
        self.is_kind(BuiltinKind::Founder)
    }

    pub fn is_citizen(&self) -> bool {
        self.is_kind(BuiltinKind::Citizen)
    }

    /// True for project member roles: administrator, core member or contributor
    pub fn is_member(&self) -> bool {
        self.is_administrator() || self.is_core_member() || self.is_contributor()
    }

    /// Copy of this role with `perms` added to the stored set
    ///
    /// Blank entries are dropped and already-present permissions are left
    /// in place.
    pub fn with_permissions_added<I, S>(&self, perms: I) -> Role
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut updated = self.clone();
        updated.permissions.extend_raw(perms);
        updated
    }

    /// Copy of this role with `perms` removed from the stored set
    pub fn with_permissions_removed<I, S>(&self, perms: I) -> Role
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut updated = self.clone();
        for id in PermissionSet::from_raw(perms).iter() {
            updated.permissions.remove(id.as_str());
        }
        updated
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Order roles by list position
///
/// A missing role sorts before any concrete role.
pub fn compare_by_position(a: Option<&Role>, b: Option<&Role>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.position.cmp(&b.position),
    }
}
