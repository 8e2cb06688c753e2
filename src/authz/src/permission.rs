//! Permission identifiers and normalized permission sets
//!
//! Permissions are symbolic names such as `edit_issues`. Every value that
//! enters the crate goes through [`PermissionId::parse`], so the rest of the
//! code never sees blank or decorated identifiers.

use crate::error::AuthzError;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical symbolic permission identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionId(String);

impl PermissionId {
    /// Normalize a raw identifier into canonical form
    ///
    /// Surrounding whitespace and a single leading `:` are stripped, so
    /// `" :edit_issues "` and `"edit_issues"` name the same permission.
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix(':').unwrap_or(trimmed).trim();

        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    /// Borrow the canonical name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PermissionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PermissionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionId {
    type Error = AuthzError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
            .ok_or_else(|| AuthzError::InvalidInput("permission identifier cannot be blank".to_string()))
    }
}

impl From<PermissionId> for String {
    fn from(id: PermissionId) -> Self {
        id.0
    }
}

/// Insertion-ordered set of permissions
///
/// Duplicates collapse onto their first occurrence and blank entries are
/// dropped on every mutation path, including deserialization. Equality is
/// set equality; insertion order only matters for serialization.
/// Membership checks are O(1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Vec<String>")]
pub struct PermissionSet {
    items: IndexSet<PermissionId>,
}

impl PermissionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized set from raw identifiers
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.extend_raw(raw);
        set
    }

    /// Insert a permission, returning `false` if it was already present
    pub fn insert(&mut self, id: PermissionId) -> bool {
        self.items.insert(id)
    }

    /// Remove a permission, returning `false` if it was absent
    pub fn remove(&mut self, id: &str) -> bool {
        self.items.shift_remove(id)
    }

    /// Normalize and insert every raw identifier
    pub fn extend_raw<I, S>(&mut self, raw: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in raw.into_iter().filter_map(|r| PermissionId::parse(r.as_ref())) {
            self.insert(id);
        }
    }

    /// Check membership by canonical name
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains(id)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PermissionId> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements of `self` followed by elements of `other` not already present
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        let mut out = self.clone();
        out.items.reserve(other.len());
        out.extend(other.iter().cloned());
        out
    }

    /// Elements of `self` that are not in `other`
    pub fn difference(&self, other: &PermissionSet) -> PermissionSet {
        self.items
            .iter()
            .filter(|p| !other.contains(p.as_str()))
            .cloned()
            .collect()
    }

    /// True if any element is shared with `other`
    pub fn intersects(&self, other: &PermissionSet) -> bool {
        self.items.iter().any(|p| other.contains(p.as_str()))
    }

    /// Order-independent BLAKE3 digest of the set contents
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut sorted: Vec<&str> = self.items.iter().map(PermissionId::as_str).collect();
        sorted.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        for id in sorted {
            hasher.update(id.as_bytes());
            // Separator so ["ab", "c"] and ["a", "bc"] differ
            hasher.update(&[0]);
        }
        *hasher.finalize().as_bytes()
    }
}

impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|p| other.contains(p.as_str()))
    }
}

impl Eq for PermissionSet {}

impl Extend<PermissionId> for PermissionSet {
    fn extend<T: IntoIterator<Item = PermissionId>>(&mut self, iter: T) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<PermissionId> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionId>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionId;
    type IntoIter = indexmap::set::Iter<'a, PermissionId>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl From<Option<Vec<String>>> for PermissionSet {
    fn from(raw: Option<Vec<String>>) -> Self {
        raw.map(Self::from_raw).unwrap_or_default()
    }
}

impl From<PermissionSet> for Vec<String> {
    fn from(set: PermissionSet) -> Self {
        set.items.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(PermissionId::parse("edit_issues").unwrap().as_str(), "edit_issues");
        assert_eq!(PermissionId::parse("  :edit_issues ").unwrap().as_str(), "edit_issues");
        assert_eq!(PermissionId::parse(": view_files").unwrap().as_str(), "view_files");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(PermissionId::parse("").is_none());
        assert!(PermissionId::parse("   ").is_none());
        assert!(PermissionId::parse(":").is_none());
    }

    #[test]
    fn test_set_collapses_duplicates_and_blanks() {
        let set = PermissionSet::from_raw(["edit_issues", "", ":edit_issues", "  ", "view_issues"]);

        assert_eq!(set.len(), 2);
        let names: Vec<&str> = set.iter().map(PermissionId::as_str).collect();
        assert_eq!(names, vec!["edit_issues", "view_issues"]);
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = PermissionSet::from_raw(["a", "b"]);
        let b = PermissionSet::from_raw(["b", "a"]);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = PermissionSet::from_raw(["a"]);
        assert_ne!(a, c);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_separates_boundaries() {
        let a = PermissionSet::from_raw(["ab", "c"]);
        let b = PermissionSet::from_raw(["a", "bc"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = PermissionSet::from_raw(["a"]);
        assert!(!set.remove("b"));
        assert!(set.remove("a"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_union_and_difference() {
        let stored = PermissionSet::from_raw(["edit_issues"]);
        let public = PermissionSet::from_raw(["view_issues", "edit_issues"]);

        let union = stored.union(&public);
        let names: Vec<&str> = union.iter().map(PermissionId::as_str).collect();
        assert_eq!(names, vec!["edit_issues", "view_issues"]);

        let diff = public.difference(&stored);
        assert_eq!(diff, PermissionSet::from_raw(["view_issues"]));
        assert!(stored.intersects(&public));
    }

    #[test]
    fn test_large_sets_stay_fast() {
        let n = 50_000;
        let stored = PermissionSet::from_raw((0..n).map(|i| format!("stored_{}", i)));
        let public = PermissionSet::from_raw((0..n).map(|i| format!("public_{}", i)));

        let started = std::time::Instant::now();
        let union = stored.union(&public);
        let diff = union.difference(&public);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert_eq!(union.len(), 2 * n);
        assert_eq!(diff, stored);
        assert!(union.contains("public_49999"));
        assert_eq!(union.iter().next().unwrap().as_str(), "stored_0");
    }

    #[test]
    fn test_remove_keeps_insertion_order() {
        let mut set = PermissionSet::from_raw(["a", "b", "c"]);
        assert!(set.remove("b"));
        let names: Vec<&str> = set.iter().map(PermissionId::as_str).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_serde_normalizes_on_read() {
        let set: PermissionSet = serde_json::from_str(r#"[":a", "", "a", "b"]"#).unwrap();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);

        let empty: PermissionSet = serde_json::from_str("null").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_permission_id_rejects_blank_on_deserialize() {
        assert!(serde_json::from_str::<PermissionId>(r#""  ""#).is_err());
        let id: PermissionId = serde_json::from_str(r#"":manage_roles""#).unwrap();
        assert_eq!(id.as_str(), "manage_roles");
    }
}
