//! Shared fixtures for integration tests

#![allow(dead_code)]

use hive_authz::{AccessControlCatalog, BuiltinKind, CatalogBuilder, Requirement, Role};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static ROLE_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Next unique role name: "Role 1", "Role 2", ...
pub fn next_role_name() -> String {
    format!("Role {}", ROLE_SEQUENCE.fetch_add(1, Ordering::SeqCst) + 1)
}

/// Catalog shaped like a small project tracker
pub fn tracker_catalog() -> Arc<AccessControlCatalog> {
    Arc::new(
        CatalogBuilder::new()
            .permission("manage_roles", ["roles/index", "roles/new", "roles/edit"])
            .project_module("issue_tracking", |m| {
                m.public_permission("view_issues", ["issues/index", "issues/show"])
                    .permission("add_issues", ["issues/new", "issues/create"])
                    .permission("edit_issues", ["issues/edit", "issues/update"])
                    .permission_requiring("add_issue_notes", ["journals/new", "issues/edit"], Requirement::LoggedIn)
                    .permission_requiring("add_issue_watchers", ["watchers/new"], Requirement::Member)
            })
            .project_module("wiki", |m| {
                m.public_permission("view_wiki_pages", ["wiki/index", "wiki/show"])
                    .permission("edit_wiki_pages", ["wiki/edit", "wiki/update"])
                    .permission_requiring("protect_wiki_pages", ["wiki/protect"], Requirement::Member)
            })
            .build()
            .expect("tracker catalog is valid"),
    )
}

/// The seven builtin fixtures followed by two ordinary roles
pub fn fixture_roles() -> Vec<Role> {
    vec![
        Role::builtin_role("Non member", BuiltinKind::NonMember),
        Role::builtin_role("Anonymous", BuiltinKind::Anonymous),
        Role::builtin_role("Administrator", BuiltinKind::Administrator)
            .with_permissions(["manage_roles", "edit_issues", "add_issues"]),
        Role::builtin_role("Core Member", BuiltinKind::CoreMember).with_permissions(["edit_issues", "add_issues"]),
        Role::builtin_role("Contributor", BuiltinKind::Contributor).with_permissions(["add_issues"]),
        Role::builtin_role("Founder", BuiltinKind::Founder),
        Role::builtin_role("Citizen", BuiltinKind::Citizen),
        Role::new("Reporter").with_permissions(["add_issues", "add_issue_notes"]),
        Role::new("Wiki Editor").with_permissions(["edit_wiki_pages"]),
    ]
}
