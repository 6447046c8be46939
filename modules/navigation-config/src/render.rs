//! What the sidebar renderer reads.
//!
//! Only visible pages whose permission the caller holds make it into the
//! view. Permission evaluation itself belongs to the auth layer and is
//! reached through [`PermissionChecker`].

use std::collections::HashSet;

use serde::Serialize;

use crate::registry::Snapshot;
use crate::types::SectionRef;

/// Capability check supplied by the auth layer, called once per page.
pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: &str) -> bool;
}

/// A fixed set of granted capabilities.
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions(HashSet<String>);

impl GrantedPermissions {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }
}

impl PermissionChecker for GrantedPermissions {
    fn is_granted(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }
}

impl<F> PermissionChecker for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_granted(&self, permission: &str) -> bool {
        self(permission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub key: String,
    pub title: String,
    pub icon_name: String,
    pub route: String,
    pub primary_action_label: Option<String>,
    pub ai_action_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavGroup {
    /// `None` for the ungrouped bucket, which renders without a heading.
    pub section_key: Option<String>,
    pub display_name: Option<String>,
    pub icon_name: Option<String>,
    pub collapsed_by_default: bool,
    pub items: Vec<NavItem>,
}

/// Build the sidebar for one caller. Groups follow section order with the
/// ungrouped bucket last; groups left empty after filtering are dropped.
pub fn navigation_view(snapshot: &Snapshot, checker: &dyn PermissionChecker) -> Vec<NavGroup> {
    snapshot
        .groups_in_display_order()
        .into_iter()
        .filter_map(|(section, pages)| {
            let items: Vec<NavItem> = pages
                .into_iter()
                .filter(|p| p.visible && checker.is_granted(&p.permission))
                .map(|p| NavItem {
                    key: p.key.clone(),
                    title: p.title.clone(),
                    icon_name: p.icon_name.clone(),
                    route: p.route.clone(),
                    primary_action_label: p.primary_action_label.clone(),
                    ai_action_label: p.ai_action_label.clone(),
                })
                .collect();
            if items.is_empty() {
                return None;
            }

            let group = match &section {
                SectionRef::Named(key) => {
                    let meta = snapshot.sections.get(key);
                    NavGroup {
                        section_key: Some(key.clone()),
                        display_name: meta.map(|s| s.display_name.clone()),
                        icon_name: meta.map(|s| s.icon_name.clone()),
                        collapsed_by_default: meta.is_some_and(|s| s.collapsed_by_default),
                        items,
                    }
                }
                SectionRef::Ungrouped => NavGroup {
                    section_key: None,
                    display_name: None,
                    icon_name: None,
                    collapsed_by_default: false,
                    items,
                },
            };
            Some(group)
        })
        .collect()
}
