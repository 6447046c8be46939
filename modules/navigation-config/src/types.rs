//! Core record types for the navigation hierarchy.

use serde::{Deserialize, Serialize};

/// Reserved key for the implicit section that holds pages with no section.
pub const UNGROUPED_KEY: &str = "ungrouped";

// --- Section references ---

/// Where a page lives: a named section, or the implicit ungrouped bucket.
///
/// Serialized as the nullable `sectionKey` column (`null` = ungrouped). The
/// string `"ungrouped"` also parses to `Ungrouped`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum SectionRef {
    Named(String),
    Ungrouped,
}

impl SectionRef {
    pub fn named(key: impl Into<String>) -> Self {
        Self::from(Some(key.into()))
    }

    /// The section key, or `None` for the ungrouped bucket.
    pub fn key(&self) -> Option<&str> {
        match self {
            SectionRef::Named(key) => Some(key),
            SectionRef::Ungrouped => None,
        }
    }

    pub fn is_ungrouped(&self) -> bool {
        matches!(self, SectionRef::Ungrouped)
    }
}

impl From<Option<String>> for SectionRef {
    fn from(key: Option<String>) -> Self {
        match key {
            Some(k) if !k.is_empty() && k != UNGROUPED_KEY => SectionRef::Named(k),
            _ => SectionRef::Ungrouped,
        }
    }
}

impl From<SectionRef> for Option<String> {
    fn from(section: SectionRef) -> Self {
        match section {
            SectionRef::Named(key) => Some(key),
            SectionRef::Ungrouped => None,
        }
    }
}

impl std::fmt::Display for SectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionRef::Named(key) => write!(f, "{key}"),
            SectionRef::Ungrouped => write!(f, "{UNGROUPED_KEY}"),
        }
    }
}

// --- Records ---

/// A named, ordered grouping in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub key: String,
    pub display_name: String,
    pub icon_name: String,
    /// Global ordering key among sections. Not required to be contiguous.
    pub sort_order: i32,
    #[serde(default)]
    pub collapsed_by_default: bool,
}

/// A single navigable item in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEntry {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon_name: String,
    pub route: String,
    /// Opaque capability identifier, evaluated by the auth layer.
    pub permission: String,
    #[serde(default = "ungrouped")]
    pub section_key: SectionRef,
    /// Ordering key within `section_key`.
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub primary_action_label: Option<String>,
    #[serde(default)]
    pub ai_action_label: Option<String>,
}

fn ungrouped() -> SectionRef {
    SectionRef::Ungrouped
}

fn default_visible() -> bool {
    true
}

// --- Reorder batches ---

/// New position for one page. Part of a batch applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlacement {
    pub key: String,
    pub sort_order: i32,
    pub section_key: SectionRef,
}

/// New position for one section. Part of a batch applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPlacement {
    pub key: String,
    pub sort_order: i32,
}

/// A single drop in the settings screen, reduced to what the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub moved_key: String,
    pub source_container: SectionRef,
    pub target_container: SectionRef,
    /// Position within the target's items after the moved item is removed.
    pub target_index: usize,
}

impl MoveIntent {
    pub fn new(
        moved_key: impl Into<String>,
        source_container: SectionRef,
        target_container: SectionRef,
        target_index: usize,
    ) -> Self {
        Self {
            moved_key: moved_key.into(),
            source_container,
            target_container,
            target_index,
        }
    }

    pub fn is_cross_section(&self) -> bool {
        self.source_container != self.target_container
    }
}
