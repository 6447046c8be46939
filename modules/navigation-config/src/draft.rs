//! Admin input: drafts for new records and edits to existing ones.
//!
//! Keys, section membership and ordering are deliberately absent from the
//! edit types. Keys never change; membership and order change only through
//! the reorder engine.

use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::error::{NavError, Result};
use crate::types::{PageEntry, Section, SectionRef};

/// A section to be created. `sort_order` defaults to the end of the list.
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    #[builder(setter(into))]
    pub key: String,
    #[builder(setter(into))]
    pub display_name: String,
    #[builder(setter(into))]
    pub icon_name: String,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[builder(default)]
    #[serde(default)]
    pub collapsed_by_default: bool,
}

impl SectionDraft {
    pub(crate) fn into_section(self, sort_order: i32) -> Section {
        Section {
            key: self.key,
            display_name: self.display_name,
            icon_name: self.icon_name,
            sort_order,
            collapsed_by_default: self.collapsed_by_default,
        }
    }
}

/// Mutable section fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SectionEdit {
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub display_name: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub icon_name: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub collapsed_by_default: Option<bool>,
}

impl SectionEdit {
    pub(crate) fn apply(self, section: &mut Section) {
        if let Some(name) = self.display_name {
            section.display_name = name;
        }
        if let Some(icon) = self.icon_name {
            section.icon_name = icon;
        }
        if let Some(collapsed) = self.collapsed_by_default {
            section.collapsed_by_default = collapsed;
        }
    }
}

/// A page to be created. Lands at the end of its section unless
/// `sort_order` is given.
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct PageDraft {
    #[builder(setter(into))]
    pub key: String,
    #[builder(setter(into))]
    pub title: String,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub description: Option<String>,
    #[builder(setter(into))]
    pub icon_name: String,
    #[builder(setter(into))]
    pub route: String,
    #[builder(setter(into))]
    pub permission: String,
    #[builder(default = SectionRef::Ungrouped)]
    #[serde(default = "ungrouped")]
    pub section_key: SectionRef,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[builder(default = true)]
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub primary_action_label: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub ai_action_label: Option<String>,
}

fn ungrouped() -> SectionRef {
    SectionRef::Ungrouped
}

fn visible_by_default() -> bool {
    true
}

impl PageDraft {
    pub(crate) fn into_page(self, sort_order: i32) -> PageEntry {
        PageEntry {
            key: self.key,
            title: self.title,
            description: self.description,
            icon_name: self.icon_name,
            route: self.route,
            permission: self.permission,
            section_key: self.section_key,
            sort_order,
            visible: self.visible,
            primary_action_label: self.primary_action_label,
            ai_action_label: self.ai_action_label,
        }
    }
}

/// Mutable page fields. `None` leaves a field unchanged.
///
/// The optional text fields take `Some(None)` to clear them.
#[derive(Debug, Clone, Default, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct PageEdit {
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub title: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub icon_name: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub route: Option<String>,
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub permission: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(default, with = "double_option")]
    pub primary_action_label: Option<Option<String>>,
    #[builder(default, setter(strip_option))]
    #[serde(default, with = "double_option")]
    pub ai_action_label: Option<Option<String>>,
}

impl PageEdit {
    pub(crate) fn apply(self, page: &mut PageEntry) {
        if let Some(title) = self.title {
            page.title = title;
        }
        if let Some(description) = self.description {
            page.description = description;
        }
        if let Some(icon) = self.icon_name {
            page.icon_name = icon;
        }
        if let Some(route) = self.route {
            page.route = route;
        }
        if let Some(permission) = self.permission {
            page.permission = permission;
        }
        if let Some(label) = self.primary_action_label {
            page.primary_action_label = label;
        }
        if let Some(label) = self.ai_action_label {
            page.ai_action_label = label;
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Proof that the operator confirmed a reset. Outside this crate, only
/// obtainable from the literal phrase `RESET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetConfirmation(());

impl ResetConfirmation {
    pub const PHRASE: &'static str = "RESET";

    pub fn parse(input: &str) -> Result<Self> {
        if input.trim() == Self::PHRASE {
            Ok(Self(()))
        } else {
            Err(NavError::validation(format!(
                "reset requires typing {} to confirm",
                Self::PHRASE
            )))
        }
    }

    /// First-run seeding of an empty store has nothing to lose.
    pub(crate) fn for_empty_store() -> Self {
        Self(())
    }
}
