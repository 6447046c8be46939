//! Deletion policy.
//!
//! Visible records are live: the sidebar renders them and other screens link
//! to their routes. Deleting one is refused until it has been hidden, and a
//! section with visible pages can only go with an explicit cascade. Both the
//! manager and the stores run these checks, the stores inside the same
//! transaction as the delete.

use crate::error::{DeletionBlocked, NavError, Result};
use crate::types::{PageEntry, SectionRef, UNGROUPED_KEY};

/// What a permitted section delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDeletion {
    pub section_key: String,
    /// Pages removed with the section. Without cascade these are all hidden.
    pub page_keys: Vec<String>,
}

pub fn vet_page_delete(page: &PageEntry) -> Result<()> {
    if page.visible {
        return Err(DeletionBlocked::PageVisible {
            page_key: page.key.clone(),
        }
        .into());
    }
    Ok(())
}

/// Decide whether `section_key` may be deleted given the pages that point at
/// it. Pages in other sections are ignored.
pub fn vet_section_delete<'a>(
    section_key: &str,
    pages: impl IntoIterator<Item = &'a PageEntry>,
    cascade: bool,
) -> Result<SectionDeletion> {
    if section_key == UNGROUPED_KEY {
        return Err(DeletionBlocked::ReservedSection.into());
    }

    let target = SectionRef::Named(section_key.to_string());
    let members: Vec<&PageEntry> = pages
        .into_iter()
        .filter(|p| p.section_key == target)
        .collect();

    let plan = SectionDeletion {
        section_key: section_key.to_string(),
        page_keys: members.iter().map(|p| p.key.clone()).collect(),
    };
    if cascade {
        return Ok(plan);
    }

    let visible_pages: Vec<String> = members
        .iter()
        .filter(|p| p.visible)
        .map(|p| p.key.clone())
        .collect();
    if !visible_pages.is_empty() {
        return Err(NavError::DeletionBlocked(
            DeletionBlocked::SectionHasVisiblePages {
                section_key: section_key.to_string(),
                visible_pages,
            },
        ));
    }

    Ok(plan)
}
