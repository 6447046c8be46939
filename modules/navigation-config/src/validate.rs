//! Field rules shared by admin input, the shipped baseline and the stores.

use crate::error::{NavError, Result};
use crate::types::{PageEntry, Section, UNGROUPED_KEY};

const MAX_KEY_LEN: usize = 64;

pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(NavError::validation("key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(NavError::validation(format!(
            "key '{key}' is longer than {MAX_KEY_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_';
    if !key.chars().all(allowed) {
        return Err(NavError::validation(format!(
            "key '{key}' may only contain lowercase letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NavError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub fn validate_section(section: &Section) -> Result<()> {
    validate_key(&section.key)?;
    if section.key == UNGROUPED_KEY {
        return Err(NavError::validation(format!(
            "'{UNGROUPED_KEY}' is a reserved section key"
        )));
    }
    require_text("displayName", &section.display_name)?;
    require_text("iconName", &section.icon_name)?;
    Ok(())
}

pub fn validate_route(route: &str) -> Result<()> {
    require_text("route", route)?;
    if !route.starts_with('/') {
        return Err(NavError::validation(format!(
            "route '{route}' must start with '/'"
        )));
    }
    Ok(())
}

pub fn validate_page(page: &PageEntry) -> Result<()> {
    validate_key(&page.key)?;
    require_text("title", &page.title)?;
    require_text("iconName", &page.icon_name)?;
    validate_route(&page.route)?;
    require_text("permission", &page.permission)?;
    Ok(())
}

/// A route may be reused only by the page that already owns it.
pub fn ensure_route_unique<'a>(
    route: &str,
    own_key: &str,
    pages: impl IntoIterator<Item = &'a PageEntry>,
) -> Result<()> {
    match pages
        .into_iter()
        .find(|p| p.route == route && p.key != own_key)
    {
        Some(owner) => Err(NavError::validation(format!(
            "route '{route}' is already used by page '{}'",
            owner.key
        ))),
        None => Ok(()),
    }
}
