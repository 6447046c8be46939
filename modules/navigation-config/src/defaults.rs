//! The shipped baseline and the reset that restores it.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::draft::ResetConfirmation;
use crate::error::{NavError, Result};
use crate::store::ConfigStore;
use crate::types::{PageEntry, Section, SectionRef};
use crate::validate::{validate_page, validate_section};

const SHIPPED_BASELINE: &str = include_str!("baseline.toml");

/// A complete hierarchy: every section and every page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

impl Baseline {
    /// The baseline bundled with this build.
    pub fn shipped() -> Result<Self> {
        Self::from_toml(SHIPPED_BASELINE)
    }

    /// Parse and validate a baseline document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let baseline: Baseline = toml::from_str(content)
            .map_err(|e| NavError::validation(format!("invalid baseline: {e}")))?;
        baseline.validate()?;
        Ok(baseline)
    }

    /// Apply the same rules as admin input, plus the hierarchy rules.
    pub fn validate(&self) -> Result<()> {
        let mut section_keys = HashSet::new();
        let mut section_orders = HashSet::new();
        for section in &self.sections {
            validate_section(section)?;
            if !section_keys.insert(section.key.as_str()) {
                return Err(NavError::validation(format!(
                    "baseline section '{}' is defined twice",
                    section.key
                )));
            }
            if !section_orders.insert(section.sort_order) {
                return Err(NavError::validation(format!(
                    "baseline section '{}' reuses sortOrder {}",
                    section.key, section.sort_order
                )));
            }
        }

        let mut page_keys = HashSet::new();
        let mut routes = HashSet::new();
        let mut page_orders = HashSet::new();
        for page in &self.pages {
            validate_page(page)?;
            if !page_keys.insert(page.key.as_str()) {
                return Err(NavError::validation(format!(
                    "baseline page '{}' is defined twice",
                    page.key
                )));
            }
            if !routes.insert(page.route.as_str()) {
                return Err(NavError::validation(format!(
                    "baseline route '{}' is used twice",
                    page.route
                )));
            }
            if let SectionRef::Named(key) = &page.section_key {
                if !section_keys.contains(key.as_str()) {
                    return Err(NavError::validation(format!(
                        "baseline page '{}' points at unknown section '{key}'",
                        page.key
                    )));
                }
            }
            if !page_orders.insert((&page.section_key, page.sort_order)) {
                return Err(NavError::validation(format!(
                    "baseline page '{}' reuses sortOrder {} in '{}'",
                    page.key, page.sort_order, page.section_key
                )));
            }
        }
        Ok(())
    }
}

/// Discards all customization and restores a baseline.
#[derive(Debug, Clone)]
pub struct DefaultsResetter {
    baseline: Arc<Baseline>,
}

impl DefaultsResetter {
    pub fn new(baseline: Baseline) -> Self {
        Self {
            baseline: Arc::new(baseline),
        }
    }

    pub fn shipped() -> Result<Self> {
        Ok(Self::new(Baseline::shipped()?))
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Replace the stored hierarchy with the baseline. Irreversible, hence
    /// the confirmation token.
    pub async fn reset(
        &self,
        store: &dyn ConfigStore,
        _confirmed: ResetConfirmation,
    ) -> Result<(Vec<Section>, Vec<PageEntry>)> {
        match store.reset_to_defaults(&self.baseline).await {
            Ok((sections, pages)) => {
                info!(
                    sections = sections.len(),
                    pages = pages.len(),
                    "Navigation reset to defaults"
                );
                Ok((sections, pages))
            }
            Err(e) => {
                warn!(error = %e, "Navigation reset failed");
                Err(e)
            }
        }
    }
}
