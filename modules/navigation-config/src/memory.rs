//! In-memory ConfigStore for tests and local development.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::defaults::Baseline;
use crate::error::{NavError, Result};
use crate::guard::{vet_page_delete, vet_section_delete};
use crate::reorder::{apply_page_batch, apply_section_batch};
use crate::store::ConfigStore;
use crate::types::{PageEntry, PagePlacement, Section, SectionPlacement, SectionRef};
use crate::validate::{ensure_route_unique, validate_page, validate_section};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    sections: Vec<Section>,
    pages: Vec<PageEntry>,
}

impl MemoryState {
    fn section_exists(&self, section: &SectionRef) -> bool {
        match section {
            SectionRef::Named(key) => self.sections.iter().any(|s| &s.key == key),
            SectionRef::Ungrouped => true,
        }
    }
}

/// Holds both record sets behind one lock, so every call is atomic with
/// respect to every other. Thread-safe.
#[derive(Default)]
pub struct MemoryConfigStore {
    state: Mutex<MemoryState>,
    fail_next_write: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `baseline`.
    pub fn with_baseline(baseline: &Baseline) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                sections: baseline.sections.clone(),
                pages: baseline.pages.clone(),
            }),
            fail_next_write: AtomicBool::new(false),
        }
    }

    /// Make the next mutating call fail with a persistence error without
    /// touching any record.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(NavError::persistence("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn list_sections(&self) -> Result<Vec<Section>> {
        Ok(self.state.lock().await.sections.clone())
    }

    async fn upsert_section(&self, section: Section) -> Result<Section> {
        validate_section(&section)?;
        let mut state = self.state.lock().await;
        self.check_write()?;

        match state.sections.iter_mut().find(|s| s.key == section.key) {
            Some(existing) => {
                existing.display_name = section.display_name;
                existing.icon_name = section.icon_name;
                existing.collapsed_by_default = section.collapsed_by_default;
                existing.sort_order = section.sort_order;
                Ok(existing.clone())
            }
            None => {
                state.sections.push(section.clone());
                Ok(section)
            }
        }
    }

    async fn delete_section(&self, key: &str, cascade: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        let plan = vet_section_delete(key, &state.pages, cascade)?;
        if !state.sections.iter().any(|s| s.key == key) {
            return Err(NavError::section_not_found(key));
        }
        self.check_write()?;

        state.pages.retain(|p| !plan.page_keys.contains(&p.key));
        state.sections.retain(|s| s.key != key);
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageEntry>> {
        Ok(self.state.lock().await.pages.clone())
    }

    async fn upsert_page(&self, page: PageEntry) -> Result<PageEntry> {
        validate_page(&page)?;
        let mut state = self.state.lock().await;
        if !state.section_exists(&page.section_key) {
            return Err(NavError::section_not_found(page.section_key.to_string()));
        }
        ensure_route_unique(&page.route, &page.key, &state.pages)?;
        self.check_write()?;

        match state.pages.iter_mut().find(|p| p.key == page.key) {
            Some(existing) => {
                *existing = page.clone();
                Ok(page)
            }
            None => {
                state.pages.push(page.clone());
                Ok(page)
            }
        }
    }

    async fn reorder_pages(&self, updates: &[PagePlacement]) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(missing) = updates
            .iter()
            .find(|u| !state.section_exists(&u.section_key))
        {
            return Err(NavError::section_not_found(missing.section_key.to_string()));
        }
        self.check_write()?;
        apply_page_batch(&mut state.pages, updates)
    }

    async fn reorder_sections(&self, updates: &[SectionPlacement]) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_write()?;
        apply_section_batch(&mut state.sections, updates)
    }

    async fn delete_page(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let page = state
            .pages
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| NavError::page_not_found(key))?;
        vet_page_delete(page)?;
        self.check_write()?;

        state.pages.retain(|p| p.key != key);
        Ok(())
    }

    async fn reset_to_defaults(&self, baseline: &Baseline) -> Result<(Vec<Section>, Vec<PageEntry>)> {
        baseline.validate()?;
        let mut state = self.state.lock().await;
        self.check_write()?;

        state.sections = baseline.sections.clone();
        state.pages = baseline.pages.clone();
        Ok((state.sections.clone(), state.pages.clone()))
    }
}
