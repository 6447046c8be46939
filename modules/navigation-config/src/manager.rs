//! NavigationManager: the single entry point the settings screen talks to.
//!
//! Each operation validates against a fresh snapshot, turns the request into
//! exactly one store call, and invalidates the registry cache afterwards,
//! whether the call succeeded or not. A failed call therefore never leaves a
//! half-applied view behind: the next read refetches from the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::defaults::DefaultsResetter;
use crate::draft::{PageDraft, PageEdit, ResetConfirmation, SectionDraft, SectionEdit};
use crate::error::{NavError, Result};
use crate::guard::{vet_page_delete, vet_section_delete};
use crate::registry::{RegistryCache, Snapshot};
use crate::render::{navigation_view, NavGroup, PermissionChecker};
use crate::reorder::{plan_page_move, plan_section_move};
use crate::store::ConfigStore;
use crate::types::{MoveIntent, PageEntry, Section, SectionRef};
use crate::validate::{ensure_route_unique, validate_key, validate_page, validate_section};

pub struct NavigationManager {
    store: Arc<dyn ConfigStore>,
    cache: RegistryCache,
    resetter: DefaultsResetter,
}

impl NavigationManager {
    pub fn new(store: Arc<dyn ConfigStore>, resetter: DefaultsResetter) -> Self {
        Self {
            store,
            cache: RegistryCache::new(),
            resetter,
        }
    }

    /// Manager over `store` with the baseline bundled in this build.
    pub fn with_shipped_defaults(store: Arc<dyn ConfigStore>) -> Result<Self> {
        Ok(Self::new(store, DefaultsResetter::shipped()?))
    }

    pub fn resetter(&self) -> &DefaultsResetter {
        &self.resetter
    }

    // --- Reads ---

    /// Cached view of the whole hierarchy; rebuilt after any mutation.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.cache.load(self.store.as_ref()).await
    }

    /// Drop the cache and re-read the store.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        self.cache.invalidate();
        self.cache.reload(self.store.as_ref()).await
    }

    pub async fn list_sections(&self) -> Result<Vec<Section>> {
        Ok(self.snapshot().await?.sections.list().to_vec())
    }

    pub async fn list_pages(&self) -> Result<Vec<PageEntry>> {
        Ok(self.snapshot().await?.pages.list().to_vec())
    }

    pub async fn group_pages_by_section(&self) -> Result<BTreeMap<SectionRef, Vec<PageEntry>>> {
        Ok(self.snapshot().await?.group_pages_by_section())
    }

    /// The sidebar as a given caller should see it.
    pub async fn navigation_for(&self, checker: &dyn PermissionChecker) -> Result<Vec<NavGroup>> {
        Ok(navigation_view(&*self.snapshot().await?, checker))
    }

    /// True when neither sections nor pages exist.
    pub async fn is_empty(&self) -> Result<bool> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.sections.is_empty() && snapshot.pages.is_empty())
    }

    // --- Sections ---

    pub async fn create_section(&self, draft: SectionDraft) -> Result<Section> {
        let snapshot = self.snapshot().await?;
        validate_key(&draft.key)?;
        if snapshot.sections.contains(&draft.key) {
            return Err(NavError::validation(format!(
                "section '{}' already exists",
                draft.key
            )));
        }

        let sort_order = match draft.sort_order {
            Some(order) => {
                if snapshot.sections.list().iter().any(|s| s.sort_order == order) {
                    return Err(NavError::validation(format!(
                        "sortOrder {order} is already taken by another section"
                    )));
                }
                order
            }
            None => snapshot.sections.next_sort_order()?,
        };
        let section = draft.into_section(sort_order);
        validate_section(&section)?;

        let saved = self.commit(self.store.upsert_section(section)).await?;
        info!(section = %saved.key, sort_order = saved.sort_order, "Section created");
        Ok(saved)
    }

    pub async fn update_section(&self, key: &str, edit: SectionEdit) -> Result<Section> {
        let snapshot = self.snapshot().await?;
        let mut section = snapshot
            .sections
            .get(key)
            .cloned()
            .ok_or_else(|| NavError::section_not_found(key))?;
        edit.apply(&mut section);
        validate_section(&section)?;

        let saved = self.commit(self.store.upsert_section(section)).await?;
        info!(section = %saved.key, "Section updated");
        Ok(saved)
    }

    pub async fn set_section_collapsed(&self, key: &str, collapsed: bool) -> Result<Section> {
        self.update_section(
            key,
            SectionEdit {
                collapsed_by_default: Some(collapsed),
                ..SectionEdit::default()
            },
        )
        .await
    }

    /// Move a section to `target_index` in the flat section list.
    pub async fn move_section(&self, key: &str, target_index: usize) -> Result<()> {
        let snapshot = self.snapshot().await?;
        let batch = plan_section_move(&snapshot.sections, key, target_index)?;
        if batch.is_empty() {
            return Ok(());
        }

        self.commit(self.store.reorder_sections(&batch)).await?;
        info!(section = %key, target_index, updated = batch.len(), "Section moved");
        Ok(())
    }

    /// Delete a section and its pages. Without `cascade` every page in the
    /// section must be hidden first.
    pub async fn delete_section(&self, key: &str, cascade: bool) -> Result<()> {
        let snapshot = self.snapshot().await?;
        let plan = vet_section_delete(key, snapshot.pages.list(), cascade).inspect_err(|e| {
            warn!(section = %key, cascade, error = %e, "Section delete refused");
        })?;
        if !snapshot.sections.contains(key) {
            return Err(NavError::section_not_found(key));
        }

        self.commit(self.store.delete_section(key, cascade)).await?;
        info!(
            section = %key,
            cascade,
            pages_removed = plan.page_keys.len(),
            "Section deleted"
        );
        Ok(())
    }

    // --- Pages ---

    pub async fn create_page(&self, draft: PageDraft) -> Result<PageEntry> {
        let snapshot = self.snapshot().await?;
        validate_key(&draft.key)?;
        if snapshot.pages.get(&draft.key).is_some() {
            return Err(NavError::validation(format!(
                "page '{}' already exists",
                draft.key
            )));
        }
        if let SectionRef::Named(section) = &draft.section_key {
            if !snapshot.sections.contains(section) {
                return Err(NavError::section_not_found(section));
            }
        }

        let sort_order = match draft.sort_order {
            Some(order) => {
                let container = snapshot.pages.container(&draft.section_key);
                if container.iter().any(|p| p.sort_order == order) {
                    return Err(NavError::validation(format!(
                        "sortOrder {order} is already taken in section '{}'",
                        draft.section_key
                    )));
                }
                order
            }
            None => snapshot.pages.next_sort_order(&draft.section_key)?,
        };
        let page = draft.into_page(sort_order);
        validate_page(&page)?;
        ensure_route_unique(&page.route, &page.key, snapshot.pages.list())?;

        let saved = self.commit(self.store.upsert_page(page)).await?;
        info!(
            page = %saved.key,
            section = %saved.section_key,
            sort_order = saved.sort_order,
            "Page created"
        );
        Ok(saved)
    }

    pub async fn update_page(&self, key: &str, edit: PageEdit) -> Result<PageEntry> {
        let snapshot = self.snapshot().await?;
        let mut page = snapshot
            .pages
            .get(key)
            .cloned()
            .ok_or_else(|| NavError::page_not_found(key))?;
        edit.apply(&mut page);
        validate_page(&page)?;
        ensure_route_unique(&page.route, &page.key, snapshot.pages.list())?;

        let saved = self.commit(self.store.upsert_page(page)).await?;
        info!(page = %saved.key, "Page updated");
        Ok(saved)
    }

    /// Show or hide a page. Hiding is the required first step before delete.
    pub async fn set_page_visibility(&self, key: &str, visible: bool) -> Result<PageEntry> {
        let snapshot = self.snapshot().await?;
        let mut page = snapshot
            .pages
            .get(key)
            .cloned()
            .ok_or_else(|| NavError::page_not_found(key))?;
        if page.visible == visible {
            return Ok(page);
        }
        page.visible = visible;

        let saved = self.commit(self.store.upsert_page(page)).await?;
        info!(page = %saved.key, visible, "Page visibility changed");
        Ok(saved)
    }

    /// Apply one drag-and-drop of a page.
    pub async fn move_page(&self, intent: MoveIntent) -> Result<()> {
        let snapshot = self.snapshot().await?;
        let batch = plan_page_move(&snapshot.sections, &snapshot.pages, &intent)?;
        if batch.is_empty() {
            return Ok(());
        }

        self.commit(self.store.reorder_pages(&batch)).await?;
        info!(
            page = %intent.moved_key,
            from = %intent.source_container,
            to = %intent.target_container,
            target_index = intent.target_index,
            updated = batch.len(),
            "Page moved"
        );
        Ok(())
    }

    pub async fn delete_page(&self, key: &str) -> Result<()> {
        let snapshot = self.snapshot().await?;
        let page = snapshot
            .pages
            .get(key)
            .ok_or_else(|| NavError::page_not_found(key))?;
        vet_page_delete(page).inspect_err(|e| {
            warn!(page = %key, error = %e, "Page delete refused");
        })?;

        self.commit(self.store.delete_page(key)).await?;
        info!(page = %key, "Page deleted");
        Ok(())
    }

    // --- Reset ---

    /// Throw away every customization and restore the shipped baseline.
    pub async fn reset_to_defaults(&self, confirmed: ResetConfirmation) -> Result<Arc<Snapshot>> {
        self.commit(self.resetter.reset(self.store.as_ref(), confirmed))
            .await?;
        self.snapshot().await
    }

    /// Apply the baseline when the store holds no sections and no pages.
    /// Returns whether anything was written.
    pub async fn seed_if_empty(&self) -> Result<bool> {
        self.cache.invalidate();
        if !self.is_empty().await? {
            return Ok(false);
        }
        self.commit(
            self.resetter
                .reset(self.store.as_ref(), ResetConfirmation::for_empty_store()),
        )
        .await?;
        info!("Empty navigation store seeded with baseline");
        Ok(true)
    }

    /// Await a store mutation, then invalidate the cache either way.
    async fn commit<T>(&self, call: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        let result = call.await;
        self.cache.invalidate();
        if let Err(e) = &result {
            if e.is_retryable() {
                warn!(error = %e, "Navigation store write failed; cached view discarded");
            }
        }
        result
    }
}
