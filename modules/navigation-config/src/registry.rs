//! Materialized views over the store, plus the cache that holds them.
//!
//! Registries are pure projections: built from whatever the store returned,
//! never mutated in place. After a mutation the cache is invalidated and the
//! next read rebuilds a fresh snapshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{NavError, Result};
use crate::store::ConfigStore;
use crate::types::{PageEntry, Section, SectionRef};

fn next_after(orders: impl Iterator<Item = i32>) -> Result<i32> {
    match orders.max() {
        None => Ok(0),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| NavError::validation("sort order out of range; renumber the container")),
    }
}

// ---------------------------------------------------------------------------
// SectionRegistry
// ---------------------------------------------------------------------------

/// All sections in display order (ascending `sort_order`, ties by key).
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: Vec<Section>,
    by_key: HashMap<String, usize>,
}

impl SectionRegistry {
    pub fn new(mut sections: Vec<Section>) -> Self {
        sections.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.key.cmp(&b.key)));
        let by_key = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key.clone(), i))
            .collect();
        Self { sections, by_key }
    }

    pub fn list(&self) -> &[Section] {
        &self.sections
    }

    pub fn get(&self, key: &str) -> Option<&Section> {
        self.by_key.get(key).map(|&i| &self.sections[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Whether a page may point at this section. Ungrouped always exists.
    pub fn resolves(&self, section: &SectionRef) -> bool {
        match section {
            SectionRef::Named(key) => self.contains(key),
            SectionRef::Ungrouped => true,
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The `sort_order` a newly appended section should take.
    /// One past the current maximum, or 0 when empty.
    pub fn next_sort_order(&self) -> Result<i32> {
        next_after(self.sections.iter().map(|s| s.sort_order))
    }
}

// ---------------------------------------------------------------------------
// PageRegistry
// ---------------------------------------------------------------------------

/// All pages, grouped by section, each group in display order.
#[derive(Debug, Clone, Default)]
pub struct PageRegistry {
    pages: Vec<PageEntry>,
    by_key: HashMap<String, usize>,
    groups: BTreeMap<SectionRef, Vec<usize>>,
}

impl PageRegistry {
    pub fn new(mut pages: Vec<PageEntry>) -> Self {
        pages.sort_by(|a, b| {
            a.section_key
                .cmp(&b.section_key)
                .then_with(|| a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.key.cmp(&b.key))
        });

        let by_key = pages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.key.clone(), i))
            .collect();

        let mut groups: BTreeMap<SectionRef, Vec<usize>> = BTreeMap::new();
        for (i, page) in pages.iter().enumerate() {
            groups.entry(page.section_key.clone()).or_default().push(i);
        }

        Self {
            pages,
            by_key,
            groups,
        }
    }

    pub fn list(&self) -> &[PageEntry] {
        &self.pages
    }

    pub fn get(&self, key: &str) -> Option<&PageEntry> {
        self.by_key.get(key).map(|&i| &self.pages[i])
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages of one container in display order.
    pub fn container(&self, section: &SectionRef) -> Vec<&PageEntry> {
        self.groups
            .get(section)
            .map(|idx| idx.iter().map(|&i| &self.pages[i]).collect())
            .unwrap_or_default()
    }

    /// The `sort_order` a page appended to `section` should take.
    pub fn next_sort_order(&self, section: &SectionRef) -> Result<i32> {
        next_after(self.container(section).iter().map(|p| p.sort_order))
    }

    /// Section → ordered pages. Always contains the ungrouped bucket and
    /// every section in `sections`, even when empty.
    pub fn group_pages_by_section(
        &self,
        sections: &SectionRegistry,
    ) -> BTreeMap<SectionRef, Vec<PageEntry>> {
        let mut grouped: BTreeMap<SectionRef, Vec<PageEntry>> = sections
            .list()
            .iter()
            .map(|s| (SectionRef::Named(s.key.clone()), Vec::new()))
            .collect();
        grouped.insert(SectionRef::Ungrouped, Vec::new());

        for (section, idx) in &self.groups {
            grouped
                .entry(section.clone())
                .or_default()
                .extend(idx.iter().map(|&i| self.pages[i].clone()));
        }
        grouped
    }
}

// ---------------------------------------------------------------------------
// Snapshot + cache
// ---------------------------------------------------------------------------

/// One consistent read of the whole hierarchy.
#[derive(Debug)]
pub struct Snapshot {
    pub sections: SectionRegistry,
    pub pages: PageRegistry,
    /// Cache generation this snapshot was loaded under.
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(sections: Vec<Section>, pages: Vec<PageEntry>, version: u64) -> Self {
        Self {
            sections: SectionRegistry::new(sections),
            pages: PageRegistry::new(pages),
            version,
            loaded_at: Utc::now(),
        }
    }

    pub fn group_pages_by_section(&self) -> BTreeMap<SectionRef, Vec<PageEntry>> {
        self.pages.group_pages_by_section(&self.sections)
    }

    /// Groups in sidebar order: sections by `sort_order`, ungrouped last.
    pub fn groups_in_display_order(&self) -> Vec<(SectionRef, Vec<&PageEntry>)> {
        let mut groups: Vec<(SectionRef, Vec<&PageEntry>)> = self
            .sections
            .list()
            .iter()
            .map(|s| {
                let section = SectionRef::Named(s.key.clone());
                let pages = self.pages.container(&section);
                (section, pages)
            })
            .collect();
        groups.push((
            SectionRef::Ungrouped,
            self.pages.container(&SectionRef::Ungrouped),
        ));
        groups
    }
}

/// Derived cache over the store. Invalidated after every mutation.
pub struct RegistryCache {
    inner: ArcSwapOption<Snapshot>,
    version: AtomicU64,
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryCache {
    pub fn new() -> Self {
        Self {
            inner: ArcSwapOption::empty(),
            version: AtomicU64::new(0),
        }
    }

    /// Drop the cached snapshot. The next `load` refetches from the store.
    pub fn invalidate(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        self.inner.store(None);
    }

    /// Current cache generation. Bumps on every invalidation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn is_cached(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Return the cached snapshot, or rebuild it from the store.
    ///
    /// A snapshot cached under an older generation is never served: an
    /// invalidation can land between `reload`'s generation check and its store.
    pub async fn load(&self, store: &dyn ConfigStore) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.inner.load_full() {
            if snapshot.version == self.version() {
                return Ok(snapshot);
            }
        }
        self.reload(store).await
    }

    /// Rebuild unconditionally.
    pub async fn reload(&self, store: &dyn ConfigStore) -> Result<Arc<Snapshot>> {
        let version = self.version();
        let sections = store.list_sections().await?;
        let pages = store.list_pages().await?;

        let snapshot = Arc::new(Snapshot::new(sections, pages, version));
        debug!(
            version,
            sections = snapshot.sections.len(),
            pages = snapshot.pages.len(),
            "Navigation registries rebuilt"
        );

        // An invalidation raced the reload: hand back the fresh read but don't
        // cache it under a stale generation.
        if self.version() == version {
            self.inner.store(Some(Arc::clone(&snapshot)));
        }
        Ok(snapshot)
    }
}
