//! The persistence boundary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::defaults::Baseline;
use crate::error::Result;
use crate::types::{PageEntry, PagePlacement, Section, SectionPlacement};

/// Ordered-record store for sections and pages.
///
/// Every call is one atomic unit: a failed call leaves the store as it was.
/// Implemented by `PgConfigStore` (postgres) and `MemoryConfigStore` (tests,
/// local development). Deletes re-check the deletion guard themselves, so a
/// caller that skipped the check still gets `DeletionBlocked`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn list_sections(&self) -> Result<Vec<Section>>;

    /// Create if the key is absent, else update the mutable fields. The
    /// stored record is returned.
    async fn upsert_section(&self, section: Section) -> Result<Section>;

    /// Delete a section and its pages. Without `cascade`, refused while any
    /// of its pages is visible.
    async fn delete_section(&self, key: &str, cascade: bool) -> Result<()>;

    async fn list_pages(&self) -> Result<Vec<PageEntry>>;

    async fn upsert_page(&self, page: PageEntry) -> Result<PageEntry>;

    /// Apply a page batch as one unit.
    async fn reorder_pages(&self, updates: &[PagePlacement]) -> Result<()>;

    /// Apply a section batch as one unit.
    async fn reorder_sections(&self, updates: &[SectionPlacement]) -> Result<()>;

    /// Refused while the page is visible.
    async fn delete_page(&self, key: &str) -> Result<()>;

    /// Replace everything with `baseline`, bypassing the deletion guard.
    async fn reset_to_defaults(&self, baseline: &Baseline) -> Result<(Vec<Section>, Vec<PageEntry>)>;
}

// ---------------------------------------------------------------------------
// Arc<S> blanket: lets tests keep a handle on the store for assertions
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: ConfigStore + ?Sized> ConfigStore for Arc<S> {
    async fn list_sections(&self) -> Result<Vec<Section>> {
        (**self).list_sections().await
    }

    async fn upsert_section(&self, section: Section) -> Result<Section> {
        (**self).upsert_section(section).await
    }

    async fn delete_section(&self, key: &str, cascade: bool) -> Result<()> {
        (**self).delete_section(key, cascade).await
    }

    async fn list_pages(&self) -> Result<Vec<PageEntry>> {
        (**self).list_pages().await
    }

    async fn upsert_page(&self, page: PageEntry) -> Result<PageEntry> {
        (**self).upsert_page(page).await
    }

    async fn reorder_pages(&self, updates: &[PagePlacement]) -> Result<()> {
        (**self).reorder_pages(updates).await
    }

    async fn reorder_sections(&self, updates: &[SectionPlacement]) -> Result<()> {
        (**self).reorder_sections(updates).await
    }

    async fn delete_page(&self, key: &str) -> Result<()> {
        (**self).delete_page(key).await
    }

    async fn reset_to_defaults(&self, baseline: &Baseline) -> Result<(Vec<Section>, Vec<PageEntry>)> {
        (**self).reset_to_defaults(baseline).await
    }
}
