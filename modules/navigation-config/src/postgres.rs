//! PgConfigStore: the production ConfigStore, backed by Postgres.
//!
//! Every mutating call runs in a single transaction. Deletes lock the rows
//! they inspect (`FOR UPDATE`) and re-run the deletion guard before deleting,
//! so a concurrent "show page" can't land between the check and the delete.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::defaults::Baseline;
use crate::error::{NavError, Result};
use crate::guard::{vet_page_delete, vet_section_delete};
use crate::store::ConfigStore;
use crate::types::{PageEntry, PagePlacement, Section, SectionPlacement, SectionRef};
use crate::validate::{validate_page, validate_section};

const SECTION_COLUMNS: &str = "key, display_name, icon_name, sort_order, collapsed_by_default";
const PAGE_COLUMNS: &str = "key, title, description, icon_name, route, permission, section_key, \
     sort_order, visible, primary_action_label, ai_action_label";

#[derive(Debug, sqlx::FromRow)]
struct SectionRow {
    key: String,
    display_name: String,
    icon_name: String,
    sort_order: i32,
    collapsed_by_default: bool,
}

impl From<SectionRow> for Section {
    fn from(row: SectionRow) -> Self {
        Section {
            key: row.key,
            display_name: row.display_name,
            icon_name: row.icon_name,
            sort_order: row.sort_order,
            collapsed_by_default: row.collapsed_by_default,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PageRow {
    key: String,
    title: String,
    description: Option<String>,
    icon_name: String,
    route: String,
    permission: String,
    section_key: Option<String>,
    sort_order: i32,
    visible: bool,
    primary_action_label: Option<String>,
    ai_action_label: Option<String>,
}

impl From<PageRow> for PageEntry {
    fn from(row: PageRow) -> Self {
        PageEntry {
            key: row.key,
            title: row.title,
            description: row.description,
            icon_name: row.icon_name,
            route: row.route,
            permission: row.permission,
            section_key: SectionRef::from(row.section_key),
            sort_order: row.sort_order,
            visible: row.visible,
            primary_action_label: row.primary_action_label,
            ai_action_label: row.ai_action_label,
        }
    }
}

#[derive(Clone)]
pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

async fn lock_section(tx: &mut Transaction<'_, Postgres>, key: &str) -> Result<bool> {
    let row = sqlx::query_scalar::<_, String>(
        "SELECT key FROM navigation_sections WHERE key = $1 FOR UPDATE",
    )
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.is_some())
}

async fn ensure_section(tx: &mut Transaction<'_, Postgres>, section: &SectionRef) -> Result<()> {
    if let SectionRef::Named(key) = section {
        let found = sqlx::query_scalar::<_, String>(
            "SELECT key FROM navigation_sections WHERE key = $1 FOR SHARE",
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
        if found.is_none() {
            return Err(NavError::section_not_found(key));
        }
    }
    Ok(())
}

async fn insert_section(tx: &mut Transaction<'_, Postgres>, section: &Section) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO navigation_sections (key, display_name, icon_name, sort_order, collapsed_by_default)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&section.key)
    .bind(&section.display_name)
    .bind(&section.icon_name)
    .bind(section.sort_order)
    .bind(section.collapsed_by_default)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_page(tx: &mut Transaction<'_, Postgres>, page: &PageEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO navigation_pages
            (key, title, description, icon_name, route, permission, section_key,
             sort_order, visible, primary_action_label, ai_action_label)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&page.key)
    .bind(&page.title)
    .bind(&page.description)
    .bind(&page.icon_name)
    .bind(&page.route)
    .bind(&page.permission)
    .bind(page.section_key.key())
    .bind(page.sort_order)
    .bind(page.visible)
    .bind(&page.primary_action_label)
    .bind(&page.ai_action_label)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn list_sections(&self) -> Result<Vec<Section>> {
        let rows = sqlx::query_as::<_, SectionRow>(&format!(
            "SELECT {SECTION_COLUMNS} FROM navigation_sections ORDER BY sort_order ASC, key ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Section::from).collect())
    }

    async fn upsert_section(&self, section: Section) -> Result<Section> {
        validate_section(&section)?;

        let row = sqlx::query_as::<_, SectionRow>(&format!(
            r#"
            INSERT INTO navigation_sections (key, display_name, icon_name, sort_order, collapsed_by_default)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                icon_name = EXCLUDED.icon_name,
                sort_order = EXCLUDED.sort_order,
                collapsed_by_default = EXCLUDED.collapsed_by_default,
                updated_at = now()
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(&section.key)
        .bind(&section.display_name)
        .bind(&section.icon_name)
        .bind(section.sort_order)
        .bind(section.collapsed_by_default)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete_section(&self, key: &str, cascade: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !lock_section(&mut tx, key).await? {
            // Still run the guard so the reserved key reports DeletionBlocked.
            vet_section_delete(key, std::iter::empty(), cascade)?;
            return Err(NavError::section_not_found(key));
        }

        let members: Vec<PageEntry> = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM navigation_pages WHERE section_key = $1 FOR UPDATE"
        ))
        .bind(key)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(PageEntry::from)
        .collect();

        let plan = vet_section_delete(key, &members, cascade)?;

        sqlx::query("DELETE FROM navigation_pages WHERE key = ANY($1)")
            .bind(&plan.page_keys)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM navigation_sections WHERE key = $1")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageEntry>> {
        let rows = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM navigation_pages \
             ORDER BY section_key ASC NULLS LAST, sort_order ASC, key ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PageEntry::from).collect())
    }

    async fn upsert_page(&self, page: PageEntry) -> Result<PageEntry> {
        validate_page(&page)?;
        let mut tx = self.pool.begin().await?;
        ensure_section(&mut tx, &page.section_key).await?;

        let row = sqlx::query_as::<_, PageRow>(&format!(
            r#"
            INSERT INTO navigation_pages
                (key, title, description, icon_name, route, permission, section_key,
                 sort_order, visible, primary_action_label, ai_action_label)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (key) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                icon_name = EXCLUDED.icon_name,
                route = EXCLUDED.route,
                permission = EXCLUDED.permission,
                section_key = EXCLUDED.section_key,
                sort_order = EXCLUDED.sort_order,
                visible = EXCLUDED.visible,
                primary_action_label = EXCLUDED.primary_action_label,
                ai_action_label = EXCLUDED.ai_action_label,
                updated_at = now()
            RETURNING {PAGE_COLUMNS}
            "#
        ))
        .bind(&page.key)
        .bind(&page.title)
        .bind(&page.description)
        .bind(&page.icon_name)
        .bind(&page.route)
        .bind(&page.permission)
        .bind(page.section_key.key())
        .bind(page.sort_order)
        .bind(page.visible)
        .bind(&page.primary_action_label)
        .bind(&page.ai_action_label)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn reorder_pages(&self, updates: &[PagePlacement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for update in updates {
            ensure_section(&mut tx, &update.section_key).await?;
            let result = sqlx::query(
                r#"
                UPDATE navigation_pages
                SET sort_order = $2, section_key = $3, updated_at = now()
                WHERE key = $1
                "#,
            )
            .bind(&update.key)
            .bind(update.sort_order)
            .bind(update.section_key.key())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back the rows already moved.
                return Err(NavError::page_not_found(&update.key));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reorder_sections(&self, updates: &[SectionPlacement]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for update in updates {
            let result = sqlx::query(
                "UPDATE navigation_sections SET sort_order = $2, updated_at = now() WHERE key = $1",
            )
            .bind(&update.key)
            .bind(update.sort_order)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(NavError::section_not_found(&update.key));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_page(&self, key: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let page: PageEntry = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM navigation_pages WHERE key = $1 FOR UPDATE"
        ))
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?
        .map(PageEntry::from)
        .ok_or_else(|| NavError::page_not_found(key))?;

        vet_page_delete(&page)?;

        sqlx::query("DELETE FROM navigation_pages WHERE key = $1")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn reset_to_defaults(&self, baseline: &Baseline) -> Result<(Vec<Section>, Vec<PageEntry>)> {
        baseline.validate()?;
        let mut tx = self.pool.begin().await?;

        let pages_removed = sqlx::query("DELETE FROM navigation_pages")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let sections_removed = sqlx::query("DELETE FROM navigation_sections")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for section in &baseline.sections {
            insert_section(&mut tx, section).await?;
        }
        for page in &baseline.pages {
            insert_page(&mut tx, page).await?;
        }

        tx.commit().await?;
        info!(
            sections_removed,
            pages_removed, "Replaced navigation tables with baseline"
        );

        Ok((self.list_sections().await?, self.list_pages().await?))
    }
}
