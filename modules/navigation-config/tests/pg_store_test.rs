//! Integration tests for PgConfigStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::sync::{Arc, OnceLock};

use navigation_config::{
    Baseline, ConfigStore, DeletionBlocked, MoveIntent, NavError, NavigationManager, PageEntry,
    PagePlacement, PgConfigStore, ResetConfirmation, Section, SectionDraft, SectionRef,
};
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

/// Tests share one database; run them one at a time.
fn db_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Get a migrated, empty store, or skip if no test DB is available.
async fn test_store() -> Option<(MutexGuard<'static, ()>, PgConfigStore)> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let guard = db_lock().lock().await;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgConfigStore::new(pool);
    store.migrate().await.ok()?;

    // Clean slate for each test
    sqlx::query("TRUNCATE navigation_pages, navigation_sections")
        .execute(store.pool())
        .await
        .ok()?;

    Some((guard, store))
}

fn section(key: &str, sort_order: i32) -> Section {
    Section {
        key: key.into(),
        display_name: key.to_uppercase(),
        icon_name: "folder".into(),
        sort_order,
        collapsed_by_default: false,
    }
}

fn page(key: &str, section: &str, sort_order: i32, visible: bool) -> PageEntry {
    PageEntry {
        key: key.into(),
        title: key.to_uppercase(),
        description: None,
        icon_name: "file".into(),
        route: format!("/{key}"),
        permission: format!("{key}.view"),
        section_key: SectionRef::named(section),
        sort_order,
        visible,
        primary_action_label: None,
        ai_action_label: None,
    }
}

// =========================================================================
// Basic behavior
// =========================================================================

#[tokio::test]
async fn upsert_and_list_round_trip() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    let mut loose = page("loose", "a", 0, true);
    loose.section_key = SectionRef::Ungrouped;
    loose.description = Some("No section".into());
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();
    store.upsert_page(loose.clone()).await.unwrap();

    let sections = store.list_sections().await.unwrap();
    assert_eq!(sections, vec![section("a", 0)]);

    let pages = store.list_pages().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.contains(&loose));

    // Second upsert updates in place.
    let mut renamed = section("a", 0);
    renamed.display_name = "Renamed".into();
    store.upsert_section(renamed.clone()).await.unwrap();
    assert_eq!(store.list_sections().await.unwrap(), vec![renamed]);
}

#[tokio::test]
async fn page_in_missing_section_is_not_found() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    let err = store
        .upsert_page(page("p1", "nowhere", 0, true))
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::NotFound { ref key, .. } if key == "nowhere"));
    assert!(store.list_pages().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_route_is_a_validation_error() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();
    let mut clash = page("p2", "a", 1, true);
    clash.route = "/p1".into();

    let err = store.upsert_page(clash).await.unwrap_err();
    assert!(matches!(err, NavError::Validation(_)));
}

// =========================================================================
// Batches
// =========================================================================

#[tokio::test]
async fn reorder_batch_is_all_or_nothing() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();
    store.upsert_page(page("p2", "a", 1, true)).await.unwrap();
    let before = store.list_pages().await.unwrap();

    let err = store
        .reorder_pages(&[
            PagePlacement {
                key: "p2".into(),
                sort_order: 0,
                section_key: SectionRef::named("a"),
            },
            PagePlacement {
                key: "ghost".into(),
                sort_order: 1,
                section_key: SectionRef::named("a"),
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, NavError::NotFound { .. }));
    assert_eq!(store.list_pages().await.unwrap(), before);
}

#[tokio::test]
async fn manager_moves_persist() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };
    let manager = NavigationManager::with_shipped_defaults(Arc::new(store)).unwrap();

    for key in ["a", "b", "c"] {
        manager
            .create_section(
                SectionDraft::builder()
                    .key(key)
                    .display_name(key.to_uppercase())
                    .icon_name("folder")
                    .build(),
            )
            .await
            .unwrap();
    }
    manager.move_section("c", 0).await.unwrap();

    let order: Vec<(String, i32)> = manager
        .refresh()
        .await
        .unwrap()
        .sections
        .list()
        .iter()
        .map(|s| (s.key.clone(), s.sort_order))
        .collect();
    assert_eq!(
        order,
        vec![("c".to_string(), 0), ("a".to_string(), 1), ("b".to_string(), 2)]
    );
}

#[tokio::test]
async fn cross_section_page_move_persists() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };
    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_section(section("b", 1)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();
    store.upsert_page(page("p2", "a", 1, true)).await.unwrap();
    store.upsert_page(page("p3", "b", 0, true)).await.unwrap();
    let store = Arc::new(store);
    let manager = NavigationManager::with_shipped_defaults(store.clone()).unwrap();

    manager
        .move_page(MoveIntent::new(
            "p2",
            SectionRef::named("a"),
            SectionRef::named("b"),
            0,
        ))
        .await
        .unwrap();

    let mut pages: Vec<(String, SectionRef, i32)> = store
        .list_pages()
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.key, p.section_key, p.sort_order))
        .collect();
    pages.sort();
    assert_eq!(
        pages,
        vec![
            ("p1".to_string(), SectionRef::named("a"), 0),
            ("p2".to_string(), SectionRef::named("b"), 0),
            ("p3".to_string(), SectionRef::named("b"), 1),
        ]
    );
}

// =========================================================================
// Deletion guard
// =========================================================================

#[tokio::test]
async fn store_rechecks_the_deletion_guard() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();

    let err = store.delete_page("p1").await.unwrap_err();
    assert!(matches!(
        err,
        NavError::DeletionBlocked(DeletionBlocked::PageVisible { .. })
    ));
    let err = store.delete_section("a", false).await.unwrap_err();
    assert!(matches!(
        err,
        NavError::DeletionBlocked(DeletionBlocked::SectionHasVisiblePages { .. })
    ));
    let err = store.delete_section("ungrouped", true).await.unwrap_err();
    assert!(matches!(
        err,
        NavError::DeletionBlocked(DeletionBlocked::ReservedSection)
    ));

    assert_eq!(store.list_pages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn hidden_pages_go_with_their_section() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_section(section("b", 1)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, false)).await.unwrap();
    store.upsert_page(page("p2", "b", 0, true)).await.unwrap();

    store.delete_section("a", false).await.unwrap();

    assert_eq!(store.list_sections().await.unwrap(), vec![section("b", 1)]);
    let keys: Vec<String> = store
        .list_pages()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.key)
        .collect();
    assert_eq!(keys, vec!["p2"]);
}

#[tokio::test]
async fn cascade_delete_removes_visible_pages() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };

    store.upsert_section(section("a", 0)).await.unwrap();
    store.upsert_page(page("p1", "a", 0, true)).await.unwrap();
    store.upsert_page(page("p2", "a", 1, false)).await.unwrap();

    store.delete_section("a", true).await.unwrap();

    assert!(store.list_sections().await.unwrap().is_empty());
    assert!(store.list_pages().await.unwrap().is_empty());
}

// =========================================================================
// Reset
// =========================================================================

#[tokio::test]
async fn reset_replaces_everything_with_the_baseline() {
    let Some((_guard, store)) = test_store().await else {
        return;
    };
    store.upsert_section(section("custom", 0)).await.unwrap();
    store.upsert_page(page("mine", "custom", 0, true)).await.unwrap();

    let manager = NavigationManager::with_shipped_defaults(Arc::new(store)).unwrap();
    let snapshot = manager
        .reset_to_defaults(ResetConfirmation::parse("RESET").unwrap())
        .await
        .unwrap();

    let baseline = Baseline::shipped().unwrap();
    assert_eq!(snapshot.sections.list(), baseline.sections.as_slice());

    let mut pages = snapshot.pages.list().to_vec();
    let mut expected = baseline.pages.clone();
    pages.sort_by(|a, b| a.key.cmp(&b.key));
    expected.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(pages, expected);
}
