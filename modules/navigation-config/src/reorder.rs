//! Drag-and-drop reordering.
//!
//! A drop arrives as a [`MoveIntent`]. The engine removes the moved record
//! from its container, inserts it at the (clamped) target index, renumbers
//! every record in each touched container as `base + position`, and returns
//! only the records whose placement actually changed. The batch is applied
//! by the store as one unit.
//!
//! `base` is the smallest `sort_order` among the records that were in the
//! container before the move; an empty target container starts at 0.

use std::collections::HashMap;

use crate::error::{NavError, Result};
use crate::registry::{PageRegistry, SectionRegistry};
use crate::types::{MoveIntent, PageEntry, PagePlacement, Section, SectionPlacement, SectionRef};

/// `base + i` for each position, or a validation error on overflow.
fn positions(len: usize, base: i32) -> Result<Vec<i32>> {
    (0..len)
        .map(|i| {
            i32::try_from(i)
                .ok()
                .and_then(|i| base.checked_add(i))
                .ok_or_else(|| NavError::validation("sort order out of range; renumber the container"))
        })
        .collect()
}

fn base_offset(orders: impl Iterator<Item = i32>) -> i32 {
    orders.min().unwrap_or(0)
}

fn push_page_updates(
    order: &[&PageEntry],
    base: i32,
    container: &SectionRef,
    out: &mut Vec<PagePlacement>,
) -> Result<()> {
    for (page, sort_order) in order.iter().zip(positions(order.len(), base)?) {
        if page.sort_order != sort_order || page.section_key != *container {
            out.push(PagePlacement {
                key: page.key.clone(),
                sort_order,
                section_key: container.clone(),
            });
        }
    }
    Ok(())
}

/// Plan the batch for moving one page, within or across sections.
///
/// An empty result means the drop landed where the page already was.
pub fn plan_page_move(
    sections: &SectionRegistry,
    pages: &PageRegistry,
    intent: &MoveIntent,
) -> Result<Vec<PagePlacement>> {
    let moved = pages
        .get(&intent.moved_key)
        .ok_or_else(|| NavError::page_not_found(&intent.moved_key))?;

    if moved.section_key != intent.source_container {
        return Err(NavError::validation(format!(
            "page '{}' is in section '{}', not '{}'; refresh and retry",
            moved.key, moved.section_key, intent.source_container
        )));
    }
    if let SectionRef::Named(key) = &intent.target_container {
        if !sections.contains(key) {
            return Err(NavError::section_not_found(key));
        }
    }

    let source = pages.container(&intent.source_container);
    let source_base = base_offset(source.iter().map(|p| p.sort_order));
    let mut source_order: Vec<&PageEntry> =
        source.into_iter().filter(|p| p.key != moved.key).collect();

    let mut updates = Vec::new();

    if !intent.is_cross_section() {
        let index = intent.target_index.min(source_order.len());
        source_order.insert(index, moved);
        push_page_updates(&source_order, source_base, &intent.source_container, &mut updates)?;
        return Ok(updates);
    }

    let mut target_order = pages.container(&intent.target_container);
    let target_base = base_offset(target_order.iter().map(|p| p.sort_order));
    let index = intent.target_index.min(target_order.len());
    target_order.insert(index, moved);

    push_page_updates(&source_order, source_base, &intent.source_container, &mut updates)?;
    push_page_updates(&target_order, target_base, &intent.target_container, &mut updates)?;
    Ok(updates)
}

/// Plan the batch for moving one section in the flat section list.
pub fn plan_section_move(
    sections: &SectionRegistry,
    moved_key: &str,
    target_index: usize,
) -> Result<Vec<SectionPlacement>> {
    let moved = sections
        .get(moved_key)
        .ok_or_else(|| NavError::section_not_found(moved_key))?;

    let base = base_offset(sections.list().iter().map(|s| s.sort_order));
    let mut order: Vec<&Section> = sections
        .list()
        .iter()
        .filter(|s| s.key != moved.key)
        .collect();
    let index = target_index.min(order.len());
    order.insert(index, moved);

    let mut updates = Vec::new();
    for (section, sort_order) in order.iter().zip(positions(order.len(), base)?) {
        if section.sort_order != sort_order {
            updates.push(SectionPlacement {
                key: section.key.clone(),
                sort_order,
            });
        }
    }
    Ok(updates)
}

/// Apply a page batch to a record set. Every key is checked before anything
/// is written, so a bad batch leaves `pages` untouched.
pub fn apply_page_batch(pages: &mut [PageEntry], batch: &[PagePlacement]) -> Result<()> {
    let index: HashMap<&str, usize> = pages
        .iter()
        .enumerate()
        .map(|(i, p)| (p.key.as_str(), i))
        .collect();

    let targets = batch
        .iter()
        .map(|u| {
            index
                .get(u.key.as_str())
                .copied()
                .ok_or_else(|| NavError::page_not_found(&u.key))
        })
        .collect::<Result<Vec<usize>>>()?;

    for (update, i) in batch.iter().zip(targets) {
        pages[i].sort_order = update.sort_order;
        pages[i].section_key = update.section_key.clone();
    }
    Ok(())
}

/// Section counterpart of [`apply_page_batch`].
pub fn apply_section_batch(sections: &mut [Section], batch: &[SectionPlacement]) -> Result<()> {
    let index: HashMap<&str, usize> = sections
        .iter()
        .enumerate()
        .map(|(i, s)| (s.key.as_str(), i))
        .collect();

    let targets = batch
        .iter()
        .map(|u| {
            index
                .get(u.key.as_str())
                .copied()
                .ok_or_else(|| NavError::section_not_found(&u.key))
        })
        .collect::<Result<Vec<usize>>>()?;

    for (update, i) in batch.iter().zip(targets) {
        sections[i].sort_order = update.sort_order;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn section(key: &str, order: i32) -> Section {
        Section {
            key: key.into(),
            display_name: key.to_uppercase(),
            icon_name: "folder".into(),
            sort_order: order,
            collapsed_by_default: false,
        }
    }

    fn page(key: &str, section: SectionRef, order: i32) -> PageEntry {
        PageEntry {
            key: key.into(),
            title: key.into(),
            description: None,
            icon_name: "file".into(),
            route: format!("/{key}"),
            permission: "nav.read".into(),
            section_key: section,
            sort_order: order,
            visible: true,
            primary_action_label: None,
            ai_action_label: None,
        }
    }

    fn keys(pages: &PageRegistry, section: &SectionRef) -> Vec<(String, i32)> {
        pages
            .container(section)
            .iter()
            .map(|p| (p.key.clone(), p.sort_order))
            .collect()
    }

    fn a() -> SectionRef {
        SectionRef::named("a")
    }

    fn b() -> SectionRef {
        SectionRef::named("b")
    }

    #[test]
    fn cross_section_move_renumbers_both_containers() {
        let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1)]);
        let mut records = vec![page("p1", a(), 0), page("p2", a(), 1), page("p3", b(), 0)];
        let registry = PageRegistry::new(records.clone());

        let batch = plan_page_move(&sections, &registry, &MoveIntent::new("p2", a(), b(), 0)).unwrap();
        apply_page_batch(&mut records, &batch).unwrap();
        let after = PageRegistry::new(records);

        assert_eq!(keys(&after, &a()), vec![("p1".to_string(), 0)]);
        assert_eq!(
            keys(&after, &b()),
            vec![("p2".to_string(), 0), ("p3".to_string(), 1)]
        );
    }

    #[test]
    fn same_position_is_an_empty_batch() {
        let sections = SectionRegistry::new(vec![section("a", 0)]);
        let registry = PageRegistry::new(vec![page("p1", a(), 0), page("p2", a(), 1)]);

        let batch = plan_page_move(&sections, &registry, &MoveIntent::new("p2", a(), a(), 1)).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn target_index_is_clamped() {
        let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1)]);
        let mut records = vec![page("p1", a(), 0), page("p3", b(), 0)];
        let registry = PageRegistry::new(records.clone());

        let batch = plan_page_move(&sections, &registry, &MoveIntent::new("p1", a(), b(), 99)).unwrap();
        apply_page_batch(&mut records, &batch).unwrap();
        let after = PageRegistry::new(records);

        assert!(after.container(&a()).is_empty());
        assert_eq!(
            keys(&after, &b()),
            vec![("p3".to_string(), 0), ("p1".to_string(), 1)]
        );
    }

    #[test]
    fn base_offset_is_preserved() {
        let sections = SectionRegistry::new(vec![section("a", 0)]);
        let mut records = vec![
            page("p1", a(), 100),
            page("p2", a(), 105),
            page("p3", a(), 130),
        ];
        let registry = PageRegistry::new(records.clone());

        let batch = plan_page_move(&sections, &registry, &MoveIntent::new("p3", a(), a(), 0)).unwrap();
        apply_page_batch(&mut records, &batch).unwrap();
        let after = PageRegistry::new(records);

        assert_eq!(
            keys(&after, &a()),
            vec![
                ("p3".to_string(), 100),
                ("p1".to_string(), 101),
                ("p2".to_string(), 102)
            ]
        );
    }

    #[test]
    fn moves_into_and_out_of_ungrouped() {
        let sections = SectionRegistry::new(vec![section("a", 0)]);
        let mut records = vec![page("p1", a(), 0), page("loose", SectionRef::Ungrouped, 4)];
        let registry = PageRegistry::new(records.clone());

        let intent = MoveIntent::new("loose", SectionRef::Ungrouped, a(), 0);
        let batch = plan_page_move(&sections, &registry, &intent).unwrap();
        apply_page_batch(&mut records, &batch).unwrap();
        let after = PageRegistry::new(records);

        assert!(after.container(&SectionRef::Ungrouped).is_empty());
        assert_eq!(after.get("loose").unwrap().section_key, a());
    }

    #[test]
    fn stale_source_is_rejected() {
        let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1)]);
        let registry = PageRegistry::new(vec![page("p1", a(), 0)]);

        let err = plan_page_move(&sections, &registry, &MoveIntent::new("p1", b(), a(), 0)).unwrap_err();
        assert!(matches!(err, NavError::Validation(_)));

        let err = plan_page_move(&sections, &registry, &MoveIntent::new("gone", a(), a(), 0)).unwrap_err();
        assert!(matches!(err, NavError::NotFound { .. }));

        let err = plan_page_move(
            &sections,
            &registry,
            &MoveIntent::new("p1", a(), SectionRef::named("missing"), 0),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::NotFound { .. }));
    }

    #[test]
    fn section_move_to_front() {
        let mut records = vec![section("a", 0), section("b", 1), section("c", 2)];
        let registry = SectionRegistry::new(records.clone());

        let batch = plan_section_move(&registry, "c", 0).unwrap();
        apply_section_batch(&mut records, &batch).unwrap();
        let after = SectionRegistry::new(records);

        let order: Vec<_> = after
            .list()
            .iter()
            .map(|s| (s.key.as_str(), s.sort_order))
            .collect();
        assert_eq!(order, vec![("c", 0), ("a", 1), ("b", 2)]);
    }

    #[test]
    fn section_move_in_place_is_empty() {
        let registry = SectionRegistry::new(vec![section("a", 0), section("b", 1)]);
        assert!(plan_section_move(&registry, "a", 0).unwrap().is_empty());
        assert!(plan_section_move(&registry, "zzz", 0).is_err());
    }

    #[test]
    fn move_into_a_container_at_the_top_of_the_range_is_rejected() {
        let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1)]);
        let pages = PageRegistry::new(vec![
            page("p1", a(), 0),
            page("p2", b(), i32::MAX - 1),
            page("p3", b(), i32::MAX),
        ]);

        let err = plan_page_move(
            &sections,
            &pages,
            &MoveIntent::new("p1", a(), b(), 2),
        )
        .unwrap_err();
        assert!(matches!(err, NavError::Validation(_)));
    }

    #[test]
    fn bad_batch_changes_nothing() {
        let mut records = vec![page("p1", a(), 0)];
        let batch = vec![
            PagePlacement {
                key: "p1".into(),
                sort_order: 7,
                section_key: a(),
            },
            PagePlacement {
                key: "ghost".into(),
                sort_order: 8,
                section_key: a(),
            },
        ];
        assert!(apply_page_batch(&mut records, &batch).is_err());
        assert_eq!(records[0].sort_order, 0);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn containers() -> Vec<SectionRef> {
        vec![a(), b(), SectionRef::named("c"), SectionRef::Ungrouped]
    }

    /// Pages spread across containers with strictly increasing, gappy orders.
    fn arb_pages() -> impl Strategy<Value = Vec<PageEntry>> {
        prop::collection::vec((0usize..4, 1i32..5), 1..14).prop_map(|layout| {
            let mut next = [0i32; 4];
            layout
                .into_iter()
                .enumerate()
                .map(|(i, (c, gap))| {
                    next[c] += gap;
                    page(&format!("p{i}"), containers()[c].clone(), next[c])
                })
                .collect()
        })
    }

    fn arb_moves() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
        prop::collection::vec((0usize..14, 0usize..4, 0usize..16), 1..20)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every container stays strictly increasing and matches the visual
        /// order the drops describe.
        #[test]
        fn prop_orders_follow_visual_order(records in arb_pages(), moves in arb_moves()) {
            let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1), section("c", 2)]);
            let mut records = records;

            for (pick, target, index) in moves {
                let registry = PageRegistry::new(records.clone());
                let moved = registry.list()[pick % registry.len()].clone();
                let target = containers()[target].clone();

                // Expected visual order, computed on plain key lists.
                let mut expected: HashMap<SectionRef, Vec<String>> = containers()
                    .into_iter()
                    .map(|c| {
                        let ks = registry.container(&c).iter().map(|p| p.key.clone()).collect();
                        (c, ks)
                    })
                    .collect();
                if let Some(list) = expected.get_mut(&moved.section_key) {
                    list.retain(|k| k != &moved.key);
                }
                let list = expected.entry(target.clone()).or_default();
                let clamped = index.min(list.len());
                list.insert(clamped, moved.key.clone());

                let intent = MoveIntent::new(moved.key.clone(), moved.section_key.clone(), target, index);
                let batch = plan_page_move(&sections, &registry, &intent).unwrap();
                apply_page_batch(&mut records, &batch).unwrap();

                let after = PageRegistry::new(records.clone());
                for container in containers() {
                    let got = after.container(&container);
                    let got_keys: Vec<String> = got.iter().map(|p| p.key.clone()).collect();
                    prop_assert_eq!(&got_keys, &expected[&container]);
                    for pair in got.windows(2) {
                        prop_assert!(pair[0].sort_order < pair[1].sort_order);
                    }
                }
            }
        }

        /// A cross-section move changes exactly one record's section.
        #[test]
        fn prop_cross_move_changes_one_section_key(records in arb_pages(), pick in 0usize..14, target in 0usize..4, index in 0usize..16) {
            let sections = SectionRegistry::new(vec![section("a", 0), section("b", 1), section("c", 2)]);
            let registry = PageRegistry::new(records.clone());
            let moved = registry.list()[pick % registry.len()].clone();
            let target = containers()[target].clone();
            prop_assume!(moved.section_key != target);

            let intent = MoveIntent::new(moved.key.clone(), moved.section_key.clone(), target.clone(), index);
            let batch = plan_page_move(&sections, &registry, &intent).unwrap();

            let mut after = records.clone();
            apply_page_batch(&mut after, &batch).unwrap();

            let changed: Vec<&str> = records
                .iter()
                .zip(after.iter())
                .filter(|(before, after)| before.section_key != after.section_key)
                .map(|(before, _)| before.key.as_str())
                .collect();
            prop_assert_eq!(changed, vec![moved.key.as_str()]);
        }
    }
}
