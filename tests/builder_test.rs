//! Tests for TreeBuilder and the flatten round trip

use std::collections::HashMap;

use rstest::rstest;

use cattree::domain::{
    build_category_tree, flatten_categories, CategoryId, CategoryNode, CategoryRecord,
    DomainError, FlatCategory, OrphanPolicy, TreeBuilder, PATH_SEPARATOR,
};
use cattree::util::testing::{init_test_setup, sample_records};

fn records_from(json: serde_json::Value) -> Vec<CategoryRecord> {
    serde_json::from_value(json).expect("valid category json")
}

fn names(nodes: &[CategoryNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name()).collect()
}

fn flat_names(rows: &[FlatCategory]) -> Vec<&str> {
    rows.iter().map(|r| r.name()).collect()
}

// ============================================================
// Example scenarios
// ============================================================

#[test]
fn given_men_women_shirts_when_building_then_roots_sorted_and_paths_set() {
    init_test_setup();
    let records = records_from(serde_json::json!([
        {"id": 1, "name": "Men", "parent": null, "displayOrder": 2},
        {"id": 2, "name": "Women", "parent": null, "displayOrder": 1},
        {"id": 3, "name": "Shirts", "parent": 1, "displayOrder": 1}
    ]));

    let tree = build_category_tree(&records).unwrap();
    assert_eq!(names(&tree), vec!["Women", "Men"]);
    assert_eq!(names(&tree[1].children), vec!["Shirts"]);

    let rows = flatten_categories(&tree, PATH_SEPARATOR);
    let summary: Vec<(&str, usize, &str, &str)> = rows
        .iter()
        .map(|r| (r.name(), r.level, r.parent_name.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Women", 0, "", "Women"),
            ("Men", 0, "", "Men"),
            ("Shirts", 1, "Men", "Men > Shirts"),
        ]
    );
}

#[test]
fn given_orphan_only_when_building_then_empty_tree_without_error() {
    init_test_setup();
    let records = records_from(serde_json::json!([
        {"id": 1, "name": "A", "parent": "missing"}
    ]));

    let tree = build_category_tree(&records).unwrap();

    assert!(tree.is_empty());
}

#[test]
fn given_empty_input_when_building_and_flattening_then_both_empty() {
    let tree = build_category_tree(&[]).unwrap();

    assert!(tree.is_empty());
    assert!(flatten_categories(&tree, PATH_SEPARATOR).is_empty());
}

#[test]
fn given_equal_display_orders_when_building_then_input_order_preserved() {
    let records = records_from(serde_json::json!([
        {"id": "x", "name": "X", "displayOrder": 0},
        {"id": "y", "name": "Y", "displayOrder": 0}
    ]));

    let tree = build_category_tree(&records).unwrap();

    assert_eq!(names(&tree), vec!["X", "Y"]);
}

// ============================================================
// Properties
// ============================================================

#[test]
fn given_resolvable_input_when_round_tripping_then_every_id_once() {
    let records = sample_records();

    let rows = flatten_categories(&build_category_tree(&records).unwrap(), PATH_SEPARATOR);

    let mut seen: Vec<&CategoryId> = rows.iter().map(|r| r.id()).collect();
    seen.sort();
    let mut expected: Vec<&CategoryId> = records.iter().map(|r| &r.id).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

#[test]
fn given_sample_catalog_when_flattening_then_descendants_are_contiguous() {
    let rows = flatten_categories(&build_category_tree(&sample_records()).unwrap(), PATH_SEPARATOR);

    assert_eq!(flat_names(&rows), vec!["Women", "Men", "Shoes", "Boots", "Shirts"]);

    // After a row, its subtree is the following run of strictly deeper rows.
    for (i, row) in rows.iter().enumerate() {
        let subtree_len = rows[i + 1..]
            .iter()
            .take_while(|r| r.level > row.level)
            .count();
        let expected = count_descendants(&rows, row.id());
        assert_eq!(subtree_len, expected, "subtree of {}", row.name());
    }
}

fn count_descendants(rows: &[FlatCategory], id: &CategoryId) -> usize {
    let parents: HashMap<&CategoryId, Option<&CategoryId>> = rows
        .iter()
        .map(|r| (r.id(), r.record.parent.as_ref()))
        .collect();
    rows.iter()
        .filter(|r| {
            let mut current = parents[r.id()];
            while let Some(p) = current {
                if p == id {
                    return true;
                }
                current = parents.get(p).copied().flatten();
            }
            false
        })
        .count()
}

#[test]
fn given_sample_catalog_when_flattening_then_paths_have_level_plus_one_segments() {
    let rows = flatten_categories(&build_category_tree(&sample_records()).unwrap(), PATH_SEPARATOR);

    for row in &rows {
        let segments: Vec<&str> = row.path.split(PATH_SEPARATOR).collect();
        assert_eq!(segments.len(), row.level + 1);
        assert_eq!(segments.last(), Some(&row.name()));
        if row.level == 0 {
            assert_eq!(row.parent_name, "");
        } else {
            assert_eq!(segments[row.level - 1], row.parent_name);
        }
    }
}

#[test]
fn given_children_out_of_order_when_building_then_siblings_ascending() {
    let records = records_from(serde_json::json!([
        {"id": "r", "name": "Root"},
        {"id": "c", "name": "C", "parent": "r", "displayOrder": 3},
        {"id": "a", "name": "A", "parent": "r", "displayOrder": -1},
        {"id": "b", "name": "B", "parent": "r"},
        {"id": "b2", "name": "B2", "parent": "r", "displayOrder": 0}
    ]));

    let tree = build_category_tree(&records).unwrap();

    assert_eq!(names(&tree[0].children), vec!["A", "B", "B2", "C"]);
}

#[test]
fn given_payload_fields_when_building_then_passed_through() {
    let records = records_from(serde_json::json!([
        {"_id": "64f0", "name": "Sale", "slug": "sale", "status": "active", "productCount": 7}
    ]));

    let tree = build_category_tree(&records).unwrap();
    let json = serde_json::to_value(&tree).unwrap();

    assert_eq!(json[0]["id"], "64f0");
    assert_eq!(json[0]["slug"], "sale");
    assert_eq!(json[0]["productCount"], 7);
    assert!(json[0].get("children").is_none());
}

// ============================================================
// Orphans and cycles
// ============================================================

#[rstest]
#[case::drop(OrphanPolicy::Drop, vec!["Root"])]
#[case::promote(OrphanPolicy::Promote, vec!["Root", "Lost"])]
fn given_orphan_with_child_when_building_then_policy_decides_placement(
    #[case] policy: OrphanPolicy,
    #[case] expected_roots: Vec<&str>,
) {
    let records = vec![
        CategoryRecord::new("r", "Root"),
        CategoryRecord::new("l", "Lost").with_parent("gone").with_display_order(1),
        CategoryRecord::new("k", "Kid").with_parent("l"),
    ];

    let forest = TreeBuilder::with_orphan_policy(policy).build(&records).unwrap();
    let tree = forest.to_tree();

    assert_eq!(names(&tree), expected_roots);
    if policy == OrphanPolicy::Promote {
        assert_eq!(names(&tree[1].children), vec!["Kid"]);
        assert!(forest.report.is_clean());
    } else {
        assert_eq!(forest.report.orphans.len(), 1);
        assert_eq!(forest.report.dropped.len(), 2);
    }
}

#[test]
fn given_orphan_when_building_with_reject_then_error_names_missing_parent() {
    let records = vec![CategoryRecord::new("l", "Lost").with_parent("gone")];

    let err = TreeBuilder::with_orphan_policy(OrphanPolicy::Reject)
        .build(&records)
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::OrphanedCategory {
            orphans: vec![("l".into(), "gone".into())]
        }
    );
    assert!(err.to_string().contains("l (parent gone)"));
}

#[test]
fn given_branch_hanging_off_cycle_when_building_then_cycle_detected() {
    let records = vec![
        CategoryRecord::new("root", "Root"),
        CategoryRecord::new("a", "A").with_parent("b"),
        CategoryRecord::new("b", "B").with_parent("a"),
        CategoryRecord::new("x", "X").with_parent("a"),
    ];

    let err = TreeBuilder::new().build(&records).unwrap_err();

    assert!(matches!(err, DomainError::CycleDetected { .. }));
}

#[test]
fn given_self_parent_when_building_then_cycle_detected() {
    let records = vec![CategoryRecord::new("a", "A").with_parent("a")];

    let err = TreeBuilder::new().build(&records).unwrap_err();

    assert_eq!(
        err,
        DomainError::CycleDetected {
            chain: vec!["a".into(), "a".into()]
        }
    );
}

#[test]
fn given_empty_string_parent_when_building_then_category_is_root() {
    let records = records_from(serde_json::json!([
        {"id": "a", "name": "A", "parent": "", "displayOrder": 2},
        {"id": "b", "name": "B", "parent": null, "displayOrder": 1}
    ]));

    let forest = TreeBuilder::new().build(&records).unwrap();

    assert_eq!(names(&forest.to_tree()), vec!["B", "A"]);
    assert!(forest.report.is_clean());
}

// ============================================================
// Deep hierarchies
// ============================================================

/// Single chain `0 <- 1 <- ... <- depth-1`, every name one character.
fn chain(depth: usize) -> Vec<CategoryRecord> {
    (0..depth)
        .map(|i| {
            let record = CategoryRecord::new(i.to_string(), "x");
            match i {
                0 => record,
                _ => record.with_parent((i - 1).to_string()),
            }
        })
        .collect()
}

#[test]
fn given_deep_chain_when_building_and_flattening_then_one_row_per_level() {
    init_test_setup();
    let depth = 10_000;

    let tree = build_category_tree(&chain(depth)).unwrap();
    let rows = flatten_categories(&tree, "");
    drop(tree);

    assert_eq!(rows.len(), depth);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.level, i);
        assert_eq!(row.path.len(), i + 1);
    }
    assert_eq!(rows[depth - 1].child_count, 0);
    assert_eq!(rows[depth - 2].parent_name, "x");
}
