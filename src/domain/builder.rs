//! Tree builder: flat category records to a sorted forest.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::arena::CategoryArena;
use crate::domain::entities::{CategoryId, CategoryNode, CategoryRecord};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// What to do with a record whose parent id matches no record in the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave the orphan and its descendants out of the tree, report them
    #[default]
    Drop,
    /// Treat the orphan as a root
    Promote,
    /// Fail the build
    Reject,
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrphanPolicy::Drop => "drop",
            OrphanPolicy::Promote => "promote",
            OrphanPolicy::Reject => "reject",
        };
        f.write_str(s)
    }
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OrphanPolicy::Drop),
            "promote" => Ok(OrphanPolicy::Promote),
            "reject" => Ok(OrphanPolicy::Reject),
            other => Err(format!(
                "unknown orphan policy '{}' (expected drop, promote or reject)",
                other
            )),
        }
    }
}

/// A record whose declared parent does not exist in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orphan {
    pub id: CategoryId,
    pub name: String,
    pub missing_parent: CategoryId,
}

/// Integrity findings from a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Records with an unresolved parent id
    pub orphans: Vec<Orphan>,
    /// Every id left out of the tree: orphans plus their descendants
    pub dropped: Vec<CategoryId>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.dropped.is_empty()
    }
}

/// Built forest plus the integrity report of the build.
#[derive(Debug)]
pub struct CategoryForest {
    pub arena: CategoryArena,
    pub report: BuildReport,
}

impl CategoryForest {
    pub fn to_tree(&self) -> Vec<CategoryNode> {
        self.arena.to_tree()
    }
}

/// Constructs sorted category trees from flat records.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    policy: OrphanPolicy,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orphan_policy(policy: OrphanPolicy) -> Self {
        Self { policy }
    }

    /// Build the full forest: every root category and its descendants.
    #[instrument(level = "debug", skip(self, records), fields(records = records.len(), policy = %self.policy))]
    pub fn build(&self, records: &[CategoryRecord]) -> TreeResult<CategoryForest> {
        let by_id = index_records(records)?;

        let orphan_idx: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.parent.as_ref().is_some_and(|p| !by_id.contains_key(p)))
            .map(|(i, _)| i)
            .collect();

        if self.policy == OrphanPolicy::Reject && !orphan_idx.is_empty() {
            return Err(DomainError::OrphanedCategory {
                orphans: orphan_idx
                    .iter()
                    .map(|&i| (records[i].id.clone(), parent_of(&records[i]).clone()))
                    .collect(),
            });
        }

        let promote = self.policy == OrphanPolicy::Promote;
        let children_of = group_children(records, &by_id, promote);
        let (arena, visited) = walk(records, &by_id, &children_of, None)?;

        let mut report = BuildReport::default();
        if visited.len() < records.len() {
            // Whatever was not reached hangs off a missing parent or a cycle.
            for i in (0..records.len()).filter(|i| !visited.contains(i)) {
                trace_unreached(records, &by_id, i)?;
                report.dropped.push(records[i].id.clone());
            }
            for &i in &orphan_idx {
                let orphan = Orphan {
                    id: records[i].id.clone(),
                    name: records[i].name.clone(),
                    missing_parent: parent_of(&records[i]).clone(),
                };
                warn!(
                    "Dropping category '{}' ({}): parent {} not found",
                    orphan.name, orphan.id, orphan.missing_parent
                );
                report.orphans.push(orphan);
            }
        }

        debug!(
            "Built {} categories under {} roots, {} dropped",
            arena.len(),
            arena.roots().len(),
            report.dropped.len()
        );
        Ok(CategoryForest { arena, report })
    }

    /// Build only the descendants of `parent_id`.
    ///
    /// `parent_id` does not need to exist in `records`; its children become
    /// the roots of the result. Orphan handling does not apply here.
    #[instrument(level = "debug", skip(self, records), fields(records = records.len()))]
    pub fn build_under(
        &self,
        records: &[CategoryRecord],
        parent_id: &CategoryId,
    ) -> TreeResult<CategoryForest> {
        let by_id = index_records(records)?;
        let children_of = group_children(records, &by_id, false);
        let (arena, _) = walk(records, &by_id, &children_of, Some(parent_id))?;

        Ok(CategoryForest {
            arena,
            report: BuildReport::default(),
        })
    }
}

/// Build the nested tree with the default orphan policy.
pub fn build_category_tree(records: &[CategoryRecord]) -> TreeResult<Vec<CategoryNode>> {
    Ok(TreeBuilder::new().build(records)?.to_tree())
}

fn parent_of(record: &CategoryRecord) -> &CategoryId {
    record.parent.as_ref().unwrap_or(&record.id)
}

fn index_records(records: &[CategoryRecord]) -> TreeResult<HashMap<&CategoryId, usize>> {
    let mut by_id = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        if by_id.insert(&record.id, i).is_some() {
            return Err(DomainError::DuplicateId(record.id.clone()));
        }
    }
    Ok(by_id)
}

/// Group record indices by parent id, each group sorted by display order.
///
/// Groups are filled in input order and `sort_by_key` is stable, so equal
/// display orders keep their input order.
fn group_children<'a>(
    records: &'a [CategoryRecord],
    by_id: &HashMap<&CategoryId, usize>,
    promote_orphans: bool,
) -> HashMap<Option<&'a CategoryId>, Vec<usize>> {
    let mut children_of: HashMap<Option<&CategoryId>, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let key = match &record.parent {
            Some(p) if promote_orphans && !by_id.contains_key(p) => None,
            other => other.as_ref(),
        };
        children_of.entry(key).or_default().push(i);
    }
    for group in children_of.values_mut() {
        group.sort_by_key(|&i| records[i].sort_key());
    }
    children_of
}

/// Depth-first insertion with an explicit stack.
fn walk(
    records: &[CategoryRecord],
    by_id: &HashMap<&CategoryId, usize>,
    children_of: &HashMap<Option<&CategoryId>, Vec<usize>>,
    start: Option<&CategoryId>,
) -> TreeResult<(CategoryArena, HashSet<usize>)> {
    let mut arena = CategoryArena::new();
    let mut visited: HashSet<usize> = HashSet::new();

    // A subtree root that sits on a cycle must be caught when it comes around again.
    if let Some(&start_idx) = start.and_then(|id| by_id.get(id)) {
        visited.insert(start_idx);
    }

    let mut stack: Vec<_> = children_of
        .get(&start)
        .map(|roots| roots.iter().rev().map(|&i| (i, None)).collect())
        .unwrap_or_default();

    while let Some((i, parent_idx)) = stack.pop() {
        if !visited.insert(i) {
            let mut chain: Vec<CategoryId> = start.into_iter().cloned().collect();
            if let Some(parent_idx) = parent_idx {
                chain.extend(
                    arena
                        .ancestors(parent_idx)
                        .into_iter()
                        .chain(std::iter::once(parent_idx))
                        .filter_map(|idx| arena.get_node(idx))
                        .map(|n| n.data.id.clone()),
                );
            }
            chain.push(records[i].id.clone());
            return Err(DomainError::CycleDetected { chain });
        }

        let current_idx = arena.insert_node(records[i].clone(), parent_idx);

        if let Some(children) = children_of.get(&Some(&records[i].id)) {
            for &child in children.iter().rev() {
                stack.push((child, Some(current_idx)));
            }
        }
    }

    Ok((arena, visited))
}

/// Follow the parent chain of an unreached record.
///
/// Ends at a missing parent (the record is an orphan or an orphan's
/// descendant) or fails when the chain comes back on itself.
fn trace_unreached(
    records: &[CategoryRecord],
    by_id: &HashMap<&CategoryId, usize>,
    start: usize,
) -> TreeResult<()> {
    let mut path = vec![start];
    let mut seen: HashSet<usize> = HashSet::from([start]);
    let mut current = start;

    while let Some(parent) = &records[current].parent {
        let Some(&parent_idx) = by_id.get(parent) else {
            return Ok(());
        };
        if !seen.insert(parent_idx) {
            let from = path.iter().position(|&i| i == parent_idx).unwrap_or(0);
            let chain = path[from..]
                .iter()
                .chain(std::iter::once(&parent_idx))
                .map(|&i| records[i].id.clone())
                .collect();
            return Err(DomainError::CycleDetected { chain });
        }
        path.push(parent_idx);
        current = parent_idx;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, name: &str, parent: Option<&str>, order: Option<i64>) -> CategoryRecord {
        let mut r = CategoryRecord::new(id, name);
        r.parent = parent.map(CategoryId::from);
        r.display_order = order;
        r
    }

    fn names(nodes: &[CategoryNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name()).collect()
    }

    #[test]
    fn given_roots_and_child_when_building_then_sorted_by_display_order() {
        let records = vec![
            rec("1", "Men", None, Some(2)),
            rec("2", "Women", None, Some(1)),
            rec("3", "Shirts", Some("1"), Some(1)),
        ];

        let tree = build_category_tree(&records).unwrap();

        assert_eq!(names(&tree), vec!["Women", "Men"]);
        assert!(!tree[0].has_children());
        assert_eq!(names(&tree[1].children), vec!["Shirts"]);
    }

    #[test]
    fn given_equal_display_orders_when_building_then_input_order_kept() {
        let records = vec![
            rec("b", "B", None, Some(0)),
            rec("a", "A", None, None),
            rec("c", "C", None, Some(0)),
        ];

        let tree = build_category_tree(&records).unwrap();

        assert_eq!(names(&tree), vec!["B", "A", "C"]);
    }

    #[test]
    fn given_orphan_when_building_with_drop_then_excluded_and_reported() {
        let records = vec![
            rec("1", "A", Some("missing"), None),
            rec("2", "A-child", Some("1"), None),
            rec("3", "Root", None, None),
        ];

        let forest = TreeBuilder::new().build(&records).unwrap();
        let tree = forest.to_tree();

        assert_eq!(names(&tree), vec!["Root"]);
        assert_eq!(forest.report.orphans.len(), 1);
        assert_eq!(forest.report.orphans[0].missing_parent, CategoryId::from("missing"));
        assert_eq!(
            forest.report.dropped,
            vec![CategoryId::from("1"), CategoryId::from("2")]
        );
    }

    #[test]
    fn given_orphan_when_building_with_promote_then_becomes_root() {
        let records = vec![
            rec("1", "Orphan", Some("missing"), Some(5)),
            rec("2", "Root", None, Some(1)),
        ];

        let forest = TreeBuilder::with_orphan_policy(OrphanPolicy::Promote)
            .build(&records)
            .unwrap();

        assert_eq!(names(&forest.to_tree()), vec!["Root", "Orphan"]);
        assert!(forest.report.is_clean());
    }

    #[test]
    fn given_orphan_when_building_with_reject_then_errors() {
        let records = vec![rec("1", "A", Some("missing"), None)];

        let result = TreeBuilder::with_orphan_policy(OrphanPolicy::Reject).build(&records);

        assert!(matches!(result, Err(DomainError::OrphanedCategory { .. })));
    }

    #[test]
    fn given_cycle_when_building_then_cycle_detected() {
        let records = vec![
            rec("a", "A", Some("b"), None),
            rec("b", "B", Some("a"), None),
            rec("r", "Root", None, None),
        ];

        let result = TreeBuilder::new().build(&records);

        match result {
            Err(DomainError::CycleDetected { chain }) => {
                assert_eq!(chain.first(), chain.last());
                assert_eq!(chain.len(), 3);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn given_subtree_root_on_cycle_when_building_under_then_cycle_detected() {
        let records = vec![
            rec("a", "A", Some("b"), None),
            rec("b", "B", Some("a"), None),
        ];

        let result = TreeBuilder::new().build_under(&records, &CategoryId::from("a"));

        assert_eq!(
            result.unwrap_err(),
            DomainError::CycleDetected {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn given_parent_id_when_building_under_then_only_descendants() {
        let records = vec![
            rec("1", "Men", None, None),
            rec("2", "Shirts", Some("1"), Some(2)),
            rec("3", "Shoes", Some("1"), Some(1)),
            rec("4", "Boots", Some("3"), None),
        ];

        let forest = TreeBuilder::new()
            .build_under(&records, &CategoryId::from("1"))
            .unwrap();
        let tree = forest.to_tree();

        assert_eq!(names(&tree), vec!["Shoes", "Shirts"]);
        assert_eq!(names(&tree[0].children), vec!["Boots"]);
    }

    #[test]
    fn given_duplicate_ids_when_building_then_errors() {
        let records = vec![rec("1", "A", None, None), rec("1", "B", None, None)];

        let result = TreeBuilder::new().build(&records);

        assert_eq!(result.unwrap_err(), DomainError::DuplicateId("1".into()));
    }

    #[test]
    fn given_empty_input_when_building_then_empty_tree() {
        assert!(build_category_tree(&[]).unwrap().is_empty());
    }

    #[test]
    fn given_deep_chain_when_building_then_no_stack_overflow() {
        let mut records = vec![rec("0", "n0", None, None)];
        for i in 1..50_000 {
            records.push(rec(
                &i.to_string(),
                &format!("n{}", i),
                Some(&(i - 1).to_string()),
                None,
            ));
        }

        let forest = TreeBuilder::new().build(&records).unwrap();
        assert_eq!(forest.arena.depth(), 50_000);
        assert_eq!(forest.arena.len(), 50_000);

        let nested = forest.to_tree();
        assert_eq!(nested.len(), 1);
        drop(nested);

        let tree = build_category_tree(&records).unwrap();
        let mut depth = 0;
        let mut level = tree.as_slice();
        while let Some(node) = level.first() {
            depth += 1;
            level = &node.children;
        }
        assert_eq!(depth, 50_000);
    }

    #[test]
    fn given_policy_names_when_parsing_then_round_trip() {
        for policy in [OrphanPolicy::Drop, OrphanPolicy::Promote, OrphanPolicy::Reject] {
            assert_eq!(policy.to_string().parse::<OrphanPolicy>().unwrap(), policy);
        }
        assert!("keep".parse::<OrphanPolicy>().is_err());
    }
}
