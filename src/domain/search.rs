//! Lookups over built trees and flat records.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::domain::entities::{CategoryId, CategoryNode, CategoryRecord, FlatCategory};
use crate::domain::error::{DomainError, DomainResult};

/// Depth-first search with early exit.
pub fn find_category_by_id<'a>(
    nodes: &'a [CategoryNode],
    id: &CategoryId,
) -> Option<&'a CategoryNode> {
    let mut stack: Vec<&CategoryNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.id() == id {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Ancestors of `id`, root first, by walking `parent` links in the flat list.
///
/// The walk stops quietly at a parent id that is not in `records`.
#[instrument(level = "debug", skip(records), fields(records = records.len()))]
pub fn get_all_parent_categories<'a>(
    records: &'a [CategoryRecord],
    id: &CategoryId,
) -> DomainResult<Vec<&'a CategoryRecord>> {
    let by_id: HashMap<&CategoryId, &CategoryRecord> =
        records.iter().map(|r| (&r.id, r)).collect();

    let start: &'a CategoryRecord = by_id
        .get(id)
        .copied()
        .ok_or_else(|| DomainError::UnknownCategory(id.clone()))?;

    let mut visited: HashSet<&CategoryId> = HashSet::from([&start.id]);
    let mut chain = vec![start];
    let mut ancestors = Vec::new();
    let mut current = start;

    while let Some(parent_id) = &current.parent {
        let Some(&parent) = by_id.get(parent_id) else {
            debug!("Parent {} of {} not found, ending walk", parent_id, current.id);
            break;
        };
        if !visited.insert(&parent.id) {
            chain.push(parent);
            return Err(DomainError::CycleDetected {
                chain: chain.iter().map(|r| r.id.clone()).collect(),
            });
        }
        chain.push(parent);
        ancestors.push(parent);
        current = parent;
    }

    ancestors.reverse();
    Ok(ancestors)
}

/// Every id below `id` in the tree, in pre-order. Empty if `id` is absent.
pub fn descendant_ids(nodes: &[CategoryNode], id: &CategoryId) -> Vec<CategoryId> {
    let Some(root) = find_category_by_id(nodes, id) else {
        return Vec::new();
    };

    let mut ids = Vec::new();
    let mut stack: Vec<&CategoryNode> = root.children.iter().rev().collect();
    while let Some(node) = stack.pop() {
        ids.push(node.id().clone());
        stack.extend(node.children.iter().rev());
    }
    ids
}

/// One entry of the parent selector in the category edit form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParentOption {
    pub id: CategoryId,
    /// Name indented by level
    pub label: String,
    pub level: usize,
}

/// Parent selector entries built from flattened rows.
///
/// When editing an existing category, that category and its descendants are
/// left out so it cannot be moved beneath itself.
pub fn parent_options(
    rows: &[FlatCategory],
    editing: Option<&CategoryId>,
    indent: &str,
) -> Vec<ParentOption> {
    let mut excluded_level: Option<usize> = None;
    let mut options = Vec::with_capacity(rows.len());

    for row in rows {
        // Rows are pre-order: a subtree ends at the next row at or above its level.
        if let Some(level) = excluded_level {
            if row.level > level {
                continue;
            }
            excluded_level = None;
        }
        if editing == Some(row.id()) {
            excluded_level = Some(row.level);
            continue;
        }
        options.push(ParentOption {
            id: row.id().clone(),
            label: format!("{}{}", indent.repeat(row.level), row.name()),
            level: row.level,
        });
    }

    options
}
