//! Flatten nested category trees into annotated rows.

use tracing::instrument;

use crate::domain::entities::{CategoryNode, FlatCategory};

/// Default breadcrumb separator.
pub const PATH_SEPARATOR: &str = " > ";

/// Pre-order rows for a whole tree, starting at level 0.
pub fn flatten_categories(nodes: &[CategoryNode], separator: &str) -> Vec<FlatCategory> {
    flatten_categories_from(nodes, 0, "", &[], separator)
}

/// Pre-order rows for `nodes`, placed under an existing ancestor context.
///
/// `parent_name` is copied onto the given nodes as-is and `path` holds the
/// ancestor names, root first. Descendants of a node follow it contiguously.
#[instrument(level = "debug", skip(nodes, path), fields(nodes = nodes.len()))]
pub fn flatten_categories_from(
    nodes: &[CategoryNode],
    level: usize,
    parent_name: &str,
    path: &[String],
    separator: &str,
) -> Vec<FlatCategory> {
    let mut rows = Vec::new();
    let prefix = path.join(separator);

    // (node, level, parent name, ancestor path)
    let mut stack: Vec<(&CategoryNode, usize, &str, String)> = nodes
        .iter()
        .rev()
        .map(|n| (n, level, parent_name, prefix.clone()))
        .collect();

    while let Some((node, level, parent_name, ancestors)) = stack.pop() {
        let path = if ancestors.is_empty() {
            node.record.name.clone()
        } else {
            format!("{}{}{}", ancestors, separator, node.record.name)
        };

        for child in node.children.iter().rev() {
            stack.push((child, level + 1, node.record.name.as_str(), path.clone()));
        }

        rows.push(FlatCategory {
            record: node.record.clone(),
            level,
            parent_name: parent_name.to_string(),
            path,
            child_count: node.children.len(),
        });
    }

    rows
}
