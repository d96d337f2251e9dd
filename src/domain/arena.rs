//! Arena-backed category forest.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{CategoryId, CategoryNode, CategoryRecord};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Category data for this node
    pub data: CategoryRecord,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in display order
    pub children: Vec<Index>,
}

/// Arena-based forest of category trees.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Unlike a single env hierarchy, a catalog has many roots.
#[derive(Debug, Default)]
pub struct CategoryArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Root indices in display order
    roots: Vec<Index>,
    /// Category id to arena index
    by_id: HashMap<CategoryId, Index>,
}

impl CategoryArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self, data), fields(id = %data.id))]
    pub fn insert_node(&mut self, data: CategoryRecord, parent: Option<Index>) -> Index {
        let id = data.id.clone();
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.roots.push(node_idx);
        }
        self.by_id.insert(id, node_idx);

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn find(&self, id: &CategoryId) -> Option<Index> {
        self.by_id.get(id).copied()
    }

    /// Parent chain of `idx`, root first, excluding `idx` itself.
    pub fn ancestors(&self, idx: Index) -> Vec<Index> {
        let mut chain = Vec::new();
        let mut current = self.get_node(idx).and_then(|n| n.parent);
        while let Some(parent_idx) = current {
            chain.push(parent_idx);
            current = self.get_node(parent_idx).and_then(|n| n.parent);
        }
        chain.reverse();
        chain
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels in the deepest tree, 0 for an empty forest.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.iter().map(|(_, _, level)| level + 1).max().unwrap_or(0)
    }

    /// Collects the names of all leaf categories (no children), in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_nodes(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, node, _)| node.children.is_empty())
            .map(|(_, node, _)| node.data.name.clone())
            .collect()
    }

    /// Converts the forest into owned nested nodes.
    ///
    /// Children are assembled bottom-up from the post-order walk, so no
    /// recursion depth is tied to the category nesting depth.
    #[instrument(level = "debug", skip(self))]
    pub fn to_tree(&self) -> Vec<CategoryNode> {
        let mut built: HashMap<Index, CategoryNode> = HashMap::with_capacity(self.len());

        for (idx, node) in self.iter_postorder() {
            let children = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                idx,
                CategoryNode {
                    record: node.data.clone(),
                    children,
                },
            );
        }

        self.roots
            .iter()
            .filter_map(|root| built.remove(root))
            .collect()
    }
}

/// Pre-order walk across all roots, yielding the node depth (roots at 0).
pub struct TreeIterator<'a> {
    arena: &'a CategoryArena,
    stack: Vec<(Index, usize)>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a CategoryArena) -> Self {
        // Push roots in reverse order for left-to-right traversal
        let stack = arena.roots.iter().rev().map(|&root| (root, 0)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, level)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                for &child in node.children.iter().rev() {
                    self.stack.push((child, level + 1));
                }
                return Some((current_idx, node, level));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a CategoryArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a CategoryArena) -> Self {
        let stack = arena.roots.iter().rev().map(|&root| (root, false)).collect();
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //  A        D
    //  ├── B
    //  │   └── C
    fn sample() -> (CategoryArena, Index, Index, Index) {
        let mut arena = CategoryArena::new();
        let a = arena.insert_node(CategoryRecord::new("a", "A"), None);
        let b = arena.insert_node(CategoryRecord::new("b", "B").with_parent("a"), Some(a));
        let c = arena.insert_node(CategoryRecord::new("c", "C").with_parent("b"), Some(b));
        arena.insert_node(CategoryRecord::new("d", "D"), None);
        (arena, a, b, c)
    }

    #[test]
    fn given_forest_when_iterating_then_preorder_with_levels() {
        let (arena, _, _, _) = sample();
        let visited: Vec<(String, usize)> = arena
            .iter()
            .map(|(_, n, level)| (n.data.name.clone(), level))
            .collect();

        assert_eq!(
            visited,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 1),
                ("C".to_string(), 2),
                ("D".to_string(), 0)
            ]
        );
    }

    #[test]
    fn given_forest_when_postorder_then_children_before_parents() {
        let (arena, _, _, _) = sample();
        let names: Vec<&str> = arena
            .iter_postorder()
            .map(|(_, n)| n.data.name.as_str())
            .collect();

        assert_eq!(names, vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn given_forest_when_measuring_then_depth_and_leaves_match() {
        let (arena, _, _, _) = sample();

        assert_eq!(arena.depth(), 3);
        assert_eq!(arena.leaf_nodes(), vec!["C".to_string(), "D".to_string()]);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn given_node_when_collecting_ancestors_then_root_first() {
        let (arena, a, b, c) = sample();

        assert_eq!(arena.ancestors(c), vec![a, b]);
        assert!(arena.ancestors(a).is_empty());
        assert_eq!(arena.find(&CategoryId::from("c")), Some(c));
    }

    #[test]
    fn given_forest_when_converting_to_tree_then_nesting_is_preserved() {
        let (arena, _, _, _) = sample();
        let tree = arena.to_tree();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name(), "A");
        assert_eq!(tree[0].children[0].name(), "B");
        assert_eq!(tree[0].children[0].children[0].name(), "C");
        assert!(!tree[1].has_children());
    }

    #[test]
    fn given_empty_arena_then_depth_is_zero() {
        let arena = CategoryArena::new();

        assert_eq!(arena.depth(), 0);
        assert!(arena.is_empty());
        assert!(arena.to_tree().is_empty());
    }
}
