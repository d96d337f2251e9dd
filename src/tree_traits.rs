//! Terminal tree rendering and nested JSON output for category hierarchies.
//!
//! Nothing here recurses per nesting level: trees are assembled bottom-up
//! and JSON is written from an explicit stack.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::ops::Deref;

use generational_arena::Index;
use termtree::Tree;

use crate::domain::{CategoryArena, CategoryNode, CategoryRecord};

/// Label shown for one category: its name with the id in brackets.
pub fn label(record: &CategoryRecord) -> String {
    format!("{} [{}]", record.name, record.id)
}

/// A termtree drawing of categories.
///
/// Dropping it dismantles the leaves from a worklist.
pub struct RenderedTree(Tree<String>);

impl Deref for RenderedTree {
    type Target = Tree<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for RenderedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Drop for RenderedTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.0.leaves);
        while let Some(mut leaf) = pending.pop() {
            pending.append(&mut leaf.leaves);
        }
    }
}

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> RenderedTree;
}

impl TreeNodeConvert for CategoryNode {
    fn to_tree_string(&self) -> RenderedTree {
        // Pre-order with parent positions, then assemble in reverse.
        let mut order: Vec<(&CategoryNode, Option<usize>)> = Vec::new();
        let mut stack = vec![(self, None)];
        while let Some((node, parent)) = stack.pop() {
            let pos = order.len();
            order.push((node, parent));
            stack.extend(node.children.iter().rev().map(|c| (c, Some(pos))));
        }

        let mut leaves: Vec<Vec<Tree<String>>> = order.iter().map(|_| Vec::new()).collect();
        let mut root = Tree::new(String::new());
        for (pos, (node, parent)) in order.iter().enumerate().rev() {
            let mut children = std::mem::take(&mut leaves[pos]);
            children.reverse();
            let tree = Tree::new(label(&node.record)).with_leaves(children);
            match parent {
                Some(parent) => leaves[*parent].push(tree),
                None => root = tree,
            }
        }
        RenderedTree(root)
    }
}

// A forest renders under a synthetic root so all top-level categories line up.
impl TreeNodeConvert for CategoryArena {
    fn to_tree_string(&self) -> RenderedTree {
        let mut built: HashMap<Index, Tree<String>> = HashMap::with_capacity(self.len());

        for (idx, node) in self.iter_postorder() {
            let leaves: Vec<_> = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(idx, Tree::new(label(&node.data)).with_leaves(leaves));
        }

        let leaves: Vec<_> = self
            .roots()
            .iter()
            .filter_map(|root| built.remove(root))
            .collect();
        RenderedTree(Tree::new(format!("categories ({})", self.len())).with_leaves(leaves))
    }
}

enum JsonStep<'a> {
    Node { node: &'a CategoryNode, first: bool },
    CloseChildren,
}

fn push_siblings<'a>(stack: &mut Vec<JsonStep<'a>>, nodes: &'a [CategoryNode]) {
    for (i, node) in nodes.iter().enumerate().rev() {
        stack.push(JsonStep::Node {
            node,
            first: i == 0,
        });
    }
}

/// Write `nodes` as comma-separated JSON objects, children nested.
///
/// Same shape as serializing the nodes with serde: the record fields
/// flattened, `children` omitted for leaves.
fn write_siblings<W: Write>(nodes: &[CategoryNode], out: &mut W) -> io::Result<()> {
    let mut stack = Vec::new();
    push_siblings(&mut stack, nodes);

    while let Some(step) = stack.pop() {
        match step {
            JsonStep::Node { node, first } => {
                if !first {
                    out.write_all(b",")?;
                }
                let record = serde_json::to_string(&node.record).map_err(io::Error::other)?;
                if node.has_children() {
                    // Reopen the record object to append its children.
                    let open = record.strip_suffix('}').unwrap_or(&record);
                    out.write_all(open.as_bytes())?;
                    out.write_all(b",\"children\":[")?;
                    stack.push(JsonStep::CloseChildren);
                    push_siblings(&mut stack, &node.children);
                } else {
                    out.write_all(record.as_bytes())?;
                }
            }
            JsonStep::CloseChildren => out.write_all(b"]}")?,
        }
    }
    Ok(())
}

/// Write a forest as a JSON array.
pub fn write_tree_json<W: Write>(nodes: &[CategoryNode], out: &mut W) -> io::Result<()> {
    out.write_all(b"[")?;
    write_siblings(nodes, out)?;
    out.write_all(b"]")
}

/// Write one node with its subtree as a JSON object.
pub fn write_node_json<W: Write>(node: &CategoryNode, out: &mut W) -> io::Result<()> {
    write_siblings(std::slice::from_ref(node), out)
}
