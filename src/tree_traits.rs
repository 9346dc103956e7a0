use std::collections::HashMap;
use std::fmt::Display;

use termtree::Tree;
use tracing::instrument;

use crate::domain::node::{NodeId, TreeNode};
use crate::domain::tree::BinaryTree;
use crate::infrastructure::allocator::NodeAllocator;

/// Render a subtree for diagnostics.
pub trait TreeDisplay {
    fn to_tree_string(&self, root: NodeId) -> Tree<String>;
}

impl<T: Display, A: NodeAllocator<T>> TreeDisplay for BinaryTree<T, A> {
    /// Children are labelled `L:` / `R:`; nodes without payload show as `·`.
    /// Built bottom-up from the post-order walk, so no recursion.
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self, root: NodeId) -> Tree<String> {
        if !self.contains(root) {
            return Tree::new("empty tree".to_string());
        }

        let mut built: HashMap<NodeId, Tree<String>> = HashMap::new();
        for (id, node) in self.iter_post_order(root) {
            let leaves: Vec<Tree<String>> = [node.left(), node.right()]
                .into_iter()
                .flatten()
                .filter_map(|child| built.remove(&child))
                .collect();
            let label = if id == root {
                payload_label(node)
            } else {
                format!("{}{}", slot_prefix(self, id, node), payload_label(node))
            };
            built.insert(id, Tree::new(label).with_leaves(leaves));
        }

        built
            .remove(&root)
            .unwrap_or_else(|| Tree::new("empty tree".to_string()))
    }
}

fn payload_label<T: Display>(node: &TreeNode<T>) -> String {
    node.data()
        .map(ToString::to_string)
        .unwrap_or_else(|| "·".to_string())
}

fn slot_prefix<T, A: NodeAllocator<T>>(
    tree: &BinaryTree<T, A>,
    id: NodeId,
    node: &TreeNode<T>,
) -> &'static str {
    match node.parent() {
        Some(parent) if tree.left(parent) == Some(id) => "L: ",
        Some(_) => "R: ",
        None => "",
    }
}
