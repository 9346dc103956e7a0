//! Binary tree over an injected node allocator.
//!
//! Every mutating operation validates first and writes second, so a returned
//! error always means nothing changed.

use std::marker::PhantomData;

use tracing::{debug, instrument, trace};

use crate::config::{StorageMode, TreeSettings};
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::node::{NodeId, Position, TreeNode};
use crate::infrastructure::allocator::{ArenaAllocator, NodeAllocator, RetainedAllocator};

/// Graph of [`TreeNode`]s addressed by [`NodeId`].
///
/// A single value may hold several disjoint trees; any node without a parent
/// is a root. The storage strategy is fixed by the allocator chosen at
/// construction.
pub struct BinaryTree<T, A = ArenaAllocator<T>> {
    nodes: A,
    _payload: PhantomData<T>,
}

impl<T> Default for BinaryTree<T, ArenaAllocator<T>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BinaryTree<T, ArenaAllocator<T>> {
    /// Allocator-backed tree without a node limit.
    pub fn new() -> Self {
        Self::with_allocator(ArenaAllocator::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_allocator(ArenaAllocator::with_capacity(capacity))
    }
}

impl<T> BinaryTree<T, RetainedAllocator<T>> {
    /// Caller-managed tree over a fixed pool of `slots` nodes.
    pub fn with_slots(slots: usize) -> Self {
        Self::with_allocator(RetainedAllocator::with_slots(slots))
    }
}

impl<T: 'static> BinaryTree<T, Box<dyn NodeAllocator<T>>> {
    /// Build a tree whose storage strategy comes from configuration.
    pub fn from_settings(settings: &TreeSettings) -> Self {
        let nodes: Box<dyn NodeAllocator<T>> = match (settings.storage, settings.capacity) {
            (StorageMode::Allocated, Some(capacity)) => {
                Box::new(ArenaAllocator::with_capacity(capacity))
            }
            (StorageMode::Allocated, None) => Box::new(ArenaAllocator::new()),
            (StorageMode::CallerManaged, _) => {
                Box::new(RetainedAllocator::with_slots(settings.pool_slots()))
            }
        };
        debug!(storage = ?settings.storage, capacity = ?settings.capacity, "tree built from settings");
        Self::with_allocator(nodes)
    }
}

impl<T, A: NodeAllocator<T>> BinaryTree<T, A> {
    pub fn with_allocator(nodes: A) -> Self {
        Self {
            nodes,
            _payload: PhantomData,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.nodes
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.nodes.storage_mode()
    }

    /// Number of live nodes across all trees in this value.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.nodes.get(id)
    }

    pub(crate) fn node_or_err(&self, id: NodeId) -> TreeResult<&TreeNode<T>> {
        self.nodes.get(id).ok_or(TreeError::InvalidReference(id))
    }

    fn node_mut_or_err(&mut self, id: NodeId) -> TreeResult<&mut TreeNode<T>> {
        self.nodes.get_mut(id).ok_or(TreeError::InvalidReference(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(TreeNode::parent)
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(TreeNode::left)
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(TreeNode::right)
    }

    pub fn child(&self, id: NodeId, position: Position) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.child(position))
    }

    /// Walk the parent chain upwards, nearest ancestor first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Obtain an empty node from the allocator.
    #[instrument(level = "trace", skip(self))]
    pub fn create_node(&mut self) -> TreeResult<NodeId> {
        let id = self.nodes.obtain()?;
        trace!(?id, "node created");
        Ok(id)
    }

    pub fn create_node_with(&mut self, value: T) -> TreeResult<NodeId> {
        let id = self.create_node()?;
        self.node_mut_or_err(id)?.data = Some(value);
        Ok(id)
    }

    /// Reset a node to the empty state and hand back its payload.
    ///
    /// A linked node is detached first: its parent's slot is cleared and its
    /// children become roots. Calling this on an empty node is a no-op.
    #[instrument(level = "trace", skip(self))]
    pub fn init(&mut self, id: NodeId) -> TreeResult<Option<T>> {
        let node = self.node_or_err(id)?;
        let (parent, left, right) = (node.parent, node.left, node.right);

        self.detach_from_parent(id, parent);
        for child in [left, right].into_iter().flatten() {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = None;
            }
        }
        Ok(self.node_mut_or_err(id)?.reset())
    }

    /// Store `value` in the node, returning whatever was there before.
    #[instrument(level = "trace", skip(self, value))]
    pub fn set_value(&mut self, id: NodeId, value: T) -> TreeResult<Option<T>> {
        Ok(self.node_mut_or_err(id)?.data.replace(value))
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id).and_then(TreeNode::data)
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id).and_then(|node| node.data.as_mut())
    }

    /// Link `child` below `parent` at `position`.
    ///
    /// Occupied slots are never overwritten. `child` must be a root and must
    /// not be `parent` or one of its ancestors.
    #[instrument(level = "trace", skip(self))]
    pub fn append(&mut self, parent: NodeId, child: NodeId, position: Position) -> TreeResult<()> {
        let parent_node = self.node_or_err(parent)?;
        let child_node = self.node_or_err(child)?;

        if parent_node.child(position).is_some() {
            debug!(?parent, %position, "child slot occupied");
            return Err(TreeError::NodeExists { parent, position });
        }
        if let Some(existing) = child_node.parent {
            debug!(?child, ?existing, "node already has a parent");
            return Err(TreeError::AlreadyLinked {
                node: child,
                parent: existing,
            });
        }
        // only a node with children can be an ancestor of `parent`
        let closes_cycle = child == parent
            || (!child_node.is_leaf() && self.ancestors(parent).any(|ancestor| ancestor == child));
        if closes_cycle {
            debug!(?parent, ?child, "append would close a cycle");
            return Err(TreeError::CycleDetected(child));
        }

        *self.node_mut_or_err(parent)?.slot_mut(position) = Some(child);
        self.node_mut_or_err(child)?.parent = Some(parent);
        Ok(())
    }

    /// [`append`](Self::append) with a raw position mode (`0x01` left, `0x00` right).
    pub fn append_with_mode(&mut self, parent: NodeId, child: NodeId, mode: i32) -> TreeResult<()> {
        self.node_or_err(parent)?;
        self.node_or_err(child)?;
        let position = Position::from_mode(mode)?;
        self.append(parent, child, position)
    }

    /// Unlink a leaf from its parent and reset it. Storage is kept.
    #[instrument(level = "trace", skip(self))]
    pub fn delete_leaf(&mut self, id: NodeId) -> TreeResult<Option<T>> {
        let node = self.node_or_err(id)?;
        if !node.is_leaf() {
            debug!(?id, "refusing to delete a node with children");
            return Err(TreeError::NotALeaf(id));
        }
        let parent = node.parent;

        self.detach_from_parent(id, parent);
        Ok(self.node_mut_or_err(id)?.reset())
    }

    /// Delete a leaf, release its storage and clear the caller's handle.
    #[instrument(level = "trace", skip(self))]
    pub fn destroy_node(&mut self, handle: &mut Option<NodeId>) -> TreeResult<Option<T>> {
        let id = handle.ok_or(TreeError::EmptyHandle)?;
        let data = self.delete_leaf(id)?;
        self.nodes.release(id)?;
        *handle = None;
        Ok(data)
    }

    /// Tear down the subtree under `handle` in post-order and clear the handle.
    ///
    /// Payloads are dropped with their nodes. Returns the number of nodes deleted.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&mut self, handle: &mut Option<NodeId>) -> TreeResult<usize> {
        let root = handle.ok_or(TreeError::EmptyHandle)?;
        self.node_or_err(root)?;

        let order: Vec<NodeId> = self.iter_post_order(root).map(|(id, _)| id).collect();
        for &id in &order {
            // children precede their parent, so every node is a leaf by now
            self.delete_leaf(id)?;
            self.nodes.release(id)?;
        }
        *handle = None;

        debug!(deleted = order.len(), "subtree deleted");
        Ok(order.len())
    }

    /// Height of the subtree: 0 when absent, otherwise `1 + max(left, right)`.
    #[instrument(level = "trace", skip(self, node))]
    pub fn depth(&self, node: impl Into<Option<NodeId>>) -> usize {
        let node: Option<NodeId> = node.into();
        let Some(root) = node.filter(|&id| self.contains(id)) else {
            return 0;
        };

        let mut max_depth = 0;
        let mut stack = vec![(root, 1)]; // (node, depth)
        while let Some((current, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.nodes.get(current) {
                for child in [node.left, node.right].into_iter().flatten() {
                    stack.push((child, depth + 1));
                }
            }
        }
        max_depth
    }

    fn detach_from_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        let Some(parent) = parent else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            // a node should sit in at most one slot; clear both anyway
            if parent.left == Some(id) {
                parent.left = None;
            }
            if parent.right == Some(id) {
                parent.right = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    //      2
    //     / \
    //    1   3
    #[fixture]
    fn small_tree() -> (BinaryTree<i32>, NodeId, NodeId, NodeId) {
        let mut tree = BinaryTree::new();
        let root = tree.create_node_with(2).unwrap();
        let left = tree.create_node_with(1).unwrap();
        let right = tree.create_node_with(3).unwrap();
        tree.append(root, left, Position::Left).unwrap();
        tree.append(root, right, Position::Right).unwrap();
        (tree, root, left, right)
    }

    #[test]
    fn test_created_node_is_empty() {
        let mut tree: BinaryTree<i32> = BinaryTree::new();
        let id = tree.create_node().unwrap();
        assert!(tree.node(id).unwrap().is_empty());
        assert_eq!(tree.depth(id), 1);
        assert_eq!(tree.depth(None), 0);
    }

    #[rstest]
    fn test_append_links_both_directions(small_tree: (BinaryTree<i32>, NodeId, NodeId, NodeId)) {
        let (tree, root, left, right) = small_tree;
        assert_eq!(tree.child(root, Position::Left), Some(left));
        assert_eq!(tree.child(root, Position::Right), Some(right));
        assert_eq!(tree.parent(left), Some(root));
        assert_eq!(tree.parent(right), Some(root));
    }

    #[rstest]
    fn test_init_detaches_linked_node(small_tree: (BinaryTree<i32>, NodeId, NodeId, NodeId)) {
        let (mut tree, root, left, right) = small_tree;
        assert_eq!(tree.init(root).unwrap(), Some(2));
        assert!(tree.node(root).unwrap().is_empty());
        assert_eq!(tree.parent(left), None);
        assert_eq!(tree.parent(right), None);

        assert_eq!(tree.init(left).unwrap(), Some(1));
        assert_eq!(tree.init(left).unwrap(), None);
        assert!(tree.node(left).unwrap().is_empty());
    }

    #[test]
    fn test_append_self_is_a_cycle() {
        let mut tree: BinaryTree<i32> = BinaryTree::new();
        let id = tree.create_node().unwrap();
        assert_eq!(
            tree.append(id, id, Position::Left),
            Err(TreeError::CycleDetected(id))
        );
        assert!(tree.node(id).unwrap().is_empty());
    }

    #[rstest]
    fn test_append_ancestor_below_descendant_is_a_cycle(
        small_tree: (BinaryTree<i32>, NodeId, NodeId, NodeId),
    ) {
        let (mut tree, root, left, _) = small_tree;
        assert_eq!(
            tree.append(left, root, Position::Left),
            Err(TreeError::CycleDetected(root))
        );
        assert_eq!(tree.left(left), None);
        assert_eq!(tree.parent(root), None);
    }

    #[rstest]
    fn test_ancestors_walk_to_root(small_tree: (BinaryTree<i32>, NodeId, NodeId, NodeId)) {
        let (mut tree, root, left, _) = small_tree;
        let grandchild = tree.create_node().unwrap();
        tree.append(left, grandchild, Position::Right).unwrap();
        let chain: Vec<NodeId> = tree.ancestors(grandchild).collect();
        assert_eq!(chain, vec![left, root]);
    }

    #[test]
    fn test_set_value_hands_back_previous() {
        let mut tree = BinaryTree::new();
        let id = tree.create_node_with("old".to_string()).unwrap();
        assert_eq!(tree.set_value(id, "new".to_string()).unwrap(), Some("old".to_string()));
        tree.value_mut(id).unwrap().push('!');
        assert_eq!(tree.value(id).map(String::as_str), Some("new!"));
    }

    #[test]
    fn test_from_settings_picks_storage() {
        let settings = TreeSettings {
            storage: StorageMode::CallerManaged,
            capacity: Some(2),
        };
        let mut tree: BinaryTree<u8, Box<dyn NodeAllocator<u8>>> =
            BinaryTree::from_settings(&settings);
        assert_eq!(tree.storage_mode(), StorageMode::CallerManaged);
        tree.create_node().unwrap();
        tree.create_node().unwrap();
        assert_eq!(tree.create_node(), Err(TreeError::OutOfMemory { capacity: 2 }));
    }
}
