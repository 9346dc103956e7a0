//! Pre-, in- and post-order traversal.
//!
//! All orders run on an explicit stack, so traversal depth is bounded by heap
//! memory rather than the call stack.

use tracing::{instrument, trace};

use crate::domain::error::TreeResult;
use crate::domain::node::{NodeId, TreeNode};
use crate::domain::tree::BinaryTree;
use crate::infrastructure::allocator::NodeAllocator;

/// Signal a visitor returns for each node.
///
/// Traversals currently ignore it and always cover the whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visit {
    #[default]
    Continue,
    Stop,
}

/// Callback invoked once per visited node with that node's payload.
///
/// Any `FnMut(Option<&T>) -> Visit` closure is a visitor; state captured by
/// the closure serves as the traversal context.
pub trait Visitor<T> {
    fn visit(&mut self, data: Option<&T>) -> Visit;
}

impl<T, F> Visitor<T> for F
where
    F: FnMut(Option<&T>) -> Visit,
{
    fn visit(&mut self, data: Option<&T>) -> Visit {
        self(data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// Root, left, right
    PreOrder,
    /// Left, root, right
    InOrder,
    /// Left, right, root
    PostOrder,
}

impl<T, A: NodeAllocator<T>> BinaryTree<T, A> {
    pub fn iter_pre_order(&self, root: NodeId) -> PreOrderIter<'_, T, A> {
        PreOrderIter::new(self, root)
    }

    pub fn iter_in_order(&self, root: NodeId) -> InOrderIter<'_, T, A> {
        InOrderIter::new(self, root)
    }

    pub fn iter_post_order(&self, root: NodeId) -> PostOrderIter<'_, T, A> {
        PostOrderIter::new(self, root)
    }

    /// Visit every node under `root` in `order`. Returns the number of nodes visited.
    ///
    /// Fails with `InvalidReference`, without calling the visitor, when `root`
    /// is not a live node.
    #[instrument(level = "trace", skip(self, visitor))]
    pub fn traverse<V>(&self, root: NodeId, order: Order, visitor: &mut V) -> TreeResult<usize>
    where
        V: Visitor<T> + ?Sized,
    {
        self.node_or_err(root)?;
        let visited = match order {
            Order::PreOrder => visit_all(self.iter_pre_order(root), visitor),
            Order::InOrder => visit_all(self.iter_in_order(root), visitor),
            Order::PostOrder => visit_all(self.iter_post_order(root), visitor),
        };
        trace!(visited, "traversal finished");
        Ok(visited)
    }

    pub fn traverse_pre_order<V>(&self, root: NodeId, visitor: &mut V) -> TreeResult<usize>
    where
        V: Visitor<T> + ?Sized,
    {
        self.traverse(root, Order::PreOrder, visitor)
    }

    pub fn traverse_in_order<V>(&self, root: NodeId, visitor: &mut V) -> TreeResult<usize>
    where
        V: Visitor<T> + ?Sized,
    {
        self.traverse(root, Order::InOrder, visitor)
    }

    pub fn traverse_post_order<V>(&self, root: NodeId, visitor: &mut V) -> TreeResult<usize>
    where
        V: Visitor<T> + ?Sized,
    {
        self.traverse(root, Order::PostOrder, visitor)
    }
}

fn visit_all<'a, T, V, I>(nodes: I, visitor: &mut V) -> usize
where
    T: 'a,
    V: Visitor<T> + ?Sized,
    I: Iterator<Item = (NodeId, &'a TreeNode<T>)>,
{
    let mut visited = 0;
    for (_, node) in nodes {
        // TODO: honour Visit::Stop once a cancellable traversal variant exists
        let _ = visitor.visit(node.data());
        visited += 1;
    }
    visited
}

pub struct PreOrderIter<'a, T, A> {
    tree: &'a BinaryTree<T, A>,
    stack: Vec<NodeId>,
}

impl<'a, T, A: NodeAllocator<T>> PreOrderIter<'a, T, A> {
    fn new(tree: &'a BinaryTree<T, A>, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(root) {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a, T, A: NodeAllocator<T>> Iterator for PreOrderIter<'a, T, A> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // right goes first so left pops first
                self.stack.extend(node.right);
                self.stack.extend(node.left);
                return Some((current, node));
            }
        }
        None
    }
}

pub struct InOrderIter<'a, T, A> {
    tree: &'a BinaryTree<T, A>,
    stack: Vec<NodeId>,
    /// Next node whose left spine still has to be pushed
    current: Option<NodeId>,
}

impl<'a, T, A: NodeAllocator<T>> InOrderIter<'a, T, A> {
    fn new(tree: &'a BinaryTree<T, A>, root: NodeId) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            current: Some(root).filter(|&id| tree.contains(id)),
        }
    }
}

impl<'a, T, A: NodeAllocator<T>> Iterator for InOrderIter<'a, T, A> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.current {
            self.current = self.tree.node(current).and_then(TreeNode::left);
            self.stack.push(current);
        }
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                self.current = node.right;
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIter<'a, T, A> {
    tree: &'a BinaryTree<T, A>,
    /// (node, children already pushed)
    stack: Vec<(NodeId, bool)>,
}

impl<'a, T, A: NodeAllocator<T>> PostOrderIter<'a, T, A> {
    fn new(tree: &'a BinaryTree<T, A>, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(root) {
            stack.push((root, false));
        }
        Self { tree, stack }
    }
}

impl<'a, T, A: NodeAllocator<T>> Iterator for PostOrderIter<'a, T, A> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, expanded)) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                if expanded {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                self.stack.extend(node.right.map(|id| (id, false)));
                self.stack.extend(node.left.map(|id| (id, false)));
            }
        }
        None
    }
}
