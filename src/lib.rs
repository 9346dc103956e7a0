//! Generic binary tree nodes.
//!
//! Nodes hold a caller payload and up to two children, with a non-owning
//! parent link. Insertion position is always explicit: this is not a search
//! tree. Storage is injected through [`NodeAllocator`], either allocator-backed
//! ([`ArenaAllocator`]) or a caller-sized pool ([`RetainedAllocator`]).
//!
//! ```
//! use bintree::{BinaryTree, Position, Visit};
//!
//! let mut tree = BinaryTree::new();
//! let root = tree.create_node_with(2).unwrap();
//! let left = tree.create_node_with(1).unwrap();
//! let right = tree.create_node_with(3).unwrap();
//! tree.append(root, left, Position::Left).unwrap();
//! tree.append(root, right, Position::Right).unwrap();
//!
//! let mut seen = Vec::new();
//! tree.traverse_in_order(root, &mut |data: Option<&i32>| {
//!     seen.extend(data.copied());
//!     Visit::Continue
//! })
//! .unwrap();
//! assert_eq!(seen, vec![1, 2, 3]);
//! assert_eq!(tree.depth(root), 2);
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use config::{StorageMode, TreeSettings};
pub use domain::{
    BinaryTree, ErrorKind, NodeId, Order, Position, TreeError, TreeNode, TreeResult, Visit,
    Visitor, POSITION_LEFT, POSITION_RIGHT,
};
pub use infrastructure::{ArenaAllocator, NodeAllocator, RetainedAllocator};
pub use tree_traits::TreeDisplay;

#[cfg(test)]
mod tests {
    use crate::util::testing;

    #[ctor::ctor]
    fn init() {
        testing::init_test_setup();
    }
}
