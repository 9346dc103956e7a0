//! Domain layer: tree nodes, linkage operations and traversal
//!
//! Independent of where node storage comes from; see [`crate::infrastructure`].

pub mod error;
pub mod node;
pub mod traversal;
pub mod tree;

pub use error::{ErrorKind, TreeError, TreeResult};
pub use node::{NodeId, Position, TreeNode, POSITION_LEFT, POSITION_RIGHT};
pub use traversal::{InOrderIter, Order, PostOrderIter, PreOrderIter, Visit, Visitor};
pub use tree::BinaryTree;
