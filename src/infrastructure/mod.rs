//! Infrastructure layer: node storage implementations
//!
//! Implements the allocator boundary the tree depends on.

pub mod allocator;

pub use allocator::{ArenaAllocator, NodeAllocator, RetainedAllocator};
