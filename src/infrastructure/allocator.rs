//! Node storage boundary
//!
//! The tree only ever talks to its storage through [`NodeAllocator`], so the
//! allocation strategy can be swapped without touching tree logic.

use generational_arena::Arena;
use tracing::{debug, instrument};

use crate::config::StorageMode;
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::node::{NodeId, TreeNode};

/// Node storage collaborator.
pub trait NodeAllocator<T> {
    /// Hand out an empty node.
    fn obtain(&mut self) -> TreeResult<NodeId>;

    /// Give a node's storage back. The node must already be unlinked.
    fn release(&mut self, id: NodeId) -> TreeResult<()>;

    fn get(&self, id: NodeId) -> Option<&TreeNode<T>>;

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>>;

    /// Number of nodes currently handed out.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn storage_mode(&self) -> StorageMode;
}

impl<T, A: NodeAllocator<T> + ?Sized> NodeAllocator<T> for Box<A> {
    fn obtain(&mut self) -> TreeResult<NodeId> {
        (**self).obtain()
    }

    fn release(&mut self, id: NodeId) -> TreeResult<()> {
        (**self).release(id)
    }

    fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        (**self).get(id)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        (**self).get_mut(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn storage_mode(&self) -> StorageMode {
        (**self).storage_mode()
    }
}

// ============================================================
// ALLOCATOR-BACKED STORAGE
// ============================================================

/// Nodes live in a generational arena; releasing a node frees its slot and
/// stales every handle to it.
#[derive(Debug)]
pub struct ArenaAllocator<T> {
    arena: Arena<TreeNode<T>>,
    /// Node limit, None for unbounded
    capacity: Option<usize>,
}

impl<T> Default for ArenaAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArenaAllocator<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            capacity: None,
        }
    }

    /// Bounded arena: `obtain` fails with `OutOfMemory` once `capacity` nodes are live.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> NodeAllocator<T> for ArenaAllocator<T> {
    #[instrument(level = "trace", skip(self))]
    fn obtain(&mut self) -> TreeResult<NodeId> {
        if let Some(capacity) = self.capacity {
            if self.arena.len() >= capacity {
                debug!(capacity, "arena exhausted");
                return Err(TreeError::OutOfMemory { capacity });
            }
        }
        Ok(self.arena.insert(TreeNode::new()))
    }

    #[instrument(level = "trace", skip(self))]
    fn release(&mut self, id: NodeId) -> TreeResult<()> {
        self.arena
            .remove(id)
            .map(|_| ())
            .ok_or(TreeError::InvalidReference(id))
    }

    fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(id)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        self.arena.get_mut(id)
    }

    fn len(&self) -> usize {
        self.arena.len()
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::Allocated
    }
}

// ============================================================
// CALLER-MANAGED STORAGE
// ============================================================

/// Fixed pool of node slots sized by the caller up front.
///
/// Releasing only resets a node and returns its slot to the pool. A pooled
/// slot is invisible to `get`/`get_mut` until `obtain` hands it out again.
#[derive(Debug)]
pub struct RetainedAllocator<T> {
    arena: Arena<TreeNode<T>>,
    free: Vec<NodeId>,
    /// Indexed by arena slot; true while the slot sits in `free`
    pooled: Vec<bool>,
}

impl<T> RetainedAllocator<T> {
    pub fn with_slots(slots: usize) -> Self {
        let mut arena = Arena::with_capacity(slots);
        let mut free: Vec<NodeId> = (0..slots).map(|_| arena.insert(TreeNode::new())).collect();
        // hand out slots in ascending order
        free.reverse();
        Self {
            arena,
            free,
            pooled: vec![true; slots],
        }
    }

    pub fn slots(&self) -> usize {
        self.arena.len()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    fn is_pooled(&self, id: NodeId) -> bool {
        let (slot, _) = id.into_raw_parts();
        self.pooled.get(slot).copied().unwrap_or(true)
    }

    fn set_pooled(&mut self, id: NodeId, pooled: bool) {
        let (slot, _) = id.into_raw_parts();
        if let Some(flag) = self.pooled.get_mut(slot) {
            *flag = pooled;
        }
    }
}

impl<T> NodeAllocator<T> for RetainedAllocator<T> {
    #[instrument(level = "trace", skip(self))]
    fn obtain(&mut self) -> TreeResult<NodeId> {
        let id = self.free.pop().ok_or_else(|| {
            debug!(slots = self.arena.len(), "node pool exhausted");
            TreeError::OutOfMemory {
                capacity: self.arena.len(),
            }
        })?;
        self.set_pooled(id, false);
        if let Some(node) = self.arena.get_mut(id) {
            node.reset();
        }
        Ok(id)
    }

    #[instrument(level = "trace", skip(self))]
    fn release(&mut self, id: NodeId) -> TreeResult<()> {
        if self.is_pooled(id) {
            debug!(?id, "slot is already in the pool");
            return Err(TreeError::InvalidReference(id));
        }
        let node = self.arena.get_mut(id).ok_or(TreeError::InvalidReference(id))?;
        node.reset();
        self.set_pooled(id, true);
        self.free.push(id);
        Ok(())
    }

    fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        if self.is_pooled(id) {
            return None;
        }
        self.arena.get(id)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        if self.is_pooled(id) {
            return None;
        }
        self.arena.get_mut(id)
    }

    fn len(&self) -> usize {
        self.arena.len() - self.free.len()
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::CallerManaged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_release_stales_handle() {
        let mut alloc: ArenaAllocator<u32> = ArenaAllocator::new();
        let id = alloc.obtain().unwrap();
        assert!(alloc.get(id).is_some());
        alloc.release(id).unwrap();
        assert!(alloc.get(id).is_none());
        assert_eq!(alloc.release(id), Err(TreeError::InvalidReference(id)));
    }

    #[test]
    fn test_arena_capacity_is_enforced() {
        let mut alloc: ArenaAllocator<u32> = ArenaAllocator::with_capacity(2);
        let a = alloc.obtain().unwrap();
        alloc.obtain().unwrap();
        assert_eq!(alloc.obtain(), Err(TreeError::OutOfMemory { capacity: 2 }));
        alloc.release(a).unwrap();
        assert!(alloc.obtain().is_ok());
    }

    #[test]
    fn test_retained_release_pools_slot_until_reissued() {
        let mut alloc: RetainedAllocator<&str> = RetainedAllocator::with_slots(1);
        let id = alloc.obtain().unwrap();
        alloc.get_mut(id).unwrap().data = Some("x");
        assert_eq!(alloc.len(), 1);

        alloc.release(id).unwrap();
        assert!(alloc.get(id).is_none());
        assert!(alloc.get_mut(id).is_none());
        assert_eq!(alloc.len(), 0);
        assert_eq!(alloc.available(), 1);

        let reissued = alloc.obtain().unwrap();
        assert_eq!(reissued, id);
        assert!(alloc.get(reissued).unwrap().is_empty());
    }

    #[test]
    fn test_retained_fresh_pool_slots_are_not_reachable() {
        let mut alloc: RetainedAllocator<u8> = RetainedAllocator::with_slots(2);
        let id = alloc.obtain().unwrap();
        let (slot, generation) = id.into_raw_parts();
        let pooled = NodeId::from_raw_parts(slot + 1, generation);
        assert!(alloc.get(pooled).is_none());
        assert_eq!(alloc.release(pooled), Err(TreeError::InvalidReference(pooled)));
    }

    #[test]
    fn test_retained_pool_exhaustion() {
        let mut alloc: RetainedAllocator<u8> = RetainedAllocator::with_slots(1);
        alloc.obtain().unwrap();
        assert_eq!(alloc.obtain(), Err(TreeError::OutOfMemory { capacity: 1 }));
    }

    #[test]
    fn test_retained_double_release_is_rejected() {
        let mut alloc: RetainedAllocator<u8> = RetainedAllocator::with_slots(2);
        let id = alloc.obtain().unwrap();
        alloc.release(id).unwrap();
        assert_eq!(alloc.release(id), Err(TreeError::InvalidReference(id)));
        assert_eq!(alloc.available(), 2);
    }

    #[test]
    fn test_boxed_allocator_reports_mode() {
        let alloc: Box<dyn NodeAllocator<u8>> = Box::new(RetainedAllocator::with_slots(1));
        assert_eq!(alloc.storage_mode(), StorageMode::CallerManaged);
    }
}
