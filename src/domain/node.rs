//! Tree node storage record and child positions.

use std::fmt;

use generational_arena::Index;

use crate::domain::error::{TreeError, TreeResult};

/// Handle to a node inside a tree's allocator.
///
/// Generational: once the slot is released the handle goes stale and is
/// treated as an absent reference everywhere.
pub type NodeId = Index;

/// Raw mode bit selecting the left child slot.
pub const POSITION_LEFT: i32 = 0x01;
/// Raw mode bit pattern selecting the right child slot.
pub const POSITION_RIGHT: i32 = 0x00;
const POSITION_MASK: i32 = POSITION_LEFT | POSITION_RIGHT;

/// Child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Left,
    Right,
}

impl Position {
    /// Parse a raw integer mode. Any bit outside the recognised mask is rejected.
    pub fn from_mode(mode: i32) -> TreeResult<Self> {
        if mode & !POSITION_MASK != 0 {
            return Err(TreeError::WrongPosition(mode));
        }
        match mode & POSITION_MASK {
            POSITION_LEFT => Ok(Position::Left),
            _ => Ok(Position::Right),
        }
    }

    pub fn mode(self) -> i32 {
        match self {
            Position::Left => POSITION_LEFT,
            Position::Right => POSITION_RIGHT,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Left => write!(f, "left"),
            Position::Right => write!(f, "right"),
        }
    }
}

impl TryFrom<i32> for Position {
    type Error = TreeError;

    fn try_from(mode: i32) -> TreeResult<Self> {
        Position::from_mode(mode)
    }
}

/// One vertex of a binary tree.
///
/// Links are only changed through [`BinaryTree`](crate::domain::BinaryTree),
/// which keeps `parent` and the parent's child slot in agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<T> {
    /// Back-reference to the parent; never owns it
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// Caller payload, never inspected by the tree
    pub(crate) data: Option<T>,
}

impl<T> Default for TreeNode<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TreeNode<T> {
    /// An empty node: no links, no payload.
    pub fn new() -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            data: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn child(&self, position: Position) -> Option<NodeId> {
        match position {
            Position::Left => self.left,
            Position::Right => self.right,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.is_leaf() && self.data.is_none()
    }

    pub(crate) fn slot_mut(&mut self, position: Position) -> &mut Option<NodeId> {
        match position {
            Position::Left => &mut self.left,
            Position::Right => &mut self.right,
        }
    }

    /// Clear every field, handing back the payload.
    pub(crate) fn reset(&mut self) -> Option<T> {
        self.parent = None;
        self.left = None;
        self.right = None;
        self.data.take()
    }
}
