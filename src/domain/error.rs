//! Tree errors and their coarse kinds

use thiserror::Error;

use crate::domain::node::{NodeId, Position};

/// Coarse error classes with stable numeric codes. `0` is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Failure,
    InvalidReference,
    OutOfMemory,
    WrongParameter,
    NodeExists,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Failure => 1,
            ErrorKind::InvalidReference => 2,
            ErrorKind::OutOfMemory => 3,
            ErrorKind::WrongParameter => 4,
            ErrorKind::NodeExists => 5,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node still has children: {0:?}")]
    NotALeaf(NodeId),

    #[error("node handle is empty")]
    EmptyHandle,

    #[error("node {node:?} is already linked below {parent:?}")]
    AlreadyLinked { node: NodeId, parent: NodeId },

    #[error("append would create a cycle through: {0:?}")]
    CycleDetected(NodeId),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid node reference: {0:?}")]
    InvalidReference(NodeId),

    #[error("out of node storage (capacity {capacity})")]
    OutOfMemory { capacity: usize },

    #[error("invalid child position mode: {0:#x}")]
    WrongPosition(i32),

    #[error("{position} child of {parent:?} is already occupied")]
    NodeExists { parent: NodeId, position: Position },
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::NotALeaf(_)
            | TreeError::EmptyHandle
            | TreeError::AlreadyLinked { .. }
            | TreeError::CycleDetected(_)
            | TreeError::Config { .. } => ErrorKind::Failure,
            TreeError::InvalidReference(_) => ErrorKind::InvalidReference,
            TreeError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            TreeError::WrongPosition(_) => ErrorKind::WrongParameter,
            TreeError::NodeExists { .. } => ErrorKind::NodeExists,
        }
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
