use crate::archive::ArchiveError;
use crate::replication::{InvalidTransition, NodeId};
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A replicated frame did not directly follow the archived log. The log is missing or
    /// duplicating an entry; the node must not keep replicating.
    #[error("Archive inconsistency: expected position {expected}, replicated frame is at {actual}")]
    ArchiveInconsistency { expected: u64, actual: u64 },

    #[error("Archive failure")]
    Archive(#[source] ArchiveError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Only returned by explicitly requested transitions. Poll-driven transitions retry instead.
    #[error("Failed to open streams for the new role")]
    Transport(#[from] TransportError),

    #[error("Node {0} is halted after a fatal error")]
    Halted(NodeId),

    #[error("Node {0} has closed its streams")]
    Closed(NodeId),
}

impl From<ArchiveError> for NodeError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::PositionMismatch { expected, actual } => NodeError::ArchiveInconsistency { expected, actual },
            other => NodeError::Archive(other),
        }
    }
}

impl NodeError {
    /// Fatal errors halt the node.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, NodeError::Transport(_) | NodeError::Closed(_))
    }
}
