mod acknowledgement;
mod candidate;
mod configuration;
mod context;
mod counters;
mod error;
mod follower;
mod handler;
mod idle_strategy;
mod leader;
mod messages;
mod node;
mod peers;
mod raft_publication;
mod role;
mod role_change_listener;
mod streams;
mod term_state;
#[cfg(test)]
mod test_utils;

pub use acknowledgement::{AcknowledgementStrategy, EntireClusterAcknowledgementStrategy, QuorumAcknowledgementStrategy};
pub use configuration::{ClusterStreams, RaftNodeConfiguration};
pub use counters::FailCounter;
pub use error::NodeError;
pub use handler::{ClusterFragmentHandler, ClusterHeader};
pub use idle_strategy::{
    BackoffIdleStrategy, BusySpinIdleStrategy, IdlePolicy, IdleStrategy, NoOpIdleStrategy, YieldingIdleStrategy,
};
pub use messages::{
    control_message, AcknowledgementStatus, ConsensusHeartbeat, ControlFrameError, ControlMessage,
    MessageAcknowledgement, ReplyVote, RequestVote, Vote,
};
pub use node::RaftNode;
pub(crate) use node::RaftNodeParts;
pub use peers::NodeId;
pub use raft_publication::{PublishFailure, RaftPublication};
pub use role::{InvalidTransition, RoleKind, Transition};
pub(crate) use role::RoleOutcome;
pub use role_change_listener::{RoleChange, RoleChangeListener};
pub use term_state::{Term, TermState};
