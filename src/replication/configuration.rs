use crate::replication::{IdlePolicy, NodeId};
use crate::transport::StreamIdentifier;
use std::collections::BTreeSet;

/// The four streams a cluster uses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterStreams {
    /// Vote requests, vote replies and heartbeats.
    pub control: StreamIdentifier,
    /// The replicated log itself. Written only by the leader.
    pub data: StreamIdentifier,
    /// Follower acknowledgements of archived positions.
    pub acknowledgement: StreamIdentifier,
    /// Node-local stream of framed FIX traffic the leader relays into the data stream.
    pub inbound: StreamIdentifier,
}

/// Immutable snapshot of how a node is set up. Created once at startup.
#[derive(Clone, Debug)]
pub struct RaftNodeConfiguration {
    node_id: NodeId,
    other_nodes: BTreeSet<NodeId>,
    timeout_interval_ms: u64,
    heartbeat_interval_ms: u64,
    streams: ClusterStreams,
    max_claim_attempts: usize,
    idle_policy: IdlePolicy,
}

impl RaftNodeConfiguration {
    pub(crate) fn new(
        node_id: NodeId,
        other_nodes: BTreeSet<NodeId>,
        timeout_interval_ms: u64,
        heartbeat_interval_ms: u64,
        streams: ClusterStreams,
        max_claim_attempts: usize,
        idle_policy: IdlePolicy,
    ) -> Self {
        debug_assert!(!other_nodes.contains(&node_id));
        RaftNodeConfiguration {
            node_id,
            other_nodes,
            timeout_interval_ms,
            heartbeat_interval_ms,
            streams,
            max_claim_attempts,
            idle_policy,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn other_nodes(&self) -> &BTreeSet<NodeId> {
        &self.other_nodes
    }

    pub fn cluster_size(&self) -> usize {
        self.other_nodes.len() + 1
    }

    /// Votes needed to win an election, our own included.
    pub fn election_quorum(&self) -> usize {
        (self.cluster_size() / 2) + 1
    }

    pub fn timeout_interval_ms(&self) -> u64 {
        self.timeout_interval_ms
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    pub fn streams(&self) -> &ClusterStreams {
        &self.streams
    }

    pub fn max_claim_attempts(&self) -> usize {
        self.max_claim_attempts
    }

    pub fn idle_policy(&self) -> IdlePolicy {
        self.idle_policy
    }

    pub(crate) fn is_member(&self, node_id: NodeId) -> bool {
        node_id == self.node_id || self.other_nodes.contains(&node_id)
    }
}
