use crate::replication::NodeId;

/// Decides which position is committed given every node's acknowledged position.
///
/// Implementations must be pure: with non-decreasing inputs the output never decreases.
pub trait AcknowledgementStrategy: Send {
    /// `positions` holds one entry per cluster member, the leader's own durable position included.
    /// Implementations may reorder it.
    fn commit_position(&self, positions: &mut [u64]) -> u64;
}

/// Committed once a quorum of nodes hold the position. The quorum defaults to a strict majority of
/// the cluster.
#[derive(Copy, Clone, Debug, Default)]
pub struct QuorumAcknowledgementStrategy {
    quorum_size: Option<usize>,
}

impl QuorumAcknowledgementStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the quorum instead of deriving it from the cluster size. Clamped to the cluster size.
    pub fn with_quorum_size(quorum_size: usize) -> Self {
        assert!(quorum_size > 0, "Quorum must include at least one node");
        QuorumAcknowledgementStrategy {
            quorum_size: Some(quorum_size),
        }
    }

    fn quorum(&self, cluster_size: usize) -> usize {
        match self.quorum_size {
            Some(size) => size.min(cluster_size),
            None => (cluster_size / 2) + 1,
        }
    }
}

impl AcknowledgementStrategy for QuorumAcknowledgementStrategy {
    fn commit_position(&self, positions: &mut [u64]) -> u64 {
        if positions.is_empty() {
            return 0;
        }

        // Highest first: the quorum-th highest position is held by exactly `quorum` nodes or more.
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions[self.quorum(positions.len()) - 1]
    }
}

/// Committed only once every node holds the position.
#[derive(Copy, Clone, Debug, Default)]
pub struct EntireClusterAcknowledgementStrategy;

impl AcknowledgementStrategy for EntireClusterAcknowledgementStrategy {
    fn commit_position(&self, positions: &mut [u64]) -> u64 {
        positions.iter().copied().min().unwrap_or(0)
    }
}

/// Highest acknowledged position per peer, for one leadership term. One slot per peer, written
/// only by the leader's poll.
pub(crate) struct AcknowledgementTable {
    slots: Vec<(NodeId, u64)>,
    scratch: Vec<u64>,
}

impl AcknowledgementTable {
    pub(crate) fn new<'a>(peers: impl Iterator<Item = &'a NodeId>) -> Self {
        let slots: Vec<_> = peers.map(|peer| (*peer, 0)).collect();
        let scratch = Vec::with_capacity(slots.len() + 1);
        AcknowledgementTable { slots, scratch }
    }

    /// Ratchet `peer`'s slot forward. Returns false for an unknown peer.
    pub(crate) fn acknowledge(&mut self, peer: NodeId, position: u64) -> bool {
        match self.slots.iter_mut().find(|(id, _)| *id == peer) {
            Some((_, acked)) => {
                if position > *acked {
                    *acked = position;
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn position_of(&self, peer: NodeId) -> Option<u64> {
        self.slots.iter().find(|(id, _)| *id == peer).map(|(_, acked)| *acked)
    }

    pub(crate) fn commit_position(&mut self, own_position: u64, strategy: &dyn AcknowledgementStrategy) -> u64 {
        self.scratch.clear();
        self.scratch.push(own_position);
        self.scratch.extend(self.slots.iter().map(|(_, acked)| *acked));
        strategy.commit_position(&mut self.scratch)
    }
}
