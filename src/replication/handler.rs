use crate::replication::{NodeId, Term};

/// Where a committed fragment came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClusterHeader {
    /// Stream position immediately after the fragment.
    pub position: u64,
    /// The node delivering it.
    pub node_id: NodeId,
    /// Leadership term in effect when it was delivered.
    pub leadership_term: Term,
}

/// Downstream consumer of the replicated log. Only ever sees fragments at or below the commit
/// position, exactly once each and in position order.
pub trait ClusterFragmentHandler: Send {
    fn on_fragment(&mut self, buffer: &[u8], header: ClusterHeader);
}

impl<F> ClusterFragmentHandler for F
where
    F: FnMut(&[u8], ClusterHeader) + Send,
{
    fn on_fragment(&mut self, buffer: &[u8], header: ClusterHeader) {
        self(buffer, header)
    }
}
