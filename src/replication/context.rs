use crate::archive::Archive;
use crate::replication::{
    AcknowledgementStrategy, ClusterFragmentHandler, ClusterHeader, NodeError, NodeId,
    RaftNodeConfiguration, TermState,
};
use crate::transport::Header;

/// Everything a role may touch during one poll. The node lends it out for the duration of the call,
/// so only the active role ever mutates the term state or the archive.
pub(crate) struct RoleContext<'a> {
    pub(crate) configuration: &'a RaftNodeConfiguration,
    pub(crate) term_state: &'a mut TermState,
    pub(crate) archive: &'a mut dyn Archive,
    pub(crate) fragment_handler: &'a mut dyn ClusterFragmentHandler,
    pub(crate) acknowledgement_strategy: &'a dyn AcknowledgementStrategy,
    pub(crate) logger: &'a slog::Logger,
    /// Inbound stream position already relayed into the data stream by this node.
    pub(crate) relayed_inbound_position: &'a mut u64,
}

impl<'a> RoleContext<'a> {
    pub(crate) fn node_id(&self) -> NodeId {
        self.configuration.node_id()
    }

    /// The cluster member a message names, if it names one.
    pub(crate) fn member(&self, id: u32) -> Option<NodeId> {
        NodeId::from_u32(id).filter(|node_id| self.configuration.is_member(*node_id))
    }

    /// Archive a data stream fragment and advance the received position.
    ///
    /// Returns the new received position, or `None` if the fragment was already archived (the
    /// transport delivers at least once).
    pub(crate) fn archive_fragment(&mut self, data: &[u8], header: Header) -> Result<Option<u64>, NodeError> {
        if header.position <= self.term_state.received_position() {
            return Ok(None);
        }

        if let Err(e) = self.archive.append(header.position, data) {
            let e = NodeError::from(e);
            slog::error!(
                self.logger,
                "Failed to archive fragment at {}, received position {}: {}",
                header.position,
                self.term_state.received_position(),
                e
            );
            return Err(e);
        }

        self.term_state.advance_received_position(header.position);
        Ok(Some(header.position))
    }

    /// Hand every archived and committed frame not yet applied to the fragment handler.
    pub(crate) fn deliver_committed(&mut self) -> Result<usize, NodeError> {
        let deliverable = self.term_state.deliverable_position();
        let applied = self.term_state.last_applied_position();
        if deliverable <= applied {
            return Ok(0);
        }

        let node_id = self.configuration.node_id();
        let leadership_term = self.term_state.leadership_term();
        let mut delivered = 0;
        let mut last_position = applied;
        for frame in self.archive.read_from(applied)? {
            let frame = frame?;
            if frame.position > deliverable {
                break;
            }

            self.fragment_handler.on_fragment(
                &frame.data,
                ClusterHeader {
                    position: frame.position,
                    node_id,
                    leadership_term,
                },
            );
            last_position = frame.position;
            delivered += 1;
        }

        self.term_state.advance_applied_position(last_position);
        Ok(delivered)
    }
}
