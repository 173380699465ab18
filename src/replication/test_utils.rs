use crate::archive::InMemoryArchive;
use crate::replication::context::RoleContext;
use crate::replication::node::{RaftNode, RaftNodeParts};
use crate::replication::streams::StreamFactory;
use crate::replication::{
    ClusterFragmentHandler, ClusterHeader, ClusterStreams, FailCounter, IdlePolicy, NodeId,
    QuorumAcknowledgementStrategy, RaftNodeConfiguration, TermState,
};
use crate::transport::{InMemoryTransport, Publication, StreamIdentifier, Transport};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub(crate) struct RecordingHandler {
    delivered: Arc<Mutex<Vec<(Vec<u8>, ClusterHeader)>>>,
}

impl ClusterFragmentHandler for RecordingHandler {
    fn on_fragment(&mut self, buffer: &[u8], header: ClusterHeader) {
        self.delivered
            .lock()
            .expect("RecordingHandler mutex guard poison")
            .push((buffer.to_vec(), header));
    }
}

/// One node's worth of role dependencies on an in-memory transport, for driving a role directly.
/// Timeout is 100ms, heartbeat 25ms.
pub(crate) struct Fixture {
    pub(crate) transport: InMemoryTransport,
    pub(crate) configuration: RaftNodeConfiguration,
    pub(crate) term_state: TermState,
    pub(crate) archive: InMemoryArchive,
    pub(crate) handler: RecordingHandler,
    pub(crate) strategy: QuorumAcknowledgementStrategy,
    pub(crate) fail_counter: FailCounter,
    pub(crate) logger: slog::Logger,
    pub(crate) relayed_inbound_position: u64,
}

impl Fixture {
    pub(crate) fn new(node_id: u16, others: &[u16]) -> Self {
        let streams = ClusterStreams {
            control: StreamIdentifier::new("test", 1),
            data: StreamIdentifier::new("test", 2),
            acknowledgement: StreamIdentifier::new("test", 3),
            inbound: StreamIdentifier::new("test-inbound", node_id as i32),
        };
        let configuration = RaftNodeConfiguration::new(
            NodeId::new(node_id),
            others.iter().map(|id| NodeId::new(*id)).collect(),
            100,
            25,
            streams,
            3,
            IdlePolicy::NoOp,
        );

        Fixture {
            transport: InMemoryTransport::new(),
            configuration,
            term_state: TermState::default(),
            archive: InMemoryArchive::new(),
            handler: RecordingHandler::default(),
            strategy: QuorumAcknowledgementStrategy::new(),
            fail_counter: FailCounter::new(),
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            relayed_inbound_position: 0,
        }
    }

    pub(crate) fn streams(&self) -> StreamFactory<'_, InMemoryTransport> {
        StreamFactory {
            transport: &self.transport,
            configuration: &self.configuration,
            fail_counter: &self.fail_counter,
        }
    }

    pub(crate) fn context(&mut self) -> RoleContext<'_> {
        RoleContext {
            configuration: &self.configuration,
            term_state: &mut self.term_state,
            archive: &mut self.archive,
            fragment_handler: &mut self.handler,
            acknowledgement_strategy: &self.strategy,
            logger: &self.logger,
            relayed_inbound_position: &mut self.relayed_inbound_position,
        }
    }

    pub(crate) fn offer_inbound(&self, frame: &[u8]) {
        let mut publication = self
            .transport
            .add_publication(&self.configuration.streams().inbound)
            .unwrap();
        publication.offer(frame).unwrap();
    }

    pub(crate) fn delivered(&self) -> Vec<u64> {
        let delivered = self.handler.delivered.lock().unwrap();
        delivered.iter().map(|(_, header)| header.position).collect()
    }

    pub(crate) fn delivered_data(&self) -> Vec<Vec<u8>> {
        let delivered = self.handler.delivered.lock().unwrap();
        delivered.iter().map(|(data, _)| data.clone()).collect()
    }

    pub(crate) fn into_node(self, now_ms: u64) -> RaftNode<InMemoryTransport, InMemoryArchive> {
        RaftNode::start_as_follower(
            RaftNodeParts {
                logger: self.logger,
                configuration: self.configuration,
                transport: self.transport,
                archive: self.archive,
                last_applied_position: 0,
                fragment_handler: Box::new(self.handler),
                acknowledgement_strategy: Box::new(self.strategy),
                fail_counter: self.fail_counter,
            },
            now_ms,
        )
        .unwrap()
    }
}
