#![allow(dead_code)]

use fix_replication::{
    create_discarding_logger, next_position, try_create_raft_node, Archive, ClusterHeader, ClusterStreams,
    FailCounter, IdlePolicy, InMemoryTransport, NodeError, NodeId, Publication, QuorumAcknowledgementStrategy,
    RaftNode, RaftNodeConfig, RaftNodeOptions, StreamIdentifier, Transport,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const STEP_MS: u64 = 5;
pub const FRAGMENT_LIMIT: usize = 10;

pub fn streams(node_id: u16) -> ClusterStreams {
    ClusterStreams {
        control: StreamIdentifier::new("cluster", 1),
        data: StreamIdentifier::new("cluster", 2),
        acknowledgement: StreamIdentifier::new("cluster", 3),
        inbound: StreamIdentifier::new("inbound", node_id as i32),
    }
}

/// Records what a node delivered downstream, and fails the test if deliveries skip or repeat a
/// position.
#[derive(Clone, Default)]
pub struct Delivered {
    frames: Arc<Mutex<Vec<(Vec<u8>, ClusterHeader)>>>,
}

impl Delivered {
    pub fn handler(&self) -> impl FnMut(&[u8], ClusterHeader) + Send + 'static {
        let frames = self.frames.clone();
        move |buffer: &[u8], header: ClusterHeader| {
            let mut frames = frames.lock().expect("Delivered mutex guard poison");
            let previous = frames.last().map(|(_, header)| header.position).unwrap_or(0);
            Self::check_contiguous(previous, buffer.len(), header.position);
            frames.push((buffer.to_vec(), header));
        }
    }

    /// Start checking from `position` instead of 0, for a node resuming after a restart.
    pub fn resuming_handler(&self, position: u64) -> impl FnMut(&[u8], ClusterHeader) + Send + 'static {
        let frames = self.frames.clone();
        let mut previous = position;
        move |buffer: &[u8], header: ClusterHeader| {
            Self::check_contiguous(previous, buffer.len(), header.position);
            previous = header.position;
            frames
                .lock()
                .expect("Delivered mutex guard poison")
                .push((buffer.to_vec(), header));
        }
    }

    fn check_contiguous(previous: u64, length: usize, position: u64) {
        let expected = next_position(previous, length);
        assert_eq!(
            expected, position,
            "Delivered out of sequence: previous {}, length {}",
            previous, length
        );
    }

    pub fn positions(&self) -> Vec<u64> {
        let frames = self.frames.lock().unwrap();
        frames.iter().map(|(_, header)| header.position).collect()
    }

    pub fn data(&self) -> Vec<Vec<u8>> {
        let frames = self.frames.lock().unwrap();
        frames.iter().map(|(data, _)| data.clone()).collect()
    }
}

pub struct ClusterNode<A: Archive> {
    pub node: RaftNode<InMemoryTransport, A>,
    pub delivered: Delivered,
    pub last_error: Option<NodeError>,
}

/// In-process cluster on a shared in-memory transport with simulated time. Every step polls each
/// live node once, in node id order.
pub struct Cluster<A: Archive> {
    pub transport: InMemoryTransport,
    pub members: Vec<NodeId>,
    pub nodes: BTreeMap<u16, ClusterNode<A>>,
    pub now_ms: u64,
    leaders_by_term: BTreeMap<u64, BTreeSet<u16>>,
}

impl<A: Archive> Cluster<A> {
    pub fn new(members: &[u16]) -> Self {
        Cluster {
            transport: InMemoryTransport::new(),
            members: members.iter().map(|id| NodeId::new(*id)).collect(),
            nodes: BTreeMap::new(),
            now_ms: 0,
            leaders_by_term: BTreeMap::new(),
        }
    }

    pub fn start_node(&mut self, node_id: u16, timeout_ms: u64, archive: A) {
        let delivered = Delivered::default();
        let handler = Box::new(delivered.handler());
        self.start_node_with(node_id, timeout_ms, archive, 0, delivered, handler);
    }

    pub fn start_node_with(
        &mut self,
        node_id: u16,
        timeout_ms: u64,
        archive: A,
        last_applied_position: u64,
        delivered: Delivered,
        handler: Box<dyn FnMut(&[u8], ClusterHeader) + Send>,
    ) {
        let config = RaftNodeConfig {
            my_node_id: NodeId::new(node_id),
            cluster_members: self.members.clone(),
            streams: streams(node_id),
            transport: self.transport.clone(),
            archive,
            acknowledgement_strategy: Box::new(QuorumAcknowledgementStrategy::new()),
            fragment_handler: Box::new(handler),
            fail_counter: FailCounter::new(),
            info_logger: create_discarding_logger(),
            options: RaftNodeOptions {
                timeout_interval: Some(Duration::from_millis(timeout_ms)),
                max_claim_attempts: Some(3),
                idle_policy: Some(IdlePolicy::NoOp),
                last_applied_position: Some(last_applied_position),
                ..RaftNodeOptions::default()
            },
        };

        let node = try_create_raft_node(config, self.now_ms).expect("Failed to create node");
        self.nodes.insert(
            node_id,
            ClusterNode {
                node,
                delivered,
                last_error: None,
            },
        );
    }

    /// Simulate a crash: the node stops polling and its streams go away.
    pub fn stop_node(&mut self, node_id: u16) -> RaftNode<InMemoryTransport, A> {
        let mut stopped = self.nodes.remove(&node_id).expect("No such node");
        stopped.node.close_streams();
        stopped.node
    }

    pub fn node(&self, node_id: u16) -> &RaftNode<InMemoryTransport, A> {
        &self.nodes[&node_id].node
    }

    pub fn delivered(&self, node_id: u16) -> Vec<u64> {
        self.nodes[&node_id].delivered.positions()
    }

    pub fn last_error(&self, node_id: u16) -> Option<&NodeError> {
        self.nodes[&node_id].last_error.as_ref()
    }

    /// Poll every live node once at the current time.
    pub fn poll_all(&mut self) {
        for (node_id, cluster_node) in self.nodes.iter_mut() {
            if cluster_node.node.is_halted() {
                continue;
            }

            if let Err(e) = cluster_node.node.poll(FRAGMENT_LIMIT, self.now_ms) {
                cluster_node.last_error = Some(e);
            }

            let node = &cluster_node.node;
            let active = [node.role_is_leader(), node.role_is_candidate(), node.role_is_follower()];
            assert_eq!(
                active.iter().filter(|active| **active).count(),
                1,
                "Node {} has more than one active role",
                node_id
            );

            if node.role_is_leader() {
                self.leaders_by_term
                    .entry(node.term_state().leadership_term().as_u64())
                    .or_default()
                    .insert(*node_id);
            }
        }
    }

    pub fn step(&mut self) {
        self.now_ms += STEP_MS;
        self.poll_all();
    }

    pub fn advance(&mut self, duration_ms: u64) {
        let until = self.now_ms + duration_ms;
        while self.now_ms < until {
            self.step();
        }
    }

    /// Step until `condition` holds. Panics if it doesn't within `limit_ms`.
    pub fn run_until(&mut self, limit_ms: u64, mut condition: impl FnMut(&Self) -> bool) {
        let until = self.now_ms + limit_ms;
        while !condition(self) {
            assert!(self.now_ms < until, "Condition not reached by {}ms", self.now_ms);
            self.step();
        }
    }

    pub fn leader(&self) -> Option<u16> {
        self.nodes
            .iter()
            .find(|(_, cluster_node)| cluster_node.node.role_is_leader())
            .map(|(node_id, _)| *node_id)
    }

    pub fn await_leader(&mut self, limit_ms: u64) -> u16 {
        self.run_until(limit_ms, |cluster| cluster.leader().is_some());
        self.leader().expect("Leader just observed")
    }

    /// Hand a framed FIX message to `node_id`'s gateway side.
    pub fn offer_inbound(&self, node_id: u16, frame: &[u8]) -> u64 {
        let mut publication = self
            .transport
            .add_publication(&streams(node_id).inbound)
            .expect("Failed to add inbound publication");
        publication.offer(frame).expect("Inbound offer failed")
    }

    pub fn data_tail_position(&self) -> u64 {
        self.transport.tail_position(&streams(0).data)
    }

    /// Every term that had a leader, with the nodes that led it.
    pub fn leaders_by_term(&self) -> &BTreeMap<u64, BTreeSet<u16>> {
        &self.leaders_by_term
    }

    pub fn assert_election_safety(&self) {
        for (term, leaders) in &self.leaders_by_term {
            assert_eq!(leaders.len(), 1, "Term {} had leaders {:?}", term, leaders);
        }
    }
}
