use crate::api::options::RaftNodeOptionsValidated;
use crate::archive::{Archive, ArchiveError};
use crate::replication::{
    AcknowledgementStrategy, ClusterFragmentHandler, ClusterStreams, FailCounter, NodeId, RaftNode,
    RaftNodeConfiguration, RaftNodeParts,
};
use crate::transport::{Transport, TransportError};
use crate::RaftNodeOptions;
use std::collections::BTreeSet;
use std::convert::TryFrom;

pub struct RaftNodeConfig<T, A> {
    pub my_node_id: NodeId,
    /// Every voting member, this node included.
    pub cluster_members: Vec<NodeId>,
    pub streams: ClusterStreams,
    pub transport: T,
    /// Recovered archive. The node resumes replicating from its position.
    pub archive: A,
    pub acknowledgement_strategy: Box<dyn AcknowledgementStrategy>,
    pub fragment_handler: Box<dyn ClusterFragmentHandler>,
    pub fail_counter: FailCounter,
    pub info_logger: slog::Logger,
    pub options: RaftNodeOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum RaftNodeCreationError {
    #[error("Illegal options for configuring node: {0}")]
    IllegalNodeOptions(String),
    // We will need to relax this later when adding membership changes.
    #[error("my node ID not in cluster config")]
    MeNotInCluster,
    #[error("Node {0} is listed more than once in cluster config")]
    DuplicateMember(NodeId),
    #[error("Archive can't resume from the applied position")]
    ArchiveInitialization(#[from] ArchiveError),
    #[error("Failed to open streams")]
    StreamInitialization(#[from] TransportError),
}

/// Create a node, starting out as a follower at `now_ms`. Drive it with `RaftNode::poll` or
/// `run_duty_cycle`.
pub fn try_create_raft_node<T: Transport, A: Archive>(
    config: RaftNodeConfig<T, A>,
    now_ms: u64,
) -> Result<RaftNode<T, A>, RaftNodeCreationError> {
    let options = RaftNodeOptionsValidated::try_from(config.options)
        .map_err(|e| RaftNodeCreationError::IllegalNodeOptions(e.to_string()))?;

    let other_nodes = other_nodes(config.my_node_id, &config.cluster_members)?;

    // Fails unless the applied position is 0 or a frame boundary the archive holds.
    drop(config.archive.read_from(options.last_applied_position)?);

    let configuration = RaftNodeConfiguration::new(
        config.my_node_id,
        other_nodes,
        options.timeout_interval_ms,
        options.heartbeat_interval_ms,
        config.streams,
        options.max_claim_attempts,
        options.idle_policy,
    );

    let node = RaftNode::start_as_follower(
        RaftNodeParts {
            logger: config.info_logger,
            configuration,
            transport: config.transport,
            archive: config.archive,
            last_applied_position: options.last_applied_position,
            fragment_handler: config.fragment_handler,
            acknowledgement_strategy: config.acknowledgement_strategy,
            fail_counter: config.fail_counter,
        },
        now_ms,
    )?;

    Ok(node)
}

fn other_nodes(my_node_id: NodeId, cluster_members: &[NodeId]) -> Result<BTreeSet<NodeId>, RaftNodeCreationError> {
    let mut members = BTreeSet::new();
    for member in cluster_members {
        if !members.insert(*member) {
            return Err(RaftNodeCreationError::DuplicateMember(*member));
        }
    }

    if !members.remove(&my_node_id) {
        return Err(RaftNodeCreationError::MeNotInCluster);
    }

    Ok(members)
}
