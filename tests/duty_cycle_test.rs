mod common;

use common::{streams, Delivered};
use fix_replication::{
    create_discarding_logger, current_time_ms, next_position, run_duty_cycle, shutdown_signal, try_create_raft_node,
    Archive, FailCounter, IdlePolicy, InMemoryArchive, InMemoryTransport, NodeError, NodeId, Publication,
    QuorumAcknowledgementStrategy, RaftNode, RaftNodeConfig, RaftNodeOptions, RoleChangeListener, RoleKind, Term,
    Transport,
};
use std::error::Error;
use tokio::time::{timeout, Duration};

fn single_node(
    transport: &InMemoryTransport,
    archive: InMemoryArchive,
    delivered: &Delivered,
) -> RaftNode<InMemoryTransport, InMemoryArchive> {
    let config = RaftNodeConfig {
        my_node_id: NodeId::new(1),
        cluster_members: vec![NodeId::new(1)],
        streams: streams(1),
        transport: transport.clone(),
        archive,
        acknowledgement_strategy: Box::new(QuorumAcknowledgementStrategy::new()),
        fragment_handler: Box::new(delivered.handler()),
        fail_counter: FailCounter::new(),
        info_logger: create_discarding_logger(),
        options: RaftNodeOptions {
            timeout_interval: Some(Duration::from_millis(50)),
            idle_policy: Some(IdlePolicy::Yielding),
            ..RaftNodeOptions::default()
        },
    };

    try_create_raft_node(config, current_time_ms()).expect("Failed to create node")
}

async fn wait_for_role(listener: &mut RoleChangeListener, role: RoleKind) -> Term {
    loop {
        let change = listener.next().await.expect("Node dropped");
        if change.role == role {
            return change.term;
        }
    }
}

#[tokio::test]
async fn single_node_elects_itself_and_commits() -> Result<(), Box<dyn Error>> {
    let transport = InMemoryTransport::new();
    let delivered = Delivered::default();
    let node = single_node(&transport, InMemoryArchive::new(), &delivered);
    let mut listener = node.role_change_listener();

    let (shutdown_handle, shutdown) = shutdown_signal();
    let running = tokio::spawn(run_duty_cycle(node, 10, Duration::from_millis(1), shutdown));

    let term = timeout(Duration::from_secs(5), wait_for_role(&mut listener, RoleKind::Leader)).await?;
    assert_eq!(term, Term::new(1));

    let frame = b"8=FIX.4.4|35=A|";
    let mut inbound = transport.add_publication(&streams(1).inbound)?;
    inbound.offer(frame)?;
    timeout(Duration::from_secs(5), async {
        while delivered.positions().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    shutdown_handle.shutdown();
    let node = running.await??;
    assert!(node.role_is_leader());
    let position = next_position(0, frame.len());
    assert_eq!(position, 64);
    assert_eq!(node.term_state().commit_position(), position);
    assert_eq!(node.archive().position(), position);
    assert_eq!(delivered.positions(), vec![position]);
    assert_eq!(delivered.data(), vec![frame.to_vec()]);

    Ok(())
}

#[tokio::test]
async fn fatal_error_stops_the_duty_cycle() -> Result<(), Box<dyn Error>> {
    let transport = InMemoryTransport::new();
    let mut archive = InMemoryArchive::new();
    archive.append(64, &[0; 10])?;

    // Someone else's frame sits where this node's archive disagrees.
    let mut data = transport.add_publication(&streams(1).data)?;
    data.offer(&[1; 50])?;

    let node = single_node(&transport, archive, &Delivered::default());
    let (_shutdown_handle, shutdown) = shutdown_signal();
    let result = timeout(
        Duration::from_secs(5),
        run_duty_cycle(node, 10, Duration::from_millis(1), shutdown),
    )
    .await?;

    match result {
        Err(NodeError::ArchiveInconsistency { expected, actual }) => {
            assert_eq!(expected, 160);
            assert_eq!(actual, 96);
        }
        Err(e) => panic!("Unexpected error {}", e),
        Ok(_) => panic!("Duty cycle should have failed"),
    }

    Ok(())
}
