use crate::archive::Archive;
use crate::duty_cycle::ShutdownSignal;
use crate::replication::{NodeError, RaftNode};
use crate::transport::Transport;
use std::time::Duration;

/// Wall clock in epoch millis, as handed to `RaftNode::poll`.
pub fn current_time_ms() -> u64 {
    let millis = chrono::Utc::now().timestamp_millis();
    if millis < 0 {
        0
    } else {
        millis as u64
    }
}

/// Drive `node` until `shutdown` resolves or the node hits a fatal error.
///
/// Polls back to back while there is work, and sleeps for `idle_interval` between polls that found
/// none. Streams are closed on the way out either way.
pub async fn run_duty_cycle<T: Transport, A: Archive>(
    mut node: RaftNode<T, A>,
    fragment_limit: usize,
    idle_interval: Duration,
    mut shutdown: ShutdownSignal,
) -> Result<RaftNode<T, A>, NodeError> {
    loop {
        let work_count = match node.poll(fragment_limit, current_time_ms()) {
            Ok(work_count) => work_count,
            Err(e) => {
                node.close_streams();
                return Err(e);
            }
        };

        let pause = if work_count > 0 {
            Duration::from_millis(0)
        } else {
            idle_interval
        };

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    node.close_streams();
    Ok(node)
}
