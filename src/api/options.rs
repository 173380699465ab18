use crate::replication::IdlePolicy;
use std::convert::TryFrom;
use tokio::time::Duration;

#[derive(Clone, Debug, Default)]
pub struct RaftNodeOptions {
    /// How long a follower waits for a heartbeat before standing for election. Elections time out
    /// somewhere between this and twice this.
    pub timeout_interval: Option<Duration>,
    pub heartbeat_interval: Option<Duration>,
    pub max_claim_attempts: Option<usize>,
    pub idle_policy: Option<IdlePolicy>,
    /// Position the fragment handler has already processed, e.g. from a snapshot. Must be a frame
    /// boundary in the archive.
    pub last_applied_position: Option<u64>,
}

pub(super) struct RaftNodeOptionsValidated {
    pub timeout_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_claim_attempts: usize,
    pub idle_policy: IdlePolicy,
    pub last_applied_position: u64,
}

impl RaftNodeOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.timeout_interval_ms == 0 {
            return Err("Timeout interval must be at least 1ms");
        }
        if self.heartbeat_interval_ms == 0 {
            return Err("Heartbeat interval must be at least 1ms");
        }
        if self.heartbeat_interval_ms >= self.timeout_interval_ms {
            return Err("Leader's heartbeat interval must be less than the follower's timeout interval");
        }
        if self.max_claim_attempts == 0 {
            return Err("Need at least one claim attempt per publish");
        }

        Ok(())
    }
}

impl TryFrom<RaftNodeOptions> for RaftNodeOptionsValidated {
    type Error = &'static str;

    fn try_from(options: RaftNodeOptions) -> Result<Self, Self::Error> {
        let timeout_interval = options.timeout_interval.unwrap_or(Duration::from_millis(1000));
        let values = RaftNodeOptionsValidated {
            timeout_interval_ms: whole_millis(timeout_interval)?,
            heartbeat_interval_ms: whole_millis(options.heartbeat_interval.unwrap_or(timeout_interval / 4))?,
            max_claim_attempts: options.max_claim_attempts.unwrap_or(10),
            idle_policy: options.idle_policy.unwrap_or_default(),
            last_applied_position: options.last_applied_position.unwrap_or(0),
        };

        values.validate()?;
        Ok(values)
    }
}

fn whole_millis(duration: Duration) -> Result<u64, &'static str> {
    u64::try_from(duration.as_millis()).map_err(|_| "Interval does not fit in u64 milliseconds")
}
