use std::thread;
use std::time::Duration;

/// What to do between attempts when there's no progress to be made. Every strategy bounds how long
/// a single `idle()` can take, so a caller never stalls for long.
pub trait IdleStrategy: Send {
    fn idle(&mut self);

    /// Progress was made; start backing off from scratch next time.
    fn reset(&mut self);
}

/// Configuration-level choice of idle strategy. Each publication gets its own instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IdlePolicy {
    NoOp,
    BusySpin,
    Yielding,
    Backoff {
        max_spins: u32,
        max_yields: u32,
        min_park: Duration,
        max_park: Duration,
    },
}

impl IdlePolicy {
    pub fn default_backoff() -> Self {
        IdlePolicy::Backoff {
            max_spins: 10,
            max_yields: 5,
            min_park: Duration::from_micros(1),
            max_park: Duration::from_micros(100),
        }
    }

    pub fn new_strategy(&self) -> Box<dyn IdleStrategy> {
        match *self {
            IdlePolicy::NoOp => Box::new(NoOpIdleStrategy),
            IdlePolicy::BusySpin => Box::new(BusySpinIdleStrategy),
            IdlePolicy::Yielding => Box::new(YieldingIdleStrategy),
            IdlePolicy::Backoff {
                max_spins,
                max_yields,
                min_park,
                max_park,
            } => Box::new(BackoffIdleStrategy::new(max_spins, max_yields, min_park, max_park)),
        }
    }
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self::default_backoff()
    }
}

pub struct NoOpIdleStrategy;

impl IdleStrategy for NoOpIdleStrategy {
    fn idle(&mut self) {}

    fn reset(&mut self) {}
}

pub struct BusySpinIdleStrategy;

impl IdleStrategy for BusySpinIdleStrategy {
    fn idle(&mut self) {
        std::hint::spin_loop();
    }

    fn reset(&mut self) {}
}

pub struct YieldingIdleStrategy;

impl IdleStrategy for YieldingIdleStrategy {
    fn idle(&mut self) {
        thread::yield_now();
    }

    fn reset(&mut self) {}
}

/// Spin, then yield, then park for exponentially growing periods capped at `max_park`.
pub struct BackoffIdleStrategy {
    max_spins: u32,
    max_yields: u32,
    min_park: Duration,
    max_park: Duration,
    state: BackoffState,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BackoffState {
    NotIdle,
    Spinning(u32),
    Yielding(u32),
    Parking(Duration),
}

impl BackoffIdleStrategy {
    pub fn new(max_spins: u32, max_yields: u32, min_park: Duration, max_park: Duration) -> Self {
        assert!(min_park <= max_park, "Minimum park period must not exceed the maximum");
        BackoffIdleStrategy {
            max_spins,
            max_yields,
            min_park,
            max_park,
            state: BackoffState::NotIdle,
        }
    }
}

impl IdleStrategy for BackoffIdleStrategy {
    fn idle(&mut self) {
        self.state = match self.state {
            BackoffState::NotIdle => BackoffState::Spinning(0),
            BackoffState::Spinning(spins) => {
                std::hint::spin_loop();
                if spins + 1 >= self.max_spins {
                    BackoffState::Yielding(0)
                } else {
                    BackoffState::Spinning(spins + 1)
                }
            }
            BackoffState::Yielding(yields) => {
                thread::yield_now();
                if yields + 1 >= self.max_yields {
                    BackoffState::Parking(self.min_park)
                } else {
                    BackoffState::Yielding(yields + 1)
                }
            }
            BackoffState::Parking(period) => {
                thread::sleep(period);
                BackoffState::Parking((period * 2).min(self.max_park))
            }
        };
    }

    fn reset(&mut self) {
        self.state = BackoffState::NotIdle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_progresses_through_phases() {
        let mut strategy =
            BackoffIdleStrategy::new(2, 2, Duration::from_nanos(1), Duration::from_nanos(4));

        strategy.idle();
        assert_eq!(strategy.state, BackoffState::Spinning(0));
        strategy.idle();
        strategy.idle();
        assert_eq!(strategy.state, BackoffState::Yielding(0));
        strategy.idle();
        strategy.idle();
        assert_eq!(strategy.state, BackoffState::Parking(Duration::from_nanos(1)));
        strategy.idle();
        strategy.idle();
        strategy.idle();
        assert_eq!(strategy.state, BackoffState::Parking(Duration::from_nanos(4)));

        strategy.reset();
        assert_eq!(strategy.state, BackoffState::NotIdle);
    }
}
