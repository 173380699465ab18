use crate::replication::{RoleKind, Term};
use tokio::sync::watch;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoleChange {
    pub role: RoleKind,
    pub term: Term,
}

pub(super) fn new(initial: RoleChange) -> (RoleChangeNotifier, RoleChangeListener) {
    let (snd, rcv) = watch::channel(initial);

    (
        RoleChangeNotifier { snd, rcv: rcv.clone() },
        RoleChangeListener { rcv },
    )
}

pub(super) struct RoleChangeNotifier {
    snd: watch::Sender<RoleChange>,
    // Keeps the channel open while no listener is around, so later listeners still see the latest.
    rcv: watch::Receiver<RoleChange>,
}

impl RoleChangeNotifier {
    pub(super) fn notify(&self, change: RoleChange) {
        let _ = self.snd.send(change);
    }

    pub(super) fn listener(&self) -> RoleChangeListener {
        RoleChangeListener { rcv: self.rcv.clone() }
    }
}

/// Observe a node's role changes from async code, e.g. to start accepting FIX sessions once the
/// local node leads.
#[derive(Clone)]
pub struct RoleChangeListener {
    rcv: watch::Receiver<RoleChange>,
}

impl RoleChangeListener {
    /// Wait for the next role change. None once the node is gone.
    pub async fn next(&mut self) -> Option<RoleChange> {
        match self.rcv.changed().await {
            Ok(_) => Some(*self.rcv.borrow()),
            Err(_) => None,
        }
    }

    pub fn current(&self) -> RoleChange {
        *self.rcv.borrow()
    }
}
