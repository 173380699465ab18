use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RoleKind {
    Leader,
    Candidate,
    Follower,
}

/// A request to change role, named by the role to change to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Transition {
    ToFollower,
    ToCandidate,
    ToLeader,
}

/// Asking a role for a transition it doesn't have is a bug in the caller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("Invalid role transition {transition:?} from {from:?}")]
pub struct InvalidTransition {
    pub from: RoleKind,
    pub transition: Transition,
}

impl RoleKind {
    /// The role transition table. Candidate to Candidate is a fresh election round.
    pub fn next(self, transition: Transition) -> Result<RoleKind, InvalidTransition> {
        match (self, transition) {
            (RoleKind::Follower, Transition::ToCandidate) => Ok(RoleKind::Candidate),
            (RoleKind::Candidate, Transition::ToCandidate) => Ok(RoleKind::Candidate),
            (RoleKind::Candidate, Transition::ToLeader) => Ok(RoleKind::Leader),
            (RoleKind::Candidate, Transition::ToFollower) => Ok(RoleKind::Follower),
            (RoleKind::Leader, Transition::ToFollower) => Ok(RoleKind::Follower),
            (from, transition) => Err(InvalidTransition { from, transition }),
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Leader => write!(f, "Leader"),
            RoleKind::Candidate => write!(f, "Candidate"),
            RoleKind::Follower => write!(f, "Follower"),
        }
    }
}

/// What a role's poll did, and whether it wants the node to move it to another role. Transitions
/// are applied by the node once the poll has returned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RoleOutcome {
    pub(crate) work_count: usize,
    pub(crate) transition: Option<Transition>,
}

impl RoleOutcome {
    pub(crate) fn work(work_count: usize) -> Self {
        RoleOutcome {
            work_count,
            transition: None,
        }
    }

    pub(crate) fn transition(work_count: usize, transition: Transition) -> Self {
        RoleOutcome {
            work_count,
            transition: Some(transition),
        }
    }
}
