use crate::replication::NodeId;
use std::fmt;

#[derive(Copy, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Term(u64);

impl Term {
    pub fn new(term: u64) -> Self {
        Term(term)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn incr(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TermState is the election and replication progress shared by every role of a node.
///
/// Only the active role mutates it, through the exclusive reference it is handed for the duration
/// of a poll. Positions only ever ratchet forward; the leadership term is set exactly once per won
/// election.
#[derive(Clone, Debug, Default)]
pub struct TermState {
    current_term: Term,
    voted_for: Option<NodeId>,
    leadership_term: Term,
    leader_id: Option<NodeId>,
    // Quorum-durable position, as far as this node knows.
    commit_position: u64,
    // Last position durably archived locally.
    received_position: u64,
    // Last position handed to the fragment handler.
    last_applied_position: u64,
}

impl TermState {
    pub(crate) fn new(received_position: u64, last_applied_position: u64) -> Self {
        TermState {
            received_position,
            last_applied_position,
            ..Self::default()
        }
    }

    pub fn current_term(&self) -> Term {
        self.current_term
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.voted_for
    }

    pub fn leadership_term(&self) -> Term {
        self.leadership_term
    }

    pub fn leader_id(&self) -> Option<NodeId> {
        self.leader_id
    }

    pub fn commit_position(&self) -> u64 {
        self.commit_position
    }

    pub fn received_position(&self) -> u64 {
        self.received_position
    }

    pub fn last_applied_position(&self) -> u64 {
        self.last_applied_position
    }

    /// Set current term to `term` iff it is larger than the current term. A new term has no vote
    /// and no known leader yet.
    ///
    /// Return true if we mutated state.
    pub(crate) fn adopt_term_if_higher(&mut self, term: Term) -> bool {
        if term <= self.current_term {
            return false;
        }

        self.current_term = term;
        self.voted_for = None;
        self.leader_id = None;
        true
    }

    /// Used when starting an election. Returns the new term.
    pub(crate) fn increment_term_and_vote_for(&mut self, me: NodeId) -> Term {
        self.current_term.incr();
        self.voted_for = Some(me);
        self.leader_id = None;
        self.current_term
    }

    /// Record a vote for `candidate` iff `term` is the current term and we have not voted for
    /// anyone else this term. Voting for the same candidate twice is allowed.
    ///
    /// Return true if the vote stands.
    pub(crate) fn vote_for_if_unvoted(&mut self, term: Term, candidate: NodeId) -> bool {
        if term != self.current_term {
            return false;
        }

        match self.voted_for {
            Some(existing) => existing == candidate,
            None => {
                self.voted_for = Some(candidate);
                true
            }
        }
    }

    /// Record that `me` won the election of the current term.
    pub(crate) fn become_leader(&mut self, me: NodeId) {
        assert!(
            self.current_term > self.leadership_term,
            "Leadership term can only increase. Current={:?}, Leadership={:?}",
            self.current_term,
            self.leadership_term,
        );
        self.leadership_term = self.current_term;
        self.leader_id = Some(me);
    }

    /// Record `leader` as the leader of `term`, which must be the current term.
    ///
    /// Return true if this is news, i.e. a leadership term we had not seen before.
    pub(crate) fn follow_leader(&mut self, term: Term, leader: NodeId) -> bool {
        debug_assert_eq!(term, self.current_term);
        let is_new = self.leadership_term < term || self.leader_id != Some(leader);
        if self.leadership_term < term {
            self.leadership_term = term;
        }
        self.leader_id = Some(leader);
        is_new
    }

    /// Return true if the commit position moved.
    pub(crate) fn advance_commit_position(&mut self, position: u64) -> bool {
        if position > self.commit_position {
            self.commit_position = position;
            true
        } else {
            false
        }
    }

    pub(crate) fn advance_received_position(&mut self, position: u64) {
        assert!(
            position >= self.received_position,
            "Received position can only ratchet forward. Current={}, New={}",
            self.received_position,
            position,
        );
        self.received_position = position;
    }

    pub(crate) fn advance_applied_position(&mut self, position: u64) {
        assert!(
            position >= self.last_applied_position,
            "Applied position can only ratchet forward. Current={}, New={}",
            self.last_applied_position,
            position,
        );
        self.last_applied_position = position;
    }

    /// Highest position that may be handed downstream: durable on a quorum and archived here.
    pub(crate) fn deliverable_position(&self) -> u64 {
        self.commit_position.min(self.received_position)
    }
}
