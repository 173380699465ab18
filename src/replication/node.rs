use crate::archive::Archive;
use crate::replication::candidate::Candidate;
use crate::replication::context::RoleContext;
use crate::replication::follower::Follower;
use crate::replication::leader::Leader;
use crate::replication::role_change_listener::{self, RoleChange, RoleChangeListener, RoleChangeNotifier};
use crate::replication::streams::StreamFactory;
use crate::replication::{
    AcknowledgementStrategy, ClusterFragmentHandler, FailCounter, InvalidTransition, NodeError, NodeId,
    RaftNodeConfiguration, RoleKind, TermState, Transition,
};
use crate::transport::{Transport, TransportError};

enum Role<T: Transport> {
    Leader(Leader<T>),
    Candidate(Candidate<T>),
    Follower(Follower<T>),
}

impl<T: Transport> Role<T> {
    fn kind(&self) -> RoleKind {
        match self {
            Role::Leader(_) => RoleKind::Leader,
            Role::Candidate(_) => RoleKind::Candidate,
            Role::Follower(_) => RoleKind::Follower,
        }
    }

    fn close(&mut self) {
        match self {
            Role::Leader(leader) => leader.close(),
            Role::Candidate(candidate) => candidate.close(),
            Role::Follower(follower) => follower.close(),
        }
    }
}

/// State that outlives any one role. Roles see it through a `RoleContext`.
struct NodeState<A: Archive> {
    logger: slog::Logger,
    configuration: RaftNodeConfiguration,
    term_state: TermState,
    archive: A,
    fragment_handler: Box<dyn ClusterFragmentHandler>,
    acknowledgement_strategy: Box<dyn AcknowledgementStrategy>,
    relayed_inbound_position: u64,
}

impl<A: Archive> NodeState<A> {
    fn context(&mut self) -> RoleContext<'_> {
        RoleContext {
            configuration: &self.configuration,
            term_state: &mut self.term_state,
            archive: &mut self.archive,
            fragment_handler: &mut *self.fragment_handler,
            acknowledgement_strategy: &*self.acknowledgement_strategy,
            logger: &self.logger,
            relayed_inbound_position: &mut self.relayed_inbound_position,
        }
    }
}

/// RaftNode holds exactly one active role and mediates every transition between roles.
///
/// It is driven by a single thread calling `poll` in a loop and never blocks. Roles ask for
/// transitions through the outcome of their poll; the node applies them before `poll` returns.
pub struct RaftNode<T: Transport, A: Archive> {
    state: NodeState<A>,
    transport: T,
    fail_counter: FailCounter,
    role: Role<T>,
    role_change_notifier: RoleChangeNotifier,
    halted: bool,
    // Set by `close_streams`. A closed node stays in its last role and does no further work.
    closed: bool,
}

pub(crate) struct RaftNodeParts<T, A> {
    pub(crate) logger: slog::Logger,
    pub(crate) configuration: RaftNodeConfiguration,
    pub(crate) transport: T,
    pub(crate) archive: A,
    pub(crate) last_applied_position: u64,
    pub(crate) fragment_handler: Box<dyn ClusterFragmentHandler>,
    pub(crate) acknowledgement_strategy: Box<dyn AcknowledgementStrategy>,
    pub(crate) fail_counter: FailCounter,
}

impl<T: Transport, A: Archive> RaftNode<T, A> {
    /// Every node starts out following, with its term state recovered from the archive.
    pub(crate) fn start_as_follower(parts: RaftNodeParts<T, A>, now_ms: u64) -> Result<Self, TransportError> {
        let RaftNodeParts {
            logger,
            configuration,
            transport,
            archive,
            last_applied_position,
            fragment_handler,
            acknowledgement_strategy,
            fail_counter,
        } = parts;

        let logger = logger.new(slog::o!("NodeId" => configuration.node_id().to_string()));
        let term_state = TermState::new(archive.position(), last_applied_position);
        let follower = Follower::open(&StreamFactory {
            transport: &transport,
            configuration: &configuration,
            fail_counter: &fail_counter,
        })?;

        let (role_change_notifier, _) = role_change_listener::new(RoleChange {
            role: RoleKind::Follower,
            term: term_state.current_term(),
        });

        let mut node = RaftNode {
            state: NodeState {
                logger,
                configuration,
                term_state,
                archive,
                fragment_handler,
                acknowledgement_strategy,
                relayed_inbound_position: 0,
            },
            transport,
            fail_counter,
            role: Role::Follower(follower),
            role_change_notifier,
            halted: false,
            closed: false,
        };

        slog::info!(
            node.state.logger,
            "Starting as follower at {}. Archived position {}, applied position {}",
            now_ms,
            node.state.term_state.received_position(),
            node.state.term_state.last_applied_position()
        );
        if let Role::Follower(follower) = &mut node.role {
            follower.follow(&mut node.state.context(), now_ms);
        }

        Ok(node)
    }

    /// Do one bounded round of work. Returns how much work was done, so the caller can decide
    /// whether to idle.
    ///
    /// Only fatal errors are returned. After one, the node is halted and every later call returns
    /// `NodeError::Halted`.
    pub fn poll(&mut self, fragment_limit: usize, now_ms: u64) -> Result<usize, NodeError> {
        self.check_not_halted()?;
        if self.closed {
            return Ok(0);
        }

        match self.poll_role(fragment_limit, now_ms) {
            Ok(work_count) => Ok(work_count),
            Err(e) => {
                if e.is_fatal() {
                    self.halt(&e, now_ms);
                }
                Err(e)
            }
        }
    }

    fn poll_role(&mut self, fragment_limit: usize, now_ms: u64) -> Result<usize, NodeError> {
        let outcome = {
            let mut ctx = self.state.context();
            match &mut self.role {
                Role::Leader(leader) => leader.poll(&mut ctx, fragment_limit, now_ms)?,
                Role::Candidate(candidate) => candidate.poll(&mut ctx, fragment_limit, now_ms)?,
                Role::Follower(follower) => follower.poll(&mut ctx, fragment_limit, now_ms)?,
            }
        };

        if let Some(transition) = outcome.transition {
            match self.transition(transition, now_ms) {
                Ok(()) => {}
                // Leave the current role in place; it asks again next poll.
                Err(NodeError::Transport(e)) => {
                    self.fail_counter.increment();
                    slog::warn!(
                        self.state.logger,
                        "Abandoned transition {:?} from {}: {}",
                        transition,
                        self.role.kind(),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome.work_count)
    }

    fn transition(&mut self, transition: Transition, now_ms: u64) -> Result<(), NodeError> {
        let from = self.role.kind();
        let to = from.next(transition)?;
        let term_state = &self.state.term_state;
        if to == RoleKind::Leader && term_state.current_term() <= term_state.leadership_term() {
            // The term already has a leader.
            return Err(InvalidTransition { from, transition }.into());
        }

        if let Role::Candidate(candidate) = &mut self.role {
            if to == RoleKind::Candidate {
                candidate.start_new_election(&mut self.state.context(), now_ms);
                self.on_transition(from, now_ms);
                return Ok(());
            }
        }

        let incoming = {
            let streams = StreamFactory {
                transport: &self.transport,
                configuration: &self.state.configuration,
                fail_counter: &self.fail_counter,
            };
            match to {
                RoleKind::Leader => Role::Leader(Leader::open(&streams)?),
                RoleKind::Candidate => Role::Candidate(Candidate::open(&streams)?),
                RoleKind::Follower => Role::Follower(Follower::open(&streams)?),
            }
        };

        // Dropping the outgoing role closes its streams.
        self.role = incoming;

        let mut ctx = self.state.context();
        match &mut self.role {
            Role::Leader(leader) => leader.gets_elected(&mut ctx, now_ms),
            Role::Candidate(candidate) => candidate.start_new_election(&mut ctx, now_ms),
            Role::Follower(follower) => follower.follow(&mut ctx, now_ms),
        }

        self.on_transition(from, now_ms);
        Ok(())
    }

    fn on_transition(&mut self, from: RoleKind, now_ms: u64) {
        let to = self.role.kind();
        let term_state = &self.state.term_state;
        slog::info!(
            self.state.logger,
            "Transitioned from {} to {} at {}. Term={:?}, LeadershipTerm={:?}",
            from,
            to,
            now_ms,
            term_state.current_term(),
            term_state.leadership_term()
        );

        self.role_change_notifier.notify(RoleChange {
            role: to,
            term: term_state.current_term(),
        });
    }

    pub fn transition_to_follower(&mut self, now_ms: u64) -> Result<(), NodeError> {
        self.check_open()?;
        self.transition(Transition::ToFollower, now_ms)
    }

    pub fn transition_to_candidate(&mut self, now_ms: u64) -> Result<(), NodeError> {
        self.check_open()?;
        self.transition(Transition::ToCandidate, now_ms)
    }

    pub fn transition_to_leader(&mut self, now_ms: u64) -> Result<(), NodeError> {
        self.check_open()?;
        self.transition(Transition::ToLeader, now_ms)
    }

    /// Release the active role's stream handles. The node keeps its last role and term state, but
    /// polling afterwards does no work and explicit transitions fail with `NodeError::Closed`.
    pub fn close_streams(&mut self) {
        if !self.closed {
            slog::info!(
                self.state.logger,
                "Closing streams as {}. Term={:?}, ReceivedPosition={}",
                self.role.kind(),
                self.state.term_state.current_term(),
                self.state.term_state.received_position()
            );
        }
        self.closed = true;
        self.role.close();
    }

    fn halt(&mut self, error: &NodeError, now_ms: u64) {
        slog::error!(
            self.state.logger,
            "Halting {} at {} after fatal error: {}. Term={:?}, ReceivedPosition={}",
            self.role.kind(),
            now_ms,
            error,
            self.state.term_state.current_term(),
            self.state.term_state.received_position()
        );
        self.halted = true;
        self.role.close();
    }

    fn check_not_halted(&self) -> Result<(), NodeError> {
        if self.halted {
            Err(NodeError::Halted(self.node_id()))
        } else {
            Ok(())
        }
    }

    fn check_open(&self) -> Result<(), NodeError> {
        self.check_not_halted()?;
        if self.closed {
            Err(NodeError::Closed(self.node_id()))
        } else {
            Ok(())
        }
    }

    pub fn role(&self) -> RoleKind {
        self.role.kind()
    }

    pub fn role_is_leader(&self) -> bool {
        matches!(self.role, Role::Leader(_))
    }

    pub fn role_is_candidate(&self) -> bool {
        matches!(self.role, Role::Candidate(_))
    }

    pub fn role_is_follower(&self) -> bool {
        matches!(self.role, Role::Follower(_))
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn node_id(&self) -> NodeId {
        self.state.configuration.node_id()
    }

    pub fn configuration(&self) -> &RaftNodeConfiguration {
        &self.state.configuration
    }

    pub fn term_state(&self) -> &TermState {
        &self.state.term_state
    }

    pub fn archive(&self) -> &A {
        &self.state.archive
    }

    pub fn role_change_listener(&self) -> RoleChangeListener {
        self.role_change_notifier.listener()
    }

    pub fn fail_counter(&self) -> &FailCounter {
        &self.fail_counter
    }
}
