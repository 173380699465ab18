use crate::replication::context::RoleContext;
use crate::replication::messages::{control_message::Body, Vote};
use crate::replication::streams::{RaftSubscription, StreamFactory};
use crate::replication::{NodeError, NodeId, RaftPublication, RoleOutcome, Term, Transition};
use crate::transport::{Transport, TransportError};
use rand::Rng;
use std::collections::HashSet;

/// Candidate runs one election round per term. It never touches the data stream.
pub(crate) struct Candidate<T: Transport> {
    control_publication: RaftPublication<T::Publication>,
    control_subscription: RaftSubscription<T::Subscription>,
    votes: HashSet<NodeId>,
    election_deadline_ms: u64,
    request_vote_pending: bool,
}

impl<T: Transport> Candidate<T> {
    pub(crate) fn open(streams: &StreamFactory<'_, T>) -> Result<Self, TransportError> {
        let config = streams.configuration.streams();
        Ok(Candidate {
            control_publication: streams.publication(&config.control)?,
            control_subscription: streams.subscription(&config.control)?,
            votes: HashSet::new(),
            election_deadline_ms: 0,
            request_vote_pending: false,
        })
    }

    /// Entry action. Also used for every later round.
    pub(crate) fn start_new_election(&mut self, ctx: &mut RoleContext<'_>, now_ms: u64) {
        let me = ctx.node_id();
        let term = ctx.term_state.increment_term_and_vote_for(me);
        self.votes.clear();
        self.votes.insert(me);

        // Randomized so that candidates that timed out together don't keep splitting the vote.
        let timeout = ctx.configuration.timeout_interval_ms();
        let jitter = rand::thread_rng().gen_range(timeout..=timeout.saturating_mul(2));
        self.election_deadline_ms = now_ms.saturating_add(jitter);

        slog::info!(
            ctx.logger,
            "Starting election for term {:?} at {}. Position {}, deadline {}",
            term,
            now_ms,
            ctx.term_state.received_position(),
            self.election_deadline_ms
        );

        self.request_vote_pending = true;
        self.request_vote(ctx);
    }

    pub(crate) fn poll(
        &mut self,
        ctx: &mut RoleContext<'_>,
        fragment_limit: usize,
        now_ms: u64,
    ) -> Result<RoleOutcome, NodeError> {
        // A later term or a leader for this one was seen, but stepping down didn't go through.
        if ctx.term_state.voted_for() != Some(ctx.node_id()) || ctx.term_state.leader_id().is_some() {
            return Ok(RoleOutcome::transition(0, Transition::ToFollower));
        }

        if self.has_quorum(ctx) {
            return Ok(RoleOutcome::transition(0, Transition::ToLeader));
        }

        if now_ms >= self.election_deadline_ms {
            slog::info!(
                ctx.logger,
                "Election for term {:?} timed out with {} of {} votes",
                ctx.term_state.current_term(),
                self.votes.len(),
                ctx.configuration.election_quorum()
            );
            return Ok(RoleOutcome::transition(0, Transition::ToCandidate));
        }

        let mut work_count = 0;
        if self.request_vote_pending {
            work_count += self.request_vote(ctx);
        }

        let (read, messages) = self.control_subscription.poll_control(fragment_limit, ctx.logger);
        work_count += read;
        for body in messages {
            if let Some(transition) = self.on_message(ctx, body) {
                return Ok(RoleOutcome::transition(work_count, transition));
            }
        }

        if self.has_quorum(ctx) {
            return Ok(RoleOutcome::transition(work_count, Transition::ToLeader));
        }

        Ok(RoleOutcome::work(work_count))
    }

    fn on_message(&mut self, ctx: &mut RoleContext<'_>, body: Body) -> Option<Transition> {
        let me = ctx.node_id();
        let current_term = ctx.term_state.current_term();
        match body {
            Body::RequestVote(request) => {
                let candidate = ctx.member(request.candidate_id).filter(|id| *id != me)?;
                let term = Term::new(request.term);
                if ctx.term_state.adopt_term_if_higher(term) {
                    slog::info!(ctx.logger, "Candidate {} is running in later term {:?}, stepping down", candidate, term);
                    return Some(Transition::ToFollower);
                }

                if term == current_term {
                    // We voted for ourselves this term.
                    if let Err(e) = self
                        .control_publication
                        .save_reply_vote(me, candidate, term, Vote::Against)
                    {
                        slog::warn!(ctx.logger, "Failed to publish vote for {}: {}", candidate, e);
                    }
                }
                None
            }
            Body::ReplyVote(reply) => {
                let voter = ctx.member(reply.sender_id)?;
                let term = Term::new(reply.term);
                if ctx.term_state.adopt_term_if_higher(term) {
                    slog::info!(ctx.logger, "Node {} is in later term {:?}, stepping down", voter, term);
                    return Some(Transition::ToFollower);
                }

                if term < current_term || reply.candidate_id != me.as_u32() {
                    slog::debug!(ctx.logger, "Discarding vote from {} for term {:?}", voter, term);
                    return None;
                }

                if reply.granted() && self.votes.insert(voter) {
                    slog::info!(
                        ctx.logger,
                        "Got vote from {} in term {:?}. {} of {} votes",
                        voter,
                        term,
                        self.votes.len(),
                        ctx.configuration.election_quorum()
                    );
                }
                None
            }
            Body::Heartbeat(heartbeat) => {
                let leader = ctx.member(heartbeat.leader_id)?;
                let term = Term::new(heartbeat.term);
                if term < current_term {
                    return None;
                }

                ctx.term_state.adopt_term_if_higher(term);
                ctx.term_state.follow_leader(term, leader);
                slog::info!(ctx.logger, "Node {} leads term {:?}, stepping down", leader, term);
                Some(Transition::ToFollower)
            }
            Body::Acknowledgement(ack) => {
                if ctx.term_state.adopt_term_if_higher(Term::new(ack.term)) {
                    return Some(Transition::ToFollower);
                }
                None
            }
        }
    }

    /// Returns 1 if the request went out.
    fn request_vote(&mut self, ctx: &mut RoleContext<'_>) -> usize {
        let result = self.control_publication.save_request_vote(
            ctx.node_id(),
            ctx.term_state.current_term(),
            ctx.term_state.received_position(),
        );

        match result {
            Ok(_) => {
                self.request_vote_pending = false;
                1
            }
            Err(e) => {
                slog::debug!(ctx.logger, "Failed to request votes, will retry: {}", e);
                0
            }
        }
    }

    fn has_quorum(&self, ctx: &RoleContext<'_>) -> bool {
        self.votes.len() >= ctx.configuration.election_quorum()
    }

    pub(crate) fn close(&mut self) {
        self.control_publication.close();
        self.control_subscription.close();
    }
}
