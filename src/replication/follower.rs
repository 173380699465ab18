use crate::replication::context::RoleContext;
use crate::replication::messages::{control_message::Body, AcknowledgementStatus, ConsensusHeartbeat, RequestVote, Vote};
use crate::replication::streams::{RaftSubscription, StreamFactory};
use crate::replication::{NodeError, RaftPublication, RoleOutcome, Term, Transition};
use crate::transport::{Transport, TransportError};

/// Follower replicates the data stream into the archive and acknowledges it, and stands for
/// election when the leader goes quiet.
pub(crate) struct Follower<T: Transport> {
    control_subscription: RaftSubscription<T::Subscription>,
    control_publication: RaftPublication<T::Publication>,
    data_subscription: RaftSubscription<T::Subscription>,
    acknowledgement_publication: RaftPublication<T::Publication>,
    timeout_deadline_ms: u64,
    // Set once a control poll came back short of the limit, i.e. the commit position we hold is
    // as recent as the stream. Acknowledgements wait for it.
    caught_up: bool,
    // The received position still has to be acknowledged.
    acknowledgement_pending: bool,
}

impl<T: Transport> Follower<T> {
    pub(crate) fn open(streams: &StreamFactory<'_, T>) -> Result<Self, TransportError> {
        let config = streams.configuration.streams();
        Ok(Follower {
            control_subscription: streams.subscription(&config.control)?,
            control_publication: streams.publication(&config.control)?,
            data_subscription: streams.subscription(&config.data)?,
            acknowledgement_publication: streams.publication(&config.acknowledgement)?,
            timeout_deadline_ms: 0,
            caught_up: false,
            acknowledgement_pending: false,
        })
    }

    /// Entry action. The received position is acknowledged once the control stream has been read
    /// up to date, unless it turns out to be committed already.
    pub(crate) fn follow(&mut self, ctx: &mut RoleContext<'_>, now_ms: u64) {
        self.reset_timeout(ctx, now_ms);
        self.acknowledgement_pending = true;
    }

    pub(crate) fn poll(
        &mut self,
        ctx: &mut RoleContext<'_>,
        fragment_limit: usize,
        now_ms: u64,
    ) -> Result<RoleOutcome, NodeError> {
        if now_ms >= self.timeout_deadline_ms {
            slog::info!(
                ctx.logger,
                "No heartbeat since {} (now {}), standing for election. Term={:?}",
                self.timeout_deadline_ms.saturating_sub(ctx.configuration.timeout_interval_ms()),
                now_ms,
                ctx.term_state.current_term()
            );
            return Ok(RoleOutcome::transition(0, Transition::ToCandidate));
        }

        let mut work_count = 0;
        let (read, messages) = self.control_subscription.poll_control(fragment_limit, ctx.logger);
        work_count += read;
        if read < fragment_limit {
            self.caught_up = true;
        }
        for body in messages {
            match body {
                Body::RequestVote(request) => self.on_request_vote(ctx, request, now_ms),
                Body::Heartbeat(heartbeat) => self.on_heartbeat(ctx, heartbeat, now_ms),
                Body::ReplyVote(reply) => {
                    ctx.term_state.adopt_term_if_higher(Term::new(reply.term));
                }
                Body::Acknowledgement(ack) => {
                    ctx.term_state.adopt_term_if_higher(Term::new(ack.term));
                }
            }
        }

        for (data, header) in self.data_subscription.poll_fragments(fragment_limit) {
            work_count += 1;
            match ctx.archive_fragment(&data, header) {
                Ok(Some(_)) => {
                    self.acknowledgement_pending = true;
                    work_count += self.acknowledge_if_pending(ctx);
                }
                Ok(None) => {}
                Err(e) => {
                    self.report_wrong_position(ctx, header.position);
                    return Err(e);
                }
            }
        }

        work_count += self.acknowledge_if_pending(ctx);
        work_count += ctx.deliver_committed()?;
        Ok(RoleOutcome::work(work_count))
    }

    fn on_request_vote(&mut self, ctx: &mut RoleContext<'_>, request: RequestVote, now_ms: u64) {
        let candidate = match ctx.member(request.candidate_id) {
            Some(candidate) if candidate != ctx.node_id() => candidate,
            _ => return,
        };

        let term = Term::new(request.term);
        if term < ctx.term_state.current_term() {
            slog::debug!(ctx.logger, "Discarding stale vote request from {} for term {:?}", candidate, term);
            return;
        }
        ctx.term_state.adopt_term_if_higher(term);

        let granted = request.last_ack_position >= ctx.term_state.received_position()
            && ctx.term_state.vote_for_if_unvoted(term, candidate);
        let vote = if granted { Vote::For } else { Vote::Against };
        slog::info!(
            ctx.logger,
            "Voting {:?} candidate {} in term {:?}. Candidate position {}, ours {}",
            vote,
            candidate,
            term,
            request.last_ack_position,
            ctx.term_state.received_position()
        );

        if let Err(e) = self
            .control_publication
            .save_reply_vote(ctx.node_id(), candidate, term, vote)
        {
            slog::warn!(ctx.logger, "Failed to publish vote for {}: {}", candidate, e);
        }

        if granted {
            self.reset_timeout(ctx, now_ms);
        }
    }

    fn on_heartbeat(&mut self, ctx: &mut RoleContext<'_>, heartbeat: ConsensusHeartbeat, now_ms: u64) {
        let leader = match ctx.member(heartbeat.leader_id) {
            Some(leader) if leader != ctx.node_id() => leader,
            _ => return,
        };

        let term = Term::new(heartbeat.term);
        if term < ctx.term_state.current_term() {
            slog::debug!(ctx.logger, "Discarding heartbeat from stale leader {} of term {:?}", leader, term);
            return;
        }

        ctx.term_state.adopt_term_if_higher(term);
        if ctx.term_state.follow_leader(term, leader) {
            slog::info!(
                ctx.logger,
                "Following leader {} in term {:?}. Leader position {}, commit {}",
                leader,
                term,
                heartbeat.position,
                heartbeat.commit_position
            );
            // New leader has an empty acknowledgement table.
            self.acknowledgement_pending = true;
        }

        self.reset_timeout(ctx, now_ms);
        if ctx.term_state.advance_commit_position(heartbeat.commit_position) {
            slog::debug!(ctx.logger, "Commit position advanced to {}", heartbeat.commit_position);
        }
    }

    /// Acknowledge the received position if it is owed. Positions at or below the commit position
    /// are already durable on a quorum and are never acknowledged. Returns 1 if published.
    fn acknowledge_if_pending(&mut self, ctx: &mut RoleContext<'_>) -> usize {
        if !self.acknowledgement_pending || !self.caught_up {
            return 0;
        }

        let position = ctx.term_state.received_position();
        if position <= ctx.term_state.commit_position() {
            self.acknowledgement_pending = false;
            return 0;
        }

        let result = self.acknowledgement_publication.save_message_acknowledgement(
            ctx.node_id(),
            ctx.term_state.current_term(),
            position,
            AcknowledgementStatus::Ok,
        );

        match result {
            Ok(_) => {
                self.acknowledgement_pending = false;
                1
            }
            Err(e) => {
                slog::debug!(ctx.logger, "Failed to acknowledge position {}, will retry: {}", position, e);
                0
            }
        }
    }

    // Best effort. The node halts right after.
    fn report_wrong_position(&mut self, ctx: &mut RoleContext<'_>, position: u64) {
        let _ = self.acknowledgement_publication.save_message_acknowledgement(
            ctx.node_id(),
            ctx.term_state.current_term(),
            position,
            AcknowledgementStatus::WrongPosition,
        );
    }

    fn reset_timeout(&mut self, ctx: &RoleContext<'_>, now_ms: u64) {
        self.timeout_deadline_ms = now_ms.saturating_add(ctx.configuration.timeout_interval_ms());
    }

    pub(crate) fn close(&mut self) {
        self.control_subscription.close();
        self.control_publication.close();
        self.data_subscription.close();
        self.acknowledgement_publication.close();
    }
}
