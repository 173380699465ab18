use crate::replication::acknowledgement::AcknowledgementTable;
use crate::replication::context::RoleContext;
use crate::replication::messages::{control_message::Body, AcknowledgementStatus, MessageAcknowledgement, Vote};
use crate::replication::streams::{RaftSubscription, StreamFactory};
use crate::replication::{NodeError, RaftPublication, RoleOutcome, Term, Transition};
use crate::transport::{Transport, TransportError};
use bytes::Bytes;
use std::collections::VecDeque;

/// Leader relays inbound traffic into the data stream, archives it like everyone else and works
/// out the commit position from follower acknowledgements.
pub(crate) struct Leader<T: Transport> {
    data_publication: RaftPublication<T::Publication>,
    data_subscription: RaftSubscription<T::Subscription>,
    control_publication: RaftPublication<T::Publication>,
    control_subscription: RaftSubscription<T::Subscription>,
    acknowledgement_subscription: RaftSubscription<T::Subscription>,
    inbound_subscription: RaftSubscription<T::Subscription>,
    acknowledgements: AcknowledgementTable,
    // Inbound frames read but not yet published, with their inbound position.
    pending: VecDeque<(Bytes, u64)>,
    next_heartbeat_ms: u64,
}

impl<T: Transport> Leader<T> {
    pub(crate) fn open(streams: &StreamFactory<'_, T>) -> Result<Self, TransportError> {
        let configuration = streams.configuration;
        let config = configuration.streams();
        Ok(Leader {
            data_publication: streams.publication(&config.data)?,
            data_subscription: streams.subscription(&config.data)?,
            control_publication: streams.publication(&config.control)?,
            control_subscription: streams.subscription(&config.control)?,
            acknowledgement_subscription: streams.subscription(&config.acknowledgement)?,
            inbound_subscription: streams.subscription(&config.inbound)?,
            acknowledgements: AcknowledgementTable::new(configuration.other_nodes().iter()),
            pending: VecDeque::new(),
            next_heartbeat_ms: 0,
        })
    }

    /// Entry action.
    pub(crate) fn gets_elected(&mut self, ctx: &mut RoleContext<'_>, now_ms: u64) {
        ctx.term_state.become_leader(ctx.node_id());
        slog::info!(
            ctx.logger,
            "Elected leader of term {:?} at {}. Position {}, commit {}",
            ctx.term_state.leadership_term(),
            now_ms,
            ctx.term_state.received_position(),
            ctx.term_state.commit_position()
        );

        self.next_heartbeat_ms = now_ms;
        self.heartbeat_if_due(ctx, now_ms);
    }

    pub(crate) fn poll(
        &mut self,
        ctx: &mut RoleContext<'_>,
        fragment_limit: usize,
        now_ms: u64,
    ) -> Result<RoleOutcome, NodeError> {
        if ctx.term_state.current_term() > ctx.term_state.leadership_term() {
            return Ok(RoleOutcome::transition(0, Transition::ToFollower));
        }

        let mut work_count = 0;

        let (read, messages) = self.control_subscription.poll_control(fragment_limit, ctx.logger);
        work_count += read;
        for body in messages {
            if self.on_control_message(ctx, body) {
                return Ok(RoleOutcome::transition(work_count, Transition::ToFollower));
            }
        }

        let (read, messages) = self
            .acknowledgement_subscription
            .poll_control(fragment_limit, ctx.logger);
        work_count += read;
        for body in messages {
            if self.on_control_message(ctx, body) {
                return Ok(RoleOutcome::transition(work_count, Transition::ToFollower));
            }
        }

        for (data, header) in self.data_subscription.poll_fragments(fragment_limit) {
            work_count += 1;
            ctx.archive_fragment(&data, header)?;
        }

        self.update_commit_position(ctx);
        work_count += self.relay_inbound(ctx, fragment_limit);
        work_count += self.heartbeat_if_due(ctx, now_ms);
        work_count += ctx.deliver_committed()?;

        Ok(RoleOutcome::work(work_count))
    }

    /// Returns true if a later term was seen and we must step down.
    fn on_control_message(&mut self, ctx: &mut RoleContext<'_>, body: Body) -> bool {
        let me = ctx.node_id();
        let leadership_term = ctx.term_state.leadership_term();
        match body {
            Body::RequestVote(request) => {
                let candidate = match ctx.member(request.candidate_id) {
                    Some(candidate) if candidate != me => candidate,
                    _ => return false,
                };
                let term = Term::new(request.term);
                if self.supersedes(ctx, term) {
                    return true;
                }

                if term == leadership_term {
                    if let Err(e) = self
                        .control_publication
                        .save_reply_vote(me, candidate, term, Vote::Against)
                    {
                        slog::warn!(ctx.logger, "Failed to publish vote for {}: {}", candidate, e);
                    }
                }
                false
            }
            Body::Heartbeat(heartbeat) => {
                let leader = match ctx.member(heartbeat.leader_id) {
                    Some(leader) if leader != me => leader,
                    _ => return false,
                };
                let term = Term::new(heartbeat.term);
                if self.supersedes(ctx, term) {
                    return true;
                }

                if term == leadership_term {
                    slog::error!(ctx.logger, "Node {} also claims leadership of term {:?}", leader, term);
                }
                false
            }
            Body::ReplyVote(reply) => self.supersedes(ctx, Term::new(reply.term)),
            Body::Acknowledgement(ack) => self.on_acknowledgement(ctx, ack),
        }
    }

    fn on_acknowledgement(&mut self, ctx: &mut RoleContext<'_>, ack: MessageAcknowledgement) -> bool {
        let follower = match ctx.member(ack.sender_id) {
            Some(follower) if follower != ctx.node_id() => follower,
            _ => return false,
        };

        let term = Term::new(ack.term);
        if self.supersedes(ctx, term) {
            return true;
        }

        if term < ctx.term_state.leadership_term() {
            slog::debug!(ctx.logger, "Discarding acknowledgement from {} for stale term {:?}", follower, term);
            return false;
        }

        if AcknowledgementStatus::from_i32(ack.status) != Some(AcknowledgementStatus::Ok) {
            slog::warn!(ctx.logger, "Follower {} could not archive position {}", follower, ack.position);
            return false;
        }

        if self.acknowledgements.position_of(follower) < Some(ack.position) {
            slog::debug!(ctx.logger, "Follower {} acknowledged position {}", follower, ack.position);
        }
        self.acknowledgements.acknowledge(follower, ack.position);
        false
    }

    fn supersedes(&self, ctx: &mut RoleContext<'_>, term: Term) -> bool {
        if ctx.term_state.adopt_term_if_higher(term) {
            slog::info!(
                ctx.logger,
                "Saw later term {:?}, stepping down from leadership of term {:?}",
                term,
                ctx.term_state.leadership_term()
            );
            return true;
        }
        false
    }

    fn update_commit_position(&mut self, ctx: &mut RoleContext<'_>) {
        let commit_position = self
            .acknowledgements
            .commit_position(ctx.term_state.received_position(), ctx.acknowledgement_strategy);
        if ctx.term_state.advance_commit_position(commit_position) {
            slog::debug!(ctx.logger, "Commit position advanced to {}", commit_position);
        }
    }

    /// Publish pending inbound frames, reading more only once the backlog is clear.
    fn relay_inbound(&mut self, ctx: &mut RoleContext<'_>, fragment_limit: usize) -> usize {
        let mut work_count = 0;
        if self.pending.is_empty() {
            for (data, header) in self.inbound_subscription.poll_fragments(fragment_limit) {
                work_count += 1;
                if header.position > *ctx.relayed_inbound_position {
                    self.pending.push_back((data, header.position));
                }
            }
        }

        while let Some((data, inbound_position)) = self.pending.front() {
            match self.data_publication.publish(data) {
                Ok(position) => {
                    slog::debug!(ctx.logger, "Relayed inbound {} to data position {}", inbound_position, position);
                    *ctx.relayed_inbound_position = *inbound_position;
                    self.pending.pop_front();
                    work_count += 1;
                }
                Err(e) => {
                    slog::debug!(ctx.logger, "Relay stalled with {} frames pending: {}", self.pending.len(), e);
                    break;
                }
            }
        }

        work_count
    }

    /// Returns 1 if a heartbeat went out.
    fn heartbeat_if_due(&mut self, ctx: &mut RoleContext<'_>, now_ms: u64) -> usize {
        if now_ms < self.next_heartbeat_ms {
            return 0;
        }

        let result = self.control_publication.save_heartbeat(
            ctx.node_id(),
            ctx.term_state.leadership_term(),
            ctx.term_state.received_position(),
            ctx.term_state.commit_position(),
        );

        match result {
            Ok(_) => {
                self.next_heartbeat_ms = now_ms.saturating_add(ctx.configuration.heartbeat_interval_ms());
                1
            }
            Err(e) => {
                // Stay due, so the next poll tries again.
                slog::debug!(ctx.logger, "Failed to publish heartbeat: {}", e);
                0
            }
        }
    }

    pub(crate) fn close(&mut self) {
        self.data_publication.close();
        self.data_subscription.close();
        self.control_publication.close();
        self.control_subscription.close();
        self.acknowledgement_subscription.close();
        self.inbound_subscription.close();
    }
}
