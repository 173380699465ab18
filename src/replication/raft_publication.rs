use crate::replication::messages::{
    control_message::Body, AcknowledgementStatus, ConsensusHeartbeat, ControlMessage, MessageAcknowledgement,
    ReplyVote, RequestVote, Vote,
};
use crate::replication::{FailCounter, IdleStrategy, NodeId, Term};
use crate::transport::{ClaimError, Publication};

#[derive(Debug, thiserror::Error)]
pub enum PublishFailure {
    /// Every claim attempt failed. Non-fatal; try again next poll.
    #[error("Gave up after {attempts} claim attempts, last failure: {last}")]
    BackPressured { attempts: usize, last: ClaimError },

    #[error("Publication is closed")]
    Closed,

    #[error("Failed to encode message")]
    Encode(#[from] prost::EncodeError),
}

/// RaftPublication turns "broadcast this frame" into a bounded number of non-blocking claims.
///
/// It never blocks the poll loop indefinitely: after `max_claim_attempts` it gives up, bumps the
/// fail counter and reports back pressure. A frame is published exactly once per successful call.
pub struct RaftPublication<P: Publication> {
    publication: P,
    max_claim_attempts: usize,
    idle_strategy: Box<dyn IdleStrategy>,
    fail_counter: FailCounter,
}

impl<P: Publication> RaftPublication<P> {
    pub fn new(
        publication: P,
        max_claim_attempts: usize,
        idle_strategy: Box<dyn IdleStrategy>,
        fail_counter: FailCounter,
    ) -> Self {
        assert!(max_claim_attempts > 0, "Need at least one claim attempt");
        RaftPublication {
            publication,
            max_claim_attempts,
            idle_strategy,
            fail_counter,
        }
    }

    /// Returns the stream position after `frame`.
    pub fn publish(&mut self, frame: &[u8]) -> Result<u64, PublishFailure> {
        let mut last = ClaimError::BackPressured;
        for _ in 0..self.max_claim_attempts {
            match self.publication.offer(frame) {
                Ok(position) => {
                    self.idle_strategy.reset();
                    return Ok(position);
                }
                Err(e) if !e.is_retryable() => {
                    self.fail_counter.increment();
                    return Err(PublishFailure::Closed);
                }
                Err(e) => {
                    last = e;
                    self.idle_strategy.idle();
                }
            }
        }

        self.idle_strategy.reset();
        self.fail_counter.increment();
        Err(PublishFailure::BackPressured {
            attempts: self.max_claim_attempts,
            last,
        })
    }

    pub fn close(&mut self) {
        self.publication.close();
    }

    pub fn save_request_vote(
        &mut self,
        candidate_id: NodeId,
        term: Term,
        last_ack_position: u64,
    ) -> Result<u64, PublishFailure> {
        self.publish_control(Body::RequestVote(RequestVote {
            candidate_id: candidate_id.as_u32(),
            term: term.as_u64(),
            last_ack_position,
        }))
    }

    pub fn save_reply_vote(
        &mut self,
        sender_id: NodeId,
        candidate_id: NodeId,
        term: Term,
        vote: Vote,
    ) -> Result<u64, PublishFailure> {
        self.publish_control(Body::ReplyVote(ReplyVote {
            sender_id: sender_id.as_u32(),
            candidate_id: candidate_id.as_u32(),
            term: term.as_u64(),
            vote: vote as i32,
        }))
    }

    pub fn save_heartbeat(
        &mut self,
        leader_id: NodeId,
        term: Term,
        position: u64,
        commit_position: u64,
    ) -> Result<u64, PublishFailure> {
        self.publish_control(Body::Heartbeat(ConsensusHeartbeat {
            leader_id: leader_id.as_u32(),
            term: term.as_u64(),
            position,
            commit_position,
        }))
    }

    pub fn save_message_acknowledgement(
        &mut self,
        sender_id: NodeId,
        term: Term,
        position: u64,
        status: AcknowledgementStatus,
    ) -> Result<u64, PublishFailure> {
        self.publish_control(Body::Acknowledgement(MessageAcknowledgement {
            sender_id: sender_id.as_u32(),
            term: term.as_u64(),
            position,
            status: status as i32,
        }))
    }

    fn publish_control(&mut self, body: Body) -> Result<u64, PublishFailure> {
        let frame = ControlMessage::new(body).encode_frame()?;
        self.publish(&frame)
    }
}

impl<P: Publication> Drop for RaftPublication<P> {
    fn drop(&mut self) {
        self.publication.close();
    }
}
