//! Control and acknowledgement stream wire format. Every frame on those streams is one
//! `ControlMessage`. Data stream frames are the relayed bytes themselves and don't go through here.

use prost::Message;

#[derive(Clone, PartialEq, prost::Message)]
pub struct ControlMessage {
    #[prost(oneof = "control_message::Body", tags = "1, 2, 3, 4")]
    pub body: Option<control_message::Body>,
}

pub mod control_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        RequestVote(super::RequestVote),
        #[prost(message, tag = "2")]
        ReplyVote(super::ReplyVote),
        #[prost(message, tag = "3")]
        Heartbeat(super::ConsensusHeartbeat),
        #[prost(message, tag = "4")]
        Acknowledgement(super::MessageAcknowledgement),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RequestVote {
    #[prost(uint32, tag = "1")]
    pub candidate_id: u32,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    /// Last position the candidate has archived. Voters refuse candidates behind them.
    #[prost(uint64, tag = "3")]
    pub last_ack_position: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReplyVote {
    #[prost(uint32, tag = "1")]
    pub sender_id: u32,
    #[prost(uint32, tag = "2")]
    pub candidate_id: u32,
    #[prost(uint64, tag = "3")]
    pub term: u64,
    #[prost(enumeration = "Vote", tag = "4")]
    pub vote: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ConsensusHeartbeat {
    #[prost(uint32, tag = "1")]
    pub leader_id: u32,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    /// Leader's archived position.
    #[prost(uint64, tag = "3")]
    pub position: u64,
    #[prost(uint64, tag = "4")]
    pub commit_position: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageAcknowledgement {
    #[prost(uint32, tag = "1")]
    pub sender_id: u32,
    #[prost(uint64, tag = "2")]
    pub term: u64,
    #[prost(uint64, tag = "3")]
    pub position: u64,
    #[prost(enumeration = "AcknowledgementStatus", tag = "4")]
    pub status: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Vote {
    Against = 0,
    For = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AcknowledgementStatus {
    Ok = 0,
    /// The follower could not archive at the position it was handed.
    WrongPosition = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlFrameError {
    #[error("Failed to decode control frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Control frame has no body")]
    MissingBody,
}

impl ControlMessage {
    pub fn new(body: control_message::Body) -> Self {
        ControlMessage { body: Some(body) }
    }

    pub fn encode_frame(&self) -> Result<Vec<u8>, prost::EncodeError> {
        let mut frame = Vec::with_capacity(self.encoded_len());
        self.encode(&mut frame)?;
        Ok(frame)
    }

    pub fn decode_frame(frame: &[u8]) -> Result<control_message::Body, ControlFrameError> {
        ControlMessage::decode(frame)?.body.ok_or(ControlFrameError::MissingBody)
    }
}

impl ReplyVote {
    pub fn granted(&self) -> bool {
        Vote::from_i32(self.vote) == Some(Vote::For)
    }
}
