use std::fmt;

/// Identifies one logical broadcast stream.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StreamIdentifier {
    channel: String,
    stream_id: i32,
}

impl StreamIdentifier {
    pub fn new(channel: impl Into<String>, stream_id: i32) -> Self {
        StreamIdentifier {
            channel: channel.into(),
            stream_id,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn stream_id(&self) -> i32 {
        self.stream_id
    }
}

impl fmt::Display for StreamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.channel, self.stream_id)
    }
}

/// Metadata delivered alongside every fragment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Header {
    /// Stream position immediately after this fragment.
    pub position: u64,
    /// Publication session that wrote the fragment.
    pub session_id: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to add publication for {stream}: {reason}")]
    AddPublication { stream: StreamIdentifier, reason: String },
    #[error("Failed to add subscription for {stream}: {reason}")]
    AddSubscription { stream: StreamIdentifier, reason: String },
}

/// Outcome of a single, failed, non-blocking claim attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ClaimError {
    #[error("Publication is back pressured")]
    BackPressured,
    #[error("Publication has no connected subscribers")]
    NotConnected,
    #[error("Publication is performing an administrative action")]
    AdminAction,
    #[error("Publication is closed")]
    Closed,
}

impl ClaimError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ClaimError::Closed)
    }
}

/// The ordered, position-addressed, at-least-once broadcast primitive replication runs over.
///
/// Handles returned here are exclusively owned by whoever opened them. Dropping or closing a
/// handle releases it.
pub trait Transport {
    type Publication: Publication;
    type Subscription: Subscription;

    fn add_publication(&self, stream: &StreamIdentifier) -> Result<Self::Publication, TransportError>;

    fn add_subscription(&self, stream: &StreamIdentifier) -> Result<Self::Subscription, TransportError>;
}

pub trait Publication {
    /// One non-blocking claim-and-commit of `frame`. Returns the stream position after the frame.
    fn offer(&mut self, frame: &[u8]) -> Result<u64, ClaimError>;

    fn session_id(&self) -> i32;

    /// Idempotent.
    fn close(&mut self);
}

pub trait Subscription {
    /// Deliver up to `fragment_limit` fragments, in strictly increasing position order, to
    /// `handler`. Returns the number delivered. Never blocks.
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8], Header), fragment_limit: usize) -> usize;

    /// Idempotent.
    fn close(&mut self);
}
