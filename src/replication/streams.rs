use crate::replication::messages::{control_message::Body, ControlMessage};
use crate::replication::{FailCounter, RaftNodeConfiguration, RaftPublication};
use crate::transport::{Header, StreamIdentifier, Subscription, Transport, TransportError};
use bytes::Bytes;

/// A subscription owned by one role's tenure. Closed when dropped.
pub(crate) struct RaftSubscription<S: Subscription> {
    subscription: S,
}

impl<S: Subscription> RaftSubscription<S> {
    pub(crate) fn new(subscription: S) -> Self {
        RaftSubscription { subscription }
    }

    /// Poll raw fragments. Copies them out so the caller can act on them with full access to its
    /// own state.
    pub(crate) fn poll_fragments(&mut self, fragment_limit: usize) -> Vec<(Bytes, Header)> {
        let mut fragments = Vec::new();
        self.subscription.poll(
            &mut |buffer, header| fragments.push((Bytes::copy_from_slice(buffer), header)),
            fragment_limit,
        );
        fragments
    }

    /// Poll and decode control messages. Returns the number of fragments read, undecodable ones
    /// included, and the decoded messages.
    pub(crate) fn poll_control(&mut self, fragment_limit: usize, logger: &slog::Logger) -> (usize, Vec<Body>) {
        let mut messages = Vec::new();
        let fragments = self.subscription.poll(
            &mut |buffer, header| match ControlMessage::decode_frame(buffer) {
                Ok(body) => messages.push(body),
                Err(e) => slog::warn!(logger, "Dropping undecodable control frame at {}: {}", header.position, e),
            },
            fragment_limit,
        );
        (fragments, messages)
    }

    pub(crate) fn close(&mut self) {
        self.subscription.close();
    }
}

impl<S: Subscription> Drop for RaftSubscription<S> {
    fn drop(&mut self) {
        self.subscription.close();
    }
}

/// Opens role stream handles as configured.
pub(crate) struct StreamFactory<'a, T: Transport> {
    pub(crate) transport: &'a T,
    pub(crate) configuration: &'a RaftNodeConfiguration,
    pub(crate) fail_counter: &'a FailCounter,
}

impl<'a, T: Transport> StreamFactory<'a, T> {
    pub(crate) fn publication(
        &self,
        stream: &StreamIdentifier,
    ) -> Result<RaftPublication<T::Publication>, TransportError> {
        let publication = self.transport.add_publication(stream)?;

        Ok(RaftPublication::new(
            publication,
            self.configuration.max_claim_attempts(),
            self.configuration.idle_policy().new_strategy(),
            self.fail_counter.clone(),
        ))
    }

    pub(crate) fn subscription(
        &self,
        stream: &StreamIdentifier,
    ) -> Result<RaftSubscription<T::Subscription>, TransportError> {
        Ok(RaftSubscription::new(self.transport.add_subscription(stream)?))
    }
}
