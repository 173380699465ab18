use crate::transport::position::next_position;
use crate::transport::{ClaimError, Header, Publication, StreamIdentifier, Subscription, Transport, TransportError};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Models the broadcast transport as a shared commit log per stream. It exists so the replication
// core can be exercised in-process; real deployments plug in their own `Transport`.
//
// Every subscription replays its stream from position 0, which is the "shared commit log" reading
// of the transport contract. Subscribers dedupe by position.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    streams: Arc<Mutex<HashMap<StreamIdentifier, SharedStream>>>,
}

type SharedStream = Arc<Mutex<StreamLog>>;

#[derive(Default)]
struct StreamLog {
    frames: Vec<LoggedFrame>,
    tail_position: u64,
    next_session_id: i32,
    // Streams can be switched into back pressure to exercise publisher retry paths.
    back_pressured: bool,
}

#[derive(Clone)]
struct LoggedFrame {
    data: Bytes,
    header: Header,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self, stream: &StreamIdentifier) -> SharedStream {
        let mut streams = self
            .streams
            .lock()
            .expect("InMemoryTransport.stream() mutex guard poison");

        streams
            .entry(stream.clone())
            .or_insert_with(|| Arc::new(Mutex::new(StreamLog::default())))
            .clone()
    }

    /// Current tail position of `stream`.
    pub fn tail_position(&self, stream: &StreamIdentifier) -> u64 {
        self.stream(stream)
            .lock()
            .expect("InMemoryTransport.tail_position() mutex guard poison")
            .tail_position
    }

    /// While set, every offer on `stream` fails with `ClaimError::BackPressured`.
    pub fn set_back_pressured(&self, stream: &StreamIdentifier, back_pressured: bool) {
        self.stream(stream)
            .lock()
            .expect("InMemoryTransport.set_back_pressured() mutex guard poison")
            .back_pressured = back_pressured;
    }
}

impl Transport for InMemoryTransport {
    type Publication = InMemoryPublication;
    type Subscription = InMemorySubscription;

    fn add_publication(&self, stream: &StreamIdentifier) -> Result<Self::Publication, TransportError> {
        let log = self.stream(stream);
        let session_id = {
            let mut guard = log
                .lock()
                .expect("InMemoryTransport.add_publication() mutex guard poison");
            guard.next_session_id += 1;
            guard.next_session_id
        };

        Ok(InMemoryPublication {
            log: Some(log),
            session_id,
        })
    }

    fn add_subscription(&self, stream: &StreamIdentifier) -> Result<Self::Subscription, TransportError> {
        Ok(InMemorySubscription {
            log: Some(self.stream(stream)),
            next_frame: 0,
        })
    }
}

pub struct InMemoryPublication {
    // None once closed.
    log: Option<SharedStream>,
    session_id: i32,
}

impl Publication for InMemoryPublication {
    fn offer(&mut self, frame: &[u8]) -> Result<u64, ClaimError> {
        let log = self.log.as_ref().ok_or(ClaimError::Closed)?;
        let mut log = log.lock().expect("InMemoryPublication.offer() mutex guard poison");
        if log.back_pressured {
            return Err(ClaimError::BackPressured);
        }

        let position = next_position(log.tail_position, frame.len());
        log.tail_position = position;
        log.frames.push(LoggedFrame {
            data: Bytes::copy_from_slice(frame),
            header: Header {
                position,
                session_id: self.session_id,
            },
        });

        Ok(position)
    }

    fn session_id(&self) -> i32 {
        self.session_id
    }

    fn close(&mut self) {
        self.log.take();
    }
}

impl Drop for InMemoryPublication {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct InMemorySubscription {
    log: Option<SharedStream>,
    next_frame: usize,
}

impl Subscription for InMemorySubscription {
    fn poll(&mut self, handler: &mut dyn FnMut(&[u8], Header), fragment_limit: usize) -> usize {
        let log = match &self.log {
            Some(log) => log,
            None => return 0,
        };

        // Copy out under the lock, deliver without it. Handlers are allowed to publish to the
        // stream they're reading.
        let batch: Vec<LoggedFrame> = {
            let log = log.lock().expect("InMemorySubscription.poll() mutex guard poison");
            log.frames
                .iter()
                .skip(self.next_frame)
                .take(fragment_limit)
                .cloned()
                .collect()
        };

        self.next_frame += batch.len();
        for frame in batch.iter() {
            handler(&frame.data, frame.header);
        }

        batch.len()
    }

    fn close(&mut self) {
        self.log.take();
    }
}

impl Drop for InMemorySubscription {
    fn drop(&mut self) {
        self.close();
    }
}
