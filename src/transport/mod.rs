mod api;
mod in_memory;
mod position;

pub use api::ClaimError;
pub use api::Header;
pub use api::Publication;
pub use api::StreamIdentifier;
pub use api::Subscription;
pub use api::Transport;
pub use api::TransportError;
pub use in_memory::InMemoryPublication;
pub use in_memory::InMemorySubscription;
pub use in_memory::InMemoryTransport;
pub use position::align;
pub use position::next_position;
pub use position::DATA_HEADER_LENGTH;
pub use position::FRAME_ALIGNMENT;
