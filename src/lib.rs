mod api;
mod archive;
mod duty_cycle;
mod replication;
mod transport;

pub use api::create_discarding_logger;
pub use api::create_root_logger_for_file;
pub use api::create_root_logger_for_stdout;
pub use api::try_create_raft_node;
pub use api::RaftNodeConfig;
pub use api::RaftNodeCreationError;
pub use api::RaftNodeOptions;
pub use archive::Archive;
pub use archive::ArchiveError;
pub use archive::ArchivedFrame;
pub use archive::ArchivedFrames;
pub use archive::FileArchive;
pub use archive::InMemoryArchive;
pub use duty_cycle::current_time_ms;
pub use duty_cycle::run_duty_cycle;
pub use duty_cycle::shutdown_signal;
pub use duty_cycle::ShutdownHandle;
pub use duty_cycle::ShutdownSignal;
pub use replication::control_message;
pub use replication::AcknowledgementStatus;
pub use replication::AcknowledgementStrategy;
pub use replication::BackoffIdleStrategy;
pub use replication::BusySpinIdleStrategy;
pub use replication::ClusterFragmentHandler;
pub use replication::ClusterHeader;
pub use replication::ClusterStreams;
pub use replication::ConsensusHeartbeat;
pub use replication::ControlFrameError;
pub use replication::ControlMessage;
pub use replication::EntireClusterAcknowledgementStrategy;
pub use replication::FailCounter;
pub use replication::IdlePolicy;
pub use replication::IdleStrategy;
pub use replication::InvalidTransition;
pub use replication::MessageAcknowledgement;
pub use replication::NoOpIdleStrategy;
pub use replication::NodeError;
pub use replication::NodeId;
pub use replication::PublishFailure;
pub use replication::QuorumAcknowledgementStrategy;
pub use replication::RaftNode;
pub use replication::RaftNodeConfiguration;
pub use replication::RaftPublication;
pub use replication::ReplyVote;
pub use replication::RequestVote;
pub use replication::RoleChange;
pub use replication::RoleChangeListener;
pub use replication::RoleKind;
pub use replication::Term;
pub use replication::TermState;
pub use replication::Transition;
pub use replication::Vote;
pub use replication::YieldingIdleStrategy;
pub use transport::align;
pub use transport::next_position;
pub use transport::ClaimError;
pub use transport::Header;
pub use transport::InMemoryPublication;
pub use transport::InMemorySubscription;
pub use transport::InMemoryTransport;
pub use transport::Publication;
pub use transport::StreamIdentifier;
pub use transport::Subscription;
pub use transport::Transport;
pub use transport::TransportError;
pub use transport::DATA_HEADER_LENGTH;
pub use transport::FRAME_ALIGNMENT;

// `crate::{root_mod}` holds no code, only `mod` and `pub use` statements. Modules are never `pub`;
// types are exported individually so each module can be organized freely.
