//! This mod holds the code for creating and configuring a node.
mod logging;
mod options;
mod wiring;

pub use logging::create_discarding_logger;
pub use logging::create_root_logger_for_file;
pub use logging::create_root_logger_for_stdout;
pub use options::RaftNodeOptions;
pub use wiring::try_create_raft_node;
pub use wiring::RaftNodeConfig;
pub use wiring::RaftNodeCreationError;
