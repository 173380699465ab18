use crate::replication::NodeId;
use chrono::Utc;
use slog::Drain;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

/// Colored terminal output, tagged with the node id.
pub fn create_root_logger_for_stdout(node_id: NodeId) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!("Node" => node_id.to_string()))
}

/// Plain text log under `directory/info_log_<node>/`, one file per process start.
pub fn create_root_logger_for_file(directory: &Path, node_id: NodeId) -> io::Result<slog::Logger> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let log_directory = directory.join(format!("info_log_{}", node_id));
    fs::create_dir_all(&log_directory)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_directory.join(format!("{}_info.log", now)))?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!()))
}

pub fn create_discarding_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
