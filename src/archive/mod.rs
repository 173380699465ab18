mod api;
mod file;
mod in_memory;

pub use api::Archive;
pub use api::ArchiveError;
pub use api::ArchivedFrame;
pub use api::ArchivedFrames;
pub use file::FileArchive;
pub use in_memory::InMemoryArchive;
