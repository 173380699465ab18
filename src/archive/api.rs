use bytes::Bytes;
use std::io;

/// A frame as stored in the archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchivedFrame {
    /// Stream position immediately after this frame.
    pub position: u64,
    pub data: Bytes,
}

/// Frames handed out by `Archive::read_from`. Reads that touch storage can fail part way.
pub type ArchivedFrames<'a> = Box<dyn Iterator<Item = Result<ArchivedFrame, ArchiveError>> + 'a>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The appended frame does not directly follow the last archived frame. Either an entry was
    /// missed or one was duplicated.
    #[error("Non-contiguous append: expected position {expected}, got {actual}")]
    PositionMismatch { expected: u64, actual: u64 },

    #[error("Position {0} is not a frame boundary in the archive")]
    UnknownPosition(u64),

    #[error("Archive is corrupt: {0}")]
    Corrupt(String),

    #[error("Archive IO failure")]
    Io(#[from] io::Error),
}

/// Archive is the durable, append-only store of the replicated log.
///
/// Frames are addressed by the stream position immediately after them, the same position the
/// transport delivers them with. The archive starts empty at position 0.
pub trait Archive {
    /// Append `frame`, which the transport delivered at `position`. The position must be exactly
    /// `next_position(self.position(), frame.len())`, otherwise `PositionMismatch` is returned and
    /// nothing is written.
    fn append(&mut self, position: u64, frame: &[u8]) -> Result<(), ArchiveError>;

    /// Lazily read every archived frame after `position`. `position` must be 0 or the position of
    /// an archived frame. Restartable from any previously returned position.
    fn read_from(&self, position: u64) -> Result<ArchivedFrames<'_>, ArchiveError>;

    /// Position after the last archived frame.
    fn position(&self) -> u64;
}
