use crate::archive::{Archive, ArchiveError, ArchivedFrame, ArchivedFrames};
use crate::transport::next_position;
use bytes::Bytes;

// Not durable. Useful for tests and for nodes whose durability comes from their peers.
#[derive(Default)]
pub struct InMemoryArchive {
    frames: Vec<ArchivedFrame>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Archive for InMemoryArchive {
    fn append(&mut self, position: u64, frame: &[u8]) -> Result<(), ArchiveError> {
        let expected = next_position(self.position(), frame.len());
        if expected != position {
            return Err(ArchiveError::PositionMismatch {
                expected,
                actual: position,
            });
        }

        self.frames.push(ArchivedFrame {
            position,
            data: Bytes::copy_from_slice(frame),
        });
        Ok(())
    }

    fn read_from(&self, position: u64) -> Result<ArchivedFrames<'_>, ArchiveError> {
        let start = self.frames.partition_point(|frame| frame.position <= position);
        let on_boundary = position == 0 || (start > 0 && self.frames[start - 1].position == position);
        if !on_boundary {
            return Err(ArchiveError::UnknownPosition(position));
        }

        Ok(Box::new(self.frames[start..].iter().cloned().map(Ok)))
    }

    fn position(&self) -> u64 {
        self.frames.last().map(|frame| frame.position).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(archive: &InMemoryArchive, from: u64) -> Vec<u64> {
        archive
            .read_from(from)
            .unwrap()
            .map(|frame| frame.unwrap().position)
            .collect()
    }

    #[test]
    fn append_and_read_from() {
        let mut archive = InMemoryArchive::new();
        assert_eq!(archive.position(), 0);

        archive.append(96, &[1u8; 50]).unwrap();
        archive.append(160, &[2u8; 10]).unwrap();
        archive.append(224, &[3u8; 20]).unwrap();
        assert_eq!(archive.position(), 224);

        assert_eq!(positions(&archive, 0), vec![96, 160, 224]);
        assert_eq!(positions(&archive, 96), vec![160, 224]);
        assert_eq!(positions(&archive, 224), Vec::<u64>::new());

        let first = archive.read_from(0).unwrap().next().unwrap().unwrap();
        assert_eq!(first.data, Bytes::from(vec![1u8; 50]));
    }

    #[test]
    fn rejects_gap_and_duplicate() {
        let mut archive = InMemoryArchive::new();
        archive.append(96, &[0u8; 50]).unwrap();

        // Duplicate of the first frame.
        match archive.append(96, &[0u8; 50]) {
            Err(ArchiveError::PositionMismatch { expected, actual }) => {
                assert_eq!(expected, 192);
                assert_eq!(actual, 96);
            }
            other => panic!("Unexpected result {:?}", other),
        }

        // Skips a frame.
        assert!(matches!(
            archive.append(320, &[0u8; 50]),
            Err(ArchiveError::PositionMismatch { .. })
        ));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn read_from_requires_frame_boundary() {
        let mut archive = InMemoryArchive::new();
        archive.append(96, &[0u8; 50]).unwrap();

        assert!(matches!(archive.read_from(50), Err(ArchiveError::UnknownPosition(50))));
        assert!(matches!(archive.read_from(500), Err(ArchiveError::UnknownPosition(500))));
    }
}
