use crate::archive::{Archive, ArchiveError, ArchivedFrame, ArchivedFrames};
use crate::transport::next_position;
use bytes::Bytes;
use std::convert::TryFrom;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

// Record layout, little endian:
//
// ```text
// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 10| 11| 12 ...        |
// +---+---+---+---+---+---+---+---+---+---+---+---+----...--------+
// |        Position (8 bytes)     | Length (4 bytes)| Data         |
// +-------------------------------+-----------------+----...------+
// ```
//
// A record that is cut short by a crash is dropped on open. Only record locations are kept in
// memory; frame data is read back from the file on demand.
const RECORD_HEADER_LENGTH: u64 = 12;

#[derive(Clone, Copy, Debug)]
struct RecordLocation {
    position: u64,
    data_offset: u64,
    length: u32,
}

pub struct FileArchive {
    file: File,
    index: Vec<RecordLocation>,
}

impl FileArchive {
    /// Open (or create) the archive at `path`, indexing every complete record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path.as_ref())?;

        let file_length = file.metadata()?.len();
        let (index, valid_length) = Self::scan(&file, file_length)?;
        if valid_length < file_length {
            file.set_len(valid_length)?;
            file.sync_all()?;
        }

        Ok(FileArchive { file, index })
    }

    // Walks the record headers, skipping over the data.
    fn scan(file: &File, file_length: u64) -> Result<(Vec<RecordLocation>, u64), ArchiveError> {
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(0))?;

        let mut index: Vec<RecordLocation> = Vec::new();
        let mut offset = 0;
        while file_length - offset >= RECORD_HEADER_LENGTH {
            let mut header = [0u8; RECORD_HEADER_LENGTH as usize];
            reader.read_exact(&mut header)?;
            let position = u64::from_le_bytes(Self::array(&header[0..8])?);
            let length = u32::from_le_bytes(Self::array(&header[8..12])?);

            let data_offset = offset + RECORD_HEADER_LENGTH;
            if file_length - data_offset < u64::from(length) {
                // Torn write.
                break;
            }

            let last_position = index.last().map(|record| record.position).unwrap_or(0);
            let expected = next_position(last_position, length as usize);
            if expected != position {
                return Err(ArchiveError::Corrupt(format!(
                    "record at offset {}: expected position {}, got {}",
                    offset, expected, position
                )));
            }

            index.push(RecordLocation {
                position,
                data_offset,
                length,
            });
            reader.seek_relative(i64::from(length))?;
            offset = data_offset + u64::from(length);
        }

        Ok((index, offset))
    }

    fn array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], ArchiveError> {
        <[u8; N]>::try_from(bytes).map_err(|_| ArchiveError::Corrupt("short record header".to_string()))
    }

    fn end_offset(&self) -> u64 {
        self.index
            .last()
            .map(|record| record.data_offset + u64::from(record.length))
            .unwrap_or(0)
    }
}

impl Archive for FileArchive {
    fn append(&mut self, position: u64, frame: &[u8]) -> Result<(), ArchiveError> {
        let expected = next_position(self.position(), frame.len());
        if expected != position {
            return Err(ArchiveError::PositionMismatch {
                expected,
                actual: position,
            });
        }

        let length = u32::try_from(frame.len())
            .map_err(|_| ArchiveError::Corrupt(format!("frame of {} bytes is too large", frame.len())))?;
        let mut record = Vec::with_capacity(RECORD_HEADER_LENGTH as usize + frame.len());
        record.extend_from_slice(&position.to_le_bytes());
        record.extend_from_slice(&length.to_le_bytes());
        record.extend_from_slice(frame);

        let data_offset = self.end_offset() + RECORD_HEADER_LENGTH;
        self.file.write_all(&record)?;
        self.file.sync_data()?;

        // Only index once durable.
        self.index.push(RecordLocation {
            position,
            data_offset,
            length,
        });
        Ok(())
    }

    fn read_from(&self, position: u64) -> Result<ArchivedFrames<'_>, ArchiveError> {
        let start = self.index.partition_point(|record| record.position <= position);
        let on_boundary = position == 0 || (start > 0 && self.index[start - 1].position == position);
        if !on_boundary {
            return Err(ArchiveError::UnknownPosition(position));
        }

        let file = &self.file;
        Ok(Box::new(
            self.index[start..]
                .iter()
                .map(move |record| read_record(file, record).map_err(ArchiveError::from)),
        ))
    }

    fn position(&self) -> u64 {
        self.index.last().map(|record| record.position).unwrap_or(0)
    }
}

// Append mode writes at the end of the file wherever the cursor is left.
fn read_record(mut file: &File, record: &RecordLocation) -> io::Result<ArchivedFrame> {
    file.seek(SeekFrom::Start(record.data_offset))?;
    let mut data = vec![0u8; record.length as usize];
    file.read_exact(&mut data)?;

    Ok(ArchivedFrame {
        position: record.position,
        data: Bytes::from(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn positions(archive: &FileArchive, from: u64) -> Vec<u64> {
        archive
            .read_from(from)
            .unwrap()
            .map(|frame| frame.unwrap().position)
            .collect()
    }

    #[test]
    fn reopen_recovers_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.log");

        {
            let mut archive = FileArchive::open(&path).unwrap();
            archive.append(96, &[7u8; 50]).unwrap();
            archive.append(160, b"8=FIX.4.4").unwrap();
        }

        let archive = FileArchive::open(&path).unwrap();
        assert_eq!(archive.position(), 160);
        let frames: Vec<_> = archive.read_from(0).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, Bytes::from(vec![7u8; 50]));
        assert_eq!(frames[1].data, Bytes::from_static(b"8=FIX.4.4"));
    }

    #[test]
    fn reads_come_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.log");

        let mut archive = FileArchive::open(&path).unwrap();
        archive.append(96, &[1u8; 50]).unwrap();
        archive.append(160, &[2u8; 20]).unwrap();

        // Rewrite the second frame's data behind the archive's back.
        let mut other = OpenOptions::new().write(true).open(&path).unwrap();
        other
            .seek(SeekFrom::Start(2 * RECORD_HEADER_LENGTH + 50))
            .unwrap();
        other.write_all(&[9u8; 20]).unwrap();
        drop(other);

        let frame = archive.read_from(96).unwrap().next().unwrap().unwrap();
        assert_eq!(frame.position, 160);
        assert_eq!(frame.data, Bytes::from(vec![9u8; 20]));

        // Reading does not disturb appends.
        archive.append(224, &[3u8; 30]).unwrap();
        assert_eq!(positions(&archive, 0), vec![96, 160, 224]);
        assert_eq!(positions(&archive, 160), vec![224]);
        drop(archive);

        let reopened = FileArchive::open(&path).unwrap();
        let last = reopened.read_from(160).unwrap().next().unwrap().unwrap();
        assert_eq!(last.data, Bytes::from(vec![3u8; 30]));
    }

    #[test]
    fn read_from_requires_frame_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = FileArchive::open(dir.path().join("archive.log")).unwrap();
        archive.append(96, &[0u8; 50]).unwrap();

        assert!(matches!(archive.read_from(50), Err(ArchiveError::UnknownPosition(50))));
        assert!(positions(&archive, 96).is_empty());
    }

    #[test]
    fn torn_trailing_record_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.log");

        {
            let mut archive = FileArchive::open(&path).unwrap();
            archive.append(96, &[7u8; 50]).unwrap();
            archive.append(192, &[8u8; 50]).unwrap();
        }

        let full_length = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full_length - 10).unwrap();
        drop(file);

        let mut archive = FileArchive::open(&path).unwrap();
        assert_eq!(archive.position(), 96);
        assert_eq!(fs::metadata(&path).unwrap().len(), RECORD_HEADER_LENGTH + 50);

        // Writing resumes right after the last complete record.
        archive.append(192, &[9u8; 50]).unwrap();
        drop(archive);
        let reopened = FileArchive::open(&path).unwrap();
        assert_eq!(reopened.position(), 192);
        assert_eq!(positions(&reopened, 0), vec![96, 192]);
    }

    #[test]
    fn rejects_non_contiguous_append_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.log");

        let mut archive = FileArchive::open(&path).unwrap();
        assert!(matches!(
            archive.append(500, b"gap"),
            Err(ArchiveError::PositionMismatch { .. })
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
