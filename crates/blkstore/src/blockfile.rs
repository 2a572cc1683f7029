//! Segment block file management.
//!
//! Blocks are appended to `blocks_NNNNNN.dat` files as length-prefixed
//! records; a new segment is started once the active one would exceed the
//! configured size bound. Appends are synced to disk before the index entry
//! for the block is committed, so the index never points at unwritten bytes.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::error::{IoSnafu, Result, SerializationSnafu};
use crate::tables::BlockLocation;

/// Segment file path for `file_num`.
pub(crate) fn segment_path(dir: &Path, file_num: u64) -> PathBuf {
    dir.join(format!("blocks_{:06}.dat", file_num))
}

/// Parse a segment file number out of a directory entry name.
fn segment_num(name: &str) -> Option<u64> {
    name.strip_prefix("blocks_")?.strip_suffix(".dat")?.parse().ok()
}

/// Writer over the active segment file.
#[derive(Debug)]
pub(crate) struct SegmentWriter {
    dir: PathBuf,
    file_num: u64,
    file: File,
    size: u64,
}

impl SegmentWriter {
    /// Open the segment `file_num` for appending.
    pub fn open(dir: &Path, file_num: u64) -> Result<Self> {
        let path = segment_path(dir, file_num);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(IoSnafu)?;
        let size = file.metadata().context(IoSnafu)?.len();
        Ok(Self { dir: dir.to_path_buf(), file_num, file, size })
    }

    /// Append a length-prefixed record, rotating first when the active
    /// segment would exceed `max_file_size`. The record is synced to disk
    /// before this returns.
    pub fn append(&mut self, max_file_size: u64, payload: &[u8]) -> Result<BlockLocation> {
        let record_len = payload.len() as u64 + 4;
        if self.size > 0 && self.size + record_len > max_file_size {
            self.rotate()?;
        }

        let offset = self.size;
        self.file
            .write_all(&(payload.len() as u32).to_le_bytes())
            .context(IoSnafu)?;
        self.file.write_all(payload).context(IoSnafu)?;
        self.file.sync_data().context(IoSnafu)?;
        self.size += record_len;

        Ok(BlockLocation { file_num: self.file_num, offset, length: record_len as u32 })
    }

    fn rotate(&mut self) -> Result<()> {
        let next = Self::open(&self.dir, self.file_num + 1)?;
        *self = next;
        Ok(())
    }
}

/// Read one record back from its indexed location.
pub(crate) fn read_record(dir: &Path, loc: &BlockLocation) -> Result<Vec<u8>> {
    let path = segment_path(dir, loc.file_num);
    let mut reader = BufReader::new(File::open(&path).context(IoSnafu)?);
    reader.seek(SeekFrom::Start(loc.offset)).context(IoSnafu)?;

    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).context(IoSnafu)?;
    let payload_len = u32::from_le_bytes(len_buf);
    if payload_len + 4 != loc.length {
        return SerializationSnafu {
            message: format!(
                "segment record at {}:{} has length {}, index says {}",
                path.display(),
                loc.offset,
                payload_len + 4,
                loc.length
            ),
        }
        .fail();
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).context(IoSnafu)?;
    Ok(payload)
}

/// Discard bytes past the end of the last indexed block: truncate the active
/// segment to `end_offset` and remove any later segment files.
pub(crate) fn trim_past(dir: &Path, file_num: u64, end_offset: u64) -> Result<()> {
    for entry in fs::read_dir(dir).context(IoSnafu)? {
        let entry = entry.context(IoSnafu)?;
        let name = entry.file_name();
        let Some(num) = name.to_str().and_then(segment_num) else {
            continue;
        };
        if num > file_num {
            fs::remove_file(entry.path()).context(IoSnafu)?;
        }
    }

    let active = segment_path(dir, file_num);
    if active.exists() {
        let file = OpenOptions::new().write(true).open(&active).context(IoSnafu)?;
        if file.metadata().context(IoSnafu)?.len() > end_offset {
            file.set_len(end_offset).context(IoSnafu)?;
            file.sync_data().context(IoSnafu)?;
        }
    }
    Ok(())
}
