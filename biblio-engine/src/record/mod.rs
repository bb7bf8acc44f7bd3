//! The perfect-hash record file (C4): entries addressed directly by
//! identifier, with phantom blocks padding over id gaps.

pub mod entry;

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info};

use crate::block::{read_block, write_block, BLOCK_SIZE};
use crate::error::RecordError;
use entry::Entry;

/// Byte offset at which the entry for `id` is stored, independent of
/// whatever has actually been written (§3, §4.4): `B + B * id`.
pub fn offset_for_id(id: i32) -> u64 {
    BLOCK_SIZE as u64 + BLOCK_SIZE as u64 * id as u64
}

/// A record file open for appending entries during ingestion.
pub struct RecordWriter {
    file: std::fs::File,
    path: PathBuf,
    last_id: Option<i32>,
    block_count: u32,
}

impl RecordWriter {
    /// Creates a fresh record file, overwriting anything at `path`, with
    /// a placeholder header.
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("creating record file {}", path.display()))?;
        write_header(&mut file, 1)?;
        info!(path = %path.display(), "created record file");
        Ok(RecordWriter {
            file,
            path,
            last_id: None,
            block_count: 1,
        })
    }

    /// Writes `entry`, padding any gap since the last id with phantom
    /// blocks (§4.4). Ids must arrive strictly increasing.
    pub fn write_entry(&mut self, entry: &Entry) -> anyhow::Result<u64> {
        if let Some(last) = self.last_id {
            if entry.id == last {
                return Err(RecordError::Duplicate(entry.id as i64).into());
            }
            if entry.id < last {
                return Err(RecordError::OutOfOrder {
                    got: entry.id as i64,
                    last: last as i64,
                }
                .into());
            }
        }

        let gap = match self.last_id {
            Some(last) => (entry.id - last - 1) as u32,
            None => entry.id as u32,
        };
        for _ in 0..gap {
            self.append(&Entry::phantom())?;
        }
        let offset = self.append(entry)?;

        self.block_count += gap + 1;
        self.last_id = Some(entry.id);
        Ok(offset)
    }

    fn append(&mut self, entry: &Entry) -> anyhow::Result<u64> {
        let encoded = entry.encode()?;
        let offset = self.file.seek(SeekFrom::End(0))?;
        write_block(&mut self.file, offset, &encoded)?;
        Ok(offset)
    }

    /// The block count accumulated so far, including the header.
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Rewrites the header with the final block count (§4.4).
    pub fn finalize(mut self) -> anyhow::Result<()> {
        write_header(&mut self.file, self.block_count)?;
        self.file.sync_all().ok();
        info!(path = %self.path.display(), block_count = self.block_count, "finalized record file");
        Ok(())
    }
}

/// A record file open for point lookups.
pub struct RecordReader {
    file: std::fs::File,
}

impl RecordReader {
    /// Opens an existing record file read-only.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("opening record file {}", path.display()))?;
        Ok(RecordReader { file })
    }

    /// Reads one entry at the given byte offset. A phantom entry
    /// (`valid = false`) decodes successfully; the caller decides how to
    /// report that as "not found" (§7 kind 5).
    pub fn read_at(&mut self, offset: u64) -> anyhow::Result<Entry> {
        let mut buf = [0u8; BLOCK_SIZE];
        read_block(&mut self.file, offset, &mut buf)
            .with_context(|| format!("reading record at offset {offset}"))?;
        let mut entry_buf = [0u8; entry::ENCODED_SIZE];
        entry_buf.copy_from_slice(&buf[..entry::ENCODED_SIZE]);
        let entry = Entry::decode(&entry_buf)?;
        debug!(offset, valid = entry.valid, "read record");
        Ok(entry)
    }

    /// Reads the header's `block_count` field.
    pub fn block_count(&mut self) -> anyhow::Result<u32> {
        let mut buf = [0u8; BLOCK_SIZE];
        read_block(&mut self.file, 0, &mut buf)?;
        let mut cursor = std::io::Cursor::new(&buf[..4]);
        Ok(cursor.read_u32::<LittleEndian>()?)
    }
}

fn write_header(file: &mut std::fs::File, block_count: u32) -> anyhow::Result<()> {
    let mut payload = Vec::with_capacity(4);
    payload.write_u32::<LittleEndian>(block_count)?;
    write_block(file, 0, &payload)?;
    Ok(())
}
