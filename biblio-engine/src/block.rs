//! Fixed-size block framing (C1).
//!
//! Every read and write in this crate is aligned to a block of exactly
//! [`BLOCK_SIZE`] bytes. Payloads smaller than a block are padded; the
//! padding bytes are never interpreted on read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Size in bytes of every block on disk, for both tree files and the
/// record file.
pub const BLOCK_SIZE: usize = 4096;

/// Reads exactly [`BLOCK_SIZE`] bytes at `offset` into `buf`.
///
/// `buf` must be exactly `BLOCK_SIZE` bytes long. A short read is treated
/// as a fatal I/O error, matching the "any short read/write of a block is
/// a fatal I/O error" contract in the block framing design.
pub fn read_block(file: &mut File, offset: u64, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

/// Writes `payload` into a zero-padded [`BLOCK_SIZE`]-byte block at
/// `offset`. `payload` must be no longer than `BLOCK_SIZE`.
pub fn write_block(file: &mut File, offset: u64, payload: &[u8]) -> io::Result<()> {
    debug_assert!(payload.len() <= BLOCK_SIZE);
    let mut buf = [0u8; BLOCK_SIZE];
    buf[..payload.len()].copy_from_slice(payload);
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&buf)
}

/// Appends `payload` as a new zero-padded block at the current end of
/// file, returning the byte offset the block was written at.
pub fn append_block(file: &mut File, payload: &[u8]) -> io::Result<u64> {
    let offset = file.seek(SeekFrom::End(0))?;
    write_block(file, offset, payload)?;
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    #[test]
    fn it_pads_short_payloads_to_block_size() {
        let path = "test_block_pads_short_payloads.bin";
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .unwrap();

        write_block(&mut file, 0, b"hello").unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        read_block(&mut file, 0, &mut buf).unwrap();
        assert_eq!(&buf[..5], b"hello");
        assert!(buf[5..].iter().all(|&b| b == 0));

        drop(file);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn it_appends_sequential_blocks() {
        let path = "test_block_appends_sequential_blocks.bin";
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .unwrap();

        let first = append_block(&mut file, b"one").unwrap();
        let second = append_block(&mut file, b"two").unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, BLOCK_SIZE as u64);

        drop(file);
        std::fs::remove_file(path).unwrap();
    }
}
