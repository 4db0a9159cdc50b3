//! Metadata regions on disk.
//!
//! A region is a run of consecutive blocks holding one bincode-encoded value,
//! prefixed by its encoded length as a little-endian `u64`:
//!
//! ```text
//! | len (8 bytes) | bincode bytes ... | zero padding up to the region end |
//! ```
//!
//! The stream ignores block boundaries, so the prefix itself may straddle
//! blocks on volumes with tiny blocks.

use log::trace;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    disk::BlockDevice,
    fs::error::{FsError, Result},
};

const LEN_PREFIX: usize = 8;

/// Blocks needed to store a value whose encoding is `encoded_len` bytes.
pub fn blocks_for(encoded_len: u64, block_size: usize) -> u64 {
    let total = encoded_len + LEN_PREFIX as u64;
    (total + block_size as u64 - 1) / block_size as u64
}

/// Blocks needed to store `value`.
pub fn blocks_needed<T: Serialize>(value: &T, block_size: usize) -> Result<u64> {
    Ok(blocks_for(bincode::serialized_size(value)?, block_size))
}

/// Writes `value` into the region `[start, start + blocks)`, zero-padding the tail.
pub fn write<D, T>(disk: &D, start: u64, blocks: u64, value: &T) -> Result<()>
where
    D: BlockDevice + ?Sized,
    T: Serialize,
{
    let bytes = bincode::serialize(value)?;
    let block_size = disk.block_size();

    let mut stream = Vec::with_capacity(blocks as usize * block_size);
    stream.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    stream.extend_from_slice(&bytes);
    if stream.len() > blocks as usize * block_size {
        return Err(FsError::Corrupted(format!(
            "{} bytes do not fit the {}-block region at block {}",
            stream.len(),
            blocks,
            start
        )));
    }
    stream.resize(blocks as usize * block_size, 0);

    for (i, chunk) in stream.chunks(block_size).enumerate() {
        disk.write_block(start + i as u64, chunk)?;
    }
    trace!("wrote {} bytes to region at block {}", bytes.len(), start);
    Ok(())
}

/// Reads the value stored at `start`. Only the blocks covering the encoded
/// value are read, so the region size need not be known in advance.
pub fn read<D, T>(disk: &D, start: u64) -> Result<T>
where
    D: BlockDevice + ?Sized,
    T: DeserializeOwned,
{
    let block_size = disk.block_size();
    let available = disk.block_count().saturating_sub(start) * block_size as u64;

    let mut block = vec![0u8; block_size];
    let mut stream = Vec::new();
    let mut next = start;
    let mut fill = |stream: &mut Vec<u8>, want: usize| -> Result<()> {
        while stream.len() < want {
            disk.read_block(next, &mut block)?;
            stream.extend_from_slice(&block);
            next += 1;
        }
        Ok(())
    };

    if available < LEN_PREFIX as u64 {
        return Err(FsError::Corrupted(format!("no room for a region at block {}", start)));
    }
    fill(&mut stream, LEN_PREFIX)?;

    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&stream[..LEN_PREFIX]);
    let len = u64::from_le_bytes(len_bytes);
    if len == 0 {
        return Err(FsError::Corrupted(format!("empty region at block {}", start)));
    }
    if len + LEN_PREFIX as u64 > available {
        return Err(FsError::Corrupted(format!(
            "region at block {} claims {} bytes, only {} available",
            start, len, available
        )));
    }

    let end = LEN_PREFIX + len as usize;
    fill(&mut stream, end)?;
    Ok(bincode::deserialize(&stream[LEN_PREFIX..end])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn value_spans_tiny_blocks() {
        let disk = MemDisk::new(8, 32);
        let value: Vec<u32> = (0..10).collect();
        let blocks = blocks_needed(&value, 8).unwrap();
        // 8 (prefix) + 8 (vec len) + 40
        assert_eq!(blocks, 7);

        write(&disk, 3, blocks, &value).unwrap();
        let back: Vec<u32> = read(&disk, 3).unwrap();
        assert_eq!(back, value);

        let mut untouched = [0xffu8; 8];
        disk.read_block(3 + blocks, &mut untouched).unwrap();
        assert_eq!(untouched, [0u8; 8]);
    }

    #[test]
    fn oversized_value_is_rejected() {
        let disk = MemDisk::new(8, 32);
        let value = vec![1u8; 64];
        assert!(matches!(
            write(&disk, 0, 2, &value),
            Err(FsError::Corrupted(_))
        ));
    }

    #[test]
    fn blank_disk_reads_as_corrupted() {
        let disk = MemDisk::new(16, 4);
        let res: Result<Vec<u8>> = read(&disk, 0);
        assert!(matches!(res, Err(FsError::Corrupted(_))));
    }
}
