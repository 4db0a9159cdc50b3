use std::{
    io::{self, Result},
    sync::Mutex,
};

use crate::disk::block_device::{check_access, BlockDevice};

/// A zero-filled in-memory image.
#[derive(Debug)]
pub struct MemDisk {
    bytes: Mutex<Vec<u8>>,
    block_size: usize,
    block_count: u64,
}

impl MemDisk {
    pub fn new(block_size: usize, block_count: u64) -> Self {
        Self {
            bytes: Mutex::new(vec![0u8; block_size * block_count as usize]),
            block_size,
            block_count,
        }
    }

    fn range(&self, block_id: u64) -> std::ops::Range<usize> {
        let start = block_id as usize * self.block_size;
        start..start + self.block_size
    }
}

impl BlockDevice for MemDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()> {
        check_access(self, block_id, buf.len())?;
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory disk lock poisoned"))?;
        buf.copy_from_slice(&bytes[self.range(block_id)]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()> {
        check_access(self, block_id, buf.len())?;
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory disk lock poisoned"))?;
        let range = self.range(block_id);
        bytes[range].copy_from_slice(buf);
        Ok(())
    }
}
