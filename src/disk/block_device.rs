use std::io::{Error, ErrorKind, Result};

/// Fixed-size block storage addressed by absolute block number.
pub trait BlockDevice: Send + Sync {
    fn block_size(&self) -> usize;
    fn block_count(&self) -> u64;
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()>;
}

/// Rejects out-of-range block ids and buffers that are not exactly one block.
pub(crate) fn check_access<D: BlockDevice + ?Sized>(
    disk: &D,
    block_id: u64,
    len: usize,
) -> Result<()> {
    if block_id >= disk.block_count() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "block {} out of range (device has {} blocks)",
                block_id,
                disk.block_count()
            ),
        ));
    }
    if len != disk.block_size() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "buffer of {} bytes, block size is {}",
                len,
                disk.block_size()
            ),
        ));
    }
    Ok(())
}
