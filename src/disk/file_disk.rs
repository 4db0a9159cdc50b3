use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use log::{debug, info};

use crate::{
    disk::block_device::{check_access, BlockDevice},
    fs::{
        config::SUPER_BLOCK_BLOCK_ID,
        error::{FsError, Result},
        region,
        super_block::SuperBlock,
    },
};

/// Block size used to read the superblock before the real one is known.
const PROBE_BLOCK_SIZE: usize = 8;

/// A disk image backed by a regular file.
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    path: PathBuf,
    block_size: usize,
    block_count: u64,
}

impl FileDisk {
    /// Creates (or truncates) the image and sizes it to `block_count` blocks.
    pub fn create(path: impl AsRef<Path>, block_size: usize, block_count: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_block_size(block_size)?;
        let len = (block_size as u64).checked_mul(block_count).ok_or_else(|| {
            FsError::InvalidGeometry(format!(
                "{} blocks of {} bytes overflow the image size",
                block_count, block_size
            ))
        })?;

        let create = || -> io::Result<File> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            file.set_len(len)?;
            Ok(file)
        };
        let file = create().map_err(|source| FsError::DiskCreate {
            path: path.clone(),
            source,
        })?;

        info!(
            "created disk image {} ({} blocks of {} bytes)",
            path.display(),
            block_count,
            block_size
        );
        Ok(Self {
            file: Mutex::new(file),
            path,
            block_size,
            block_count,
        })
    }

    /// Opens a formatted image. The block size is the one recorded in its
    /// superblock, which starts at byte 0 whatever the block size is.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let probe = Self::open_with_block_size(path, PROBE_BLOCK_SIZE)?;
        let super_block: SuperBlock = region::read(&probe, SUPER_BLOCK_BLOCK_ID)?;
        debug!(
            "{} records {}-byte blocks",
            probe.path.display(),
            super_block.geometry.block_size
        );
        probe.with_block_size(super_block.geometry.block_size)
    }

    /// Opens an existing image as raw `block_size`-byte blocks without
    /// reading it. The block count is derived from the file length.
    pub fn open_with_block_size(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(FsError::NoDisk(path));
        }
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        Self {
            file: Mutex::new(file),
            path,
            block_size: PROBE_BLOCK_SIZE,
            block_count: 0,
        }
        .with_block_size(block_size)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_block_size(mut self, block_size: usize) -> Result<Self> {
        check_block_size(block_size)?;
        let len = self.lock()?.metadata()?.len();
        self.block_size = block_size;
        self.block_count = len / block_size as u64;
        Ok(self)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "disk image lock poisoned"))
    }
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(FsError::InvalidGeometry("block size must be non-zero".to_string()));
    }
    Ok(())
}

impl BlockDevice for FileDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> io::Result<()> {
        check_access(self, block_id, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> io::Result<()> {
        check_access(self, block_id, buf.len())?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * self.block_size as u64))?;
        file.write_all(buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_image_is_no_disk() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileDisk::open(dir.path().join("absent.img")).unwrap_err();
        assert!(matches!(err, FsError::NoDisk(_)));
    }

    #[test]
    fn zero_block_size_is_invalid_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileDisk::create(&path, 16, 256).unwrap();

        let err = FileDisk::open_with_block_size(&path, 0).unwrap_err();
        assert!(matches!(err, FsError::InvalidGeometry(_)));
        let err = FileDisk::create(&path, 0, 8).unwrap_err();
        assert!(matches!(err, FsError::InvalidGeometry(_)));
        let err = FileDisk::create(&path, usize::MAX, u64::MAX).unwrap_err();
        assert!(matches!(err, FsError::InvalidGeometry(_)));
    }

    #[test]
    fn open_unformatted_image_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.img");
        FileDisk::create(&path, 64, 16).unwrap();

        let err = FileDisk::open(&path).unwrap_err();
        assert!(matches!(err, FsError::Corrupted(_)));
    }

    #[test]
    fn create_then_reopen_keeps_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");

        let disk = FileDisk::create(&path, 16, 4).unwrap();
        disk.write_block(3, &[7u8; 16]).unwrap();
        drop(disk);

        let disk = FileDisk::open_with_block_size(&path, 16).unwrap();
        assert_eq!(disk.path(), path.as_path());
        assert_eq!(disk.block_count(), 4);
        let mut buf = [0u8; 16];
        disk.read_block(3, &mut buf).unwrap();
        assert_eq!(buf, [7u8; 16]);
        assert!(disk.read_block(4, &mut buf).is_err());
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileDisk::create(dir.path().join("no/such/dir/disk.img"), 512, 8).unwrap_err();
        assert!(matches!(err, FsError::DiskCreate { .. }));
    }
}
