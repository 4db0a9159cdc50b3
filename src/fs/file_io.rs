//! The byte-granular file interface: read, write, seek, tell and size, all
//! going through the open file table cursor.

use std::{fmt, str::FromStr};

use log::{debug, trace};

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FsError, Result},
        open_file_table::Fd,
        span::spans,
        FileSystem,
    },
};

/// Origin of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the file.
    Set,
    /// From the current cursor.
    Cur,
    /// From the end of the file.
    End,
}

impl TryFrom<i32> for Whence {
    type Error = FsError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Set),
            1 => Ok(Self::Cur),
            2 => Ok(Self::End),
            other => Err(FsError::BadWhence(other)),
        }
    }
}

impl FromStr for Whence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "set" | "start" => Ok(Self::Set),
            "cur" | "current" => Ok(Self::Cur),
            "end" => Ok(Self::End),
            other => Err(format!("unknown seek origin '{}'", other)),
        }
    }
}

impl fmt::Display for Whence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "set",
            Self::Cur => "cur",
            Self::End => "end",
        })
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Reads up to `buf.len()` bytes at the cursor and advances it.
    ///
    /// Returns fewer bytes than asked for only when the end of the file is
    /// reached, and 0 when the cursor is already at or past the end. Holes
    /// (blocks never written) read as zeros.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let entry = self.oft.get(fd)?;
        let (inum, cursor) = (entry.inum, entry.cursor);
        let inode = self.inodes.get(inum)?;

        if cursor >= inode.size {
            return Ok(0);
        }
        let count = (inode.size - cursor).min(buf.len() as u64) as usize;

        let mut block = vec![0u8; self.disk.block_size()];
        for span in spans(cursor, count, block.len()) {
            match inode.fbn_to_dbn(span.fbn) {
                Some(dbn) => {
                    trace!("read fbn {} <- dbn {}", span.fbn, dbn);
                    self.disk.read_block(dbn, &mut block)?;
                }
                None => block.fill(0),
            }
            buf[span.buf_range()].copy_from_slice(&block[span.block_range()]);
        }

        self.oft.get_mut(fd)?.cursor += count as u64;
        Ok(count)
    }

    /// Writes all of `buf` at the cursor, extending the file and allocating
    /// blocks as needed, and advances the cursor.
    ///
    /// Capacity and free space are checked before anything is written. Each
    /// block is persisted as soon as it is filled; there is no rollback if the
    /// device fails part way.
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let entry = self.oft.get(fd)?;
        let (inum, cursor) = (entry.inum, entry.cursor);
        if buf.is_empty() {
            return Ok(0);
        }

        let block_size = self.disk.block_size();
        let limit = self.geometry().max_file_size();
        let end = cursor
            .checked_add(buf.len() as u64)
            .ok_or(FsError::CursorOverflow)?;
        if end > limit {
            return Err(FsError::FileTooLarge {
                requested: end,
                limit,
            });
        }

        // 先分配所有缺失的块，再写数据
        let inode = self.inodes.get(inum)?;
        let missing: Vec<u64> = spans(cursor, buf.len(), block_size)
            .map(|span| span.fbn)
            .filter(|&fbn| inode.fbn_to_dbn(fbn).is_none())
            .collect();
        if missing.len() as u64 > self.free_list.free_count() {
            return Err(FsError::DiskFull);
        }
        if !missing.is_empty() {
            let inode = self.inodes.get_mut(inum)?;
            for &fbn in &missing {
                let dbn = self.free_list.alloc().ok_or(FsError::DiskFull)?;
                inode.map(fbn, dbn)?;
            }
            self.sync_free_list()?;
            self.sync_inodes()?;
            debug!("inode {}: allocated {} blocks", inum, missing.len());
        }

        let mut block = vec![0u8; block_size];
        for span in spans(cursor, buf.len(), block_size) {
            let dbn = self
                .inodes
                .get(inum)?
                .fbn_to_dbn(span.fbn)
                .ok_or_else(|| FsError::Corrupted(format!("fbn {} not mapped", span.fbn)))?;

            if missing.contains(&span.fbn) {
                block.fill(0);
            } else if !span.is_full(block_size) {
                self.disk.read_block(dbn, &mut block)?;
            }
            block[span.block_range()].copy_from_slice(&buf[span.buf_range()]);
            self.disk.write_block(dbn, &block)?;
            trace!("wrote fbn {} -> dbn {}", span.fbn, dbn);

            let reached = cursor + (span.buf_offset + span.len) as u64;
            self.oft.get_mut(fd)?.cursor = reached;
            let inode = self.inodes.get_mut(inum)?;
            inode.size = inode.size.max(reached);
        }

        self.inodes.get_mut(inum)?.touch();
        self.sync_inodes()?;
        Ok(buf.len())
    }

    /// Moves the cursor and returns its new position.
    ///
    /// A negative `offset` is rejected for every origin, so the cursor can
    /// never go below zero. Seeking past the end is allowed; the size only
    /// changes when something is written there.
    pub fn seek(&mut self, fd: Fd, offset: i64, whence: Whence) -> Result<u64> {
        if offset < 0 {
            return Err(FsError::NegativeOffset(offset));
        }
        let entry = self.oft.get(fd)?;
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => entry.cursor,
            Whence::End => self.inodes.get(entry.inum)?.size,
        };
        let cursor = base
            .checked_add(offset as u64)
            .ok_or(FsError::CursorOverflow)?;

        self.oft.get_mut(fd)?.cursor = cursor;
        Ok(cursor)
    }

    pub fn tell(&self, fd: Fd) -> Result<u64> {
        Ok(self.oft.get(fd)?.cursor)
    }

    pub fn size(&self, fd: Fd) -> Result<u64> {
        let inum = self.oft.inode_of(fd)?;
        Ok(self.inodes.get(inum)?.size)
    }
}
