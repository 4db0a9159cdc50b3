use serde::{Deserialize, Serialize};

use crate::fs::error::{FsError, Result};

pub const SUPER_BLOCK_BLOCK_ID: u64 = 0;

/// "BFS1"
pub const MAGIC: u64 = 0x4246_5331;
pub const FORMAT_VERSION: u32 = 1;

pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_BLOCK_COUNT: u64 = 1024;
pub const DEFAULT_INODE_COUNT: u32 = 8;
pub const DEFAULT_DIR_CAPACITY: u32 = 8;

// 5 个直接块 + 1 个间接块（256 个指针）
pub const DEFAULT_MAX_FILE_BLOCKS: u32 = 5 + 256;
pub const DEFAULT_MAX_NAME_LEN: usize = 16;

pub const DEFAULT_OFT_CAPACITY: usize = 20;

/// Volume geometry fixed at format time and recorded in the superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub block_size: usize,
    pub block_count: u64,
    pub inode_count: u32,
    pub dir_capacity: u32,
    pub max_file_blocks: u32,
    pub max_name_len: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            block_count: DEFAULT_BLOCK_COUNT,
            inode_count: DEFAULT_INODE_COUNT,
            dir_capacity: DEFAULT_DIR_CAPACITY,
            max_file_blocks: DEFAULT_MAX_FILE_BLOCKS,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl Geometry {
    pub fn new(block_size: usize, block_count: u64) -> Self {
        Self {
            block_size,
            block_count,
            ..Self::default()
        }
    }

    /// Largest file the inode mapping can describe, in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_blocks as u64 * self.block_size as u64
    }

    /// Checks the sizes only; whether the regions fit is decided by the layout.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("block size", self.block_size as u64),
            ("block count", self.block_count),
            ("inode count", self.inode_count as u64),
            ("directory capacity", self.dir_capacity as u64),
            ("blocks per file", self.max_file_blocks as u64),
            ("name length", self.max_name_len as u64),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);

        match zero {
            Some((what, _)) => Err(FsError::InvalidGeometry(format!("{} must be non-zero", what))),
            None => Ok(()),
        }
    }
}
