use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    fs::{
        config::Geometry,
        error::{FsError, Result},
        free_list::FreeList,
    },
    utils::current_timestamp,
};

/// DBN 0 is the superblock, so it doubles as "not mapped".
pub const UNMAPPED: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub size: u64,      // 文件大小（字节）
    pub modified: i64,  // 最后修改时间
    blocks: Vec<u64>,   // FBN -> DBN，长度固定为 max_file_blocks
}

impl Inode {
    pub fn empty(max_file_blocks: u32) -> Self {
        Self {
            size: 0,
            modified: 0,
            blocks: vec![UNMAPPED; max_file_blocks as usize],
        }
    }

    pub fn fbn_to_dbn(&self, fbn: u64) -> Option<u64> {
        self.blocks
            .get(fbn as usize)
            .copied()
            .filter(|&dbn| dbn != UNMAPPED)
    }

    /// Maps `fbn` to `dbn`. The caller owns `dbn` through the free list.
    pub fn map(&mut self, fbn: u64, dbn: u64) -> Result<()> {
        let capacity = self.capacity();
        let slot = self
            .blocks
            .get_mut(fbn as usize)
            .ok_or(FsError::FileTooLarge {
                requested: fbn + 1,
                limit: capacity,
            })?;
        *slot = dbn;
        Ok(())
    }

    /// Mapping capacity in blocks.
    pub fn capacity(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Mapped DBNs in FBN order (holes skipped).
    pub fn mapped_blocks(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().copied().filter(|&dbn| dbn != UNMAPPED)
    }

    pub fn block_count(&self) -> u64 {
        self.mapped_blocks().count() as u64
    }

    pub fn touch(&mut self) {
        self.modified = current_timestamp();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InodeTable {
    inodes: Vec<Inode>,
}

impl InodeTable {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            inodes: (0..geometry.inode_count)
                .map(|_| Inode::empty(geometry.max_file_blocks))
                .collect(),
        }
    }

    pub fn len(&self) -> u32 {
        self.inodes.len() as u32
    }

    pub fn get(&self, inum: u32) -> Result<&Inode> {
        self.inodes
            .get(inum as usize)
            .ok_or(FsError::InvalidInode(inum))
    }

    pub fn get_mut(&mut self, inum: u32) -> Result<&mut Inode> {
        self.inodes
            .get_mut(inum as usize)
            .ok_or(FsError::InvalidInode(inum))
    }

    /// Truncates `inum` to zero bytes and hands its blocks back to `free_list`.
    pub fn reset(&mut self, inum: u32, free_list: &mut FreeList) -> Result<()> {
        let inode = self.get_mut(inum)?;
        let released: Vec<u64> = inode.mapped_blocks().collect();
        for &dbn in &released {
            free_list.release(dbn);
        }
        let capacity = inode.capacity() as u32;
        *inode = Inode::empty(capacity);
        inode.touch();

        debug!("inode {} reset, released {} blocks", inum, released.len());
        Ok(())
    }

    /// Checks that the table matches the geometry and that every mapped block
    /// is inside the data area, allocated, and owned by a single inode.
    pub fn verify(&self, geometry: &Geometry, free_list: &FreeList) -> Result<()> {
        if self.inodes.len() != geometry.inode_count as usize {
            return Err(FsError::Corrupted(format!(
                "inode table holds {} inodes, expected {}",
                self.inodes.len(),
                geometry.inode_count
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for (inum, inode) in self.inodes.iter().enumerate() {
            if inode.capacity() != geometry.max_file_blocks as u64
                || inode.size > geometry.max_file_size()
            {
                return Err(FsError::Corrupted(format!("inode {} has a bad mapping", inum)));
            }
            for dbn in inode.mapped_blocks() {
                if !free_list.is_allocated(dbn) || !seen.insert(dbn) {
                    return Err(FsError::Corrupted(format!(
                        "inode {} maps block {} which it does not own",
                        inum, dbn
                    )));
                }
            }
        }
        Ok(())
    }
}
