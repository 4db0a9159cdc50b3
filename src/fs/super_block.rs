use serde::{Deserialize, Serialize};

use crate::{
    fs::{
        config::{Geometry, FORMAT_VERSION, MAGIC, SUPER_BLOCK_BLOCK_ID},
        directory::Directory,
        error::{FsError, Result},
        free_list::FreeList,
        inode_table::InodeTable,
        region,
    },
    utils::{current_timestamp, generate_uuid},
};

/// A run of blocks holding one metadata structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: u64,
    pub blocks: u64,
}

impl Region {
    pub fn end(&self) -> u64 {
        self.start + self.blocks
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u64, // 魔数，用于识别文件系统
    pub version: u32,
    pub volume_id: String,
    pub formatted_at: i64,

    pub geometry: Geometry,

    /** 各区域布局 */
    pub super_region: Region,
    pub inode_table: Region,
    pub directory: Region,
    pub free_list: Region,
    pub data_start: u64, // 数据区起始块号
}

impl SuperBlock {
    /// Lays out the regions back to back after block 0, each sized for the
    /// worst-case encoding of its structure under `geometry`.
    pub fn new(geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        let bs = geometry.block_size;

        let mut sb = Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            volume_id: generate_uuid(),
            formatted_at: current_timestamp(),
            geometry,
            super_region: Region { start: SUPER_BLOCK_BLOCK_ID, blocks: 0 },
            inode_table: Region { start: 0, blocks: 0 },
            directory: Region { start: 0, blocks: 0 },
            free_list: Region { start: 0, blocks: 0 },
            data_start: 0,
        };

        // 固定长度编码，占位值不影响大小
        sb.super_region.blocks = region::blocks_needed(&sb, bs)?;

        let inode_blocks = region::blocks_needed(&InodeTable::new(&geometry), bs)?;
        let dir_blocks = region::blocks_needed(&Directory::worst_case(&geometry), bs)?;
        // the bitmap is sized for the whole device, an upper bound on the data area
        let free_blocks = region::blocks_needed(&FreeList::new(0, geometry.block_count), bs)?;

        sb.inode_table = Region { start: sb.super_region.end(), blocks: inode_blocks };
        sb.directory = Region { start: sb.inode_table.end(), blocks: dir_blocks };
        sb.free_list = Region { start: sb.directory.end(), blocks: free_blocks };
        sb.data_start = sb.free_list.end();

        if sb.data_start >= geometry.block_count {
            return Err(FsError::InvalidGeometry(format!(
                "metadata needs {} blocks, volume has {}",
                sb.data_start, geometry.block_count
            )));
        }
        Ok(sb)
    }

    pub fn data_blocks(&self) -> u64 {
        self.geometry.block_count - self.data_start
    }

    /// Cross-checks a superblock read back from disk.
    pub fn verify(&self, device_block_size: usize, device_block_count: u64) -> Result<()> {
        if self.magic != MAGIC {
            return Err(FsError::Corrupted(format!("bad magic {:#x}", self.magic)));
        }
        if self.version != FORMAT_VERSION {
            return Err(FsError::Corrupted(format!("unsupported version {}", self.version)));
        }
        if self.geometry.block_size != device_block_size {
            return Err(FsError::InvalidGeometry(format!(
                "volume uses {}-byte blocks, device uses {}",
                self.geometry.block_size, device_block_size
            )));
        }
        if self.geometry.block_count > device_block_count {
            return Err(FsError::Corrupted(format!(
                "volume has {} blocks, device only {}",
                self.geometry.block_count, device_block_count
            )));
        }
        let regions = [self.super_region, self.inode_table, self.directory, self.free_list];
        let contiguous = regions.windows(2).all(|w| w[0].end() == w[1].start);
        if regions[0].start != SUPER_BLOCK_BLOCK_ID
            || !contiguous
            || self.free_list.end() != self.data_start
            || self.data_start >= self.geometry.block_count
        {
            return Err(FsError::Corrupted("inconsistent region layout".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_disjoint_and_ordered() {
        let sb = SuperBlock::new(Geometry::default()).unwrap();
        assert_eq!(sb.super_region.start, 0);
        assert!(sb.super_region.blocks >= 1);
        assert_eq!(sb.inode_table.start, sb.super_region.end());
        assert_eq!(sb.directory.start, sb.inode_table.end());
        assert_eq!(sb.free_list.start, sb.directory.end());
        assert_eq!(sb.data_start, sb.free_list.end());
        assert!(sb.data_blocks() > 0);
        sb.verify(512, 1024).unwrap();
    }

    #[test]
    fn tiny_blocks_still_lay_out() {
        let geometry = Geometry {
            block_size: 8,
            block_count: 512,
            inode_count: 4,
            dir_capacity: 4,
            max_file_blocks: 16,
            max_name_len: 8,
        };
        let sb = SuperBlock::new(geometry).unwrap();
        assert!(sb.super_region.blocks > 1);
        assert!(sb.data_start < 512);
    }

    #[test]
    fn too_small_volume_is_rejected() {
        let err = SuperBlock::new(Geometry::new(512, 4)).unwrap_err();
        assert!(matches!(err, FsError::InvalidGeometry(_)));
    }

    #[test]
    fn verify_catches_block_size_mismatch() {
        let sb = SuperBlock::new(Geometry::default()).unwrap();
        assert!(matches!(sb.verify(1024, 1024), Err(FsError::InvalidGeometry(_))));
        assert!(matches!(sb.verify(512, 100), Err(FsError::Corrupted(_))));
    }
}
