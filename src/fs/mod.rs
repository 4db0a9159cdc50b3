use log::{debug, info};

use crate::{
    disk::BlockDevice,
    fs::{
        config::{Geometry, DEFAULT_OFT_CAPACITY},
        directory::Directory,
        error::{FsError, Result},
        free_list::FreeList,
        inode_table::InodeTable,
        open_file_table::{Fd, OpenFileTable},
        super_block::SuperBlock,
    },
};

pub mod config;
pub mod directory;
pub mod error;
pub mod file_io;
pub mod free_list;
pub mod inode_table;
pub mod open_file_table;
pub mod region;
pub mod span;
pub mod super_block;

/// Metadata of one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub inode: u32,
    pub size: u64,
    pub blocks: u64,
    pub modified: i64,
}

/// Volume-wide allocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub data_blocks: u64,
    pub free_blocks: u64,
    pub inodes: u32,
    pub free_inodes: u32,
    pub open_files: usize,
    pub open_file_limit: usize,
}

/// A mounted volume. Owns the device, the on-disk tables (kept in memory and
/// written through on every change) and the open file table.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    disk: D,                    // 底层磁盘抽象层
    super_block: SuperBlock,    // 文件系统总体信息
    inodes: InodeTable,         // 所有 inode 管理
    directory: Directory,       // 文件名 -> inode
    free_list: FreeList,        // 数据块分配信息
    oft: OpenFileTable,         // 打开文件表
}

impl<D: BlockDevice> FileSystem<D> {
    /// Writes a fresh superblock, inode table, directory and free list, and
    /// returns the mounted volume.
    pub fn format(disk: D, geometry: Geometry) -> Result<Self> {
        if disk.block_size() != geometry.block_size {
            return Err(FsError::InvalidGeometry(format!(
                "device uses {}-byte blocks, geometry asks for {}",
                disk.block_size(),
                geometry.block_size
            )));
        }
        if disk.block_count() < geometry.block_count {
            return Err(FsError::InvalidGeometry(format!(
                "device has {} blocks, geometry asks for {}",
                disk.block_count(),
                geometry.block_count
            )));
        }

        let super_block = SuperBlock::new(geometry)?;
        let fs = Self {
            inodes: InodeTable::new(&geometry),
            directory: Directory::new(geometry.dir_capacity),
            free_list: FreeList::new(super_block.data_start, super_block.data_blocks()),
            oft: OpenFileTable::new(DEFAULT_OFT_CAPACITY),
            super_block,
            disk,
        };

        let sb = &fs.super_block;
        region::write(&fs.disk, sb.super_region.start, sb.super_region.blocks, sb)?;
        fs.sync_inodes()?;
        fs.sync_directory()?;
        fs.sync_free_list()?;

        info!(
            "formatted volume {}: {} blocks of {} bytes, data starts at block {}",
            sb.volume_id, geometry.block_count, geometry.block_size, sb.data_start
        );
        Ok(fs)
    }

    /// Loads and cross-checks the tables of a formatted volume.
    pub fn mount(disk: D) -> Result<Self> {
        let super_block: SuperBlock = region::read(&disk, config::SUPER_BLOCK_BLOCK_ID)?;
        super_block.verify(disk.block_size(), disk.block_count())?;
        let geometry = super_block.geometry;

        let free_list: FreeList = region::read(&disk, super_block.free_list.start)?;
        let free_list = free_list.restore(super_block.data_start, super_block.data_blocks())?;

        let inodes: InodeTable = region::read(&disk, super_block.inode_table.start)?;
        inodes.verify(&geometry, &free_list)?;

        let directory: Directory = region::read(&disk, super_block.directory.start)?;
        let directory = directory.restore(&geometry)?;

        info!(
            "mounted volume {} ({} files, {} free blocks)",
            super_block.volume_id,
            directory.len(),
            free_list.free_count()
        );
        Ok(Self {
            disk,
            super_block,
            inodes,
            directory,
            free_list,
            oft: OpenFileTable::new(DEFAULT_OFT_CAPACITY),
        })
    }

    /// Hands the device back. Open descriptors are dropped; every change was
    /// already written through.
    pub fn unmount(self) -> D {
        if self.oft.open_count() > 0 {
            debug!("unmounting with {} open descriptors", self.oft.open_count());
        }
        self.disk
    }

    /// Replaces the open file table with an empty one of `capacity` slots.
    pub fn with_open_file_limit(mut self, capacity: usize) -> Self {
        self.oft = OpenFileTable::new(capacity);
        self
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn geometry(&self) -> &Geometry {
        &self.super_block.geometry
    }

    /// Creates `name`, or truncates it to zero bytes if it already exists,
    /// and opens it.
    pub fn create(&mut self, name: &str) -> Result<Fd> {
        self.check_name(name)?;

        let inum = match self.directory.lookup(name) {
            Some(inum) => {
                debug!("create '{}': truncating inode {}", name, inum);
                self.inodes.reset(inum, &mut self.free_list)?;
                self.sync_free_list()?;
                self.sync_inodes()?;
                inum
            }
            None => {
                let inum = self
                    .free_inode()
                    .ok_or_else(|| FsError::InodesExhausted(name.to_string()))?;
                if self.directory.is_full() {
                    return Err(FsError::DirectoryFull(name.to_string()));
                }
                // 空闲 inode 可能残留旧的映射
                self.inodes.reset(inum, &mut self.free_list)?;
                self.directory.insert(name, inum)?;
                self.sync_free_list()?;
                self.sync_inodes()?;
                self.sync_directory()?;
                debug!("create '{}': inode {}", name, inum);
                inum
            }
        };
        self.oft.acquire(inum)
    }

    /// Opens an existing file with a fresh cursor at 0.
    pub fn open(&mut self, name: &str) -> Result<Fd> {
        let inum = self
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        self.oft.acquire(inum)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.oft.release(fd)
    }

    /// Adds a reference to `fd`; it stays open until closed once per reference.
    pub fn dup(&mut self, fd: Fd) -> Result<Fd> {
        self.oft.retain(fd)?;
        Ok(fd)
    }

    /// Deletes `name`, releasing its blocks and inode.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let inum = self
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        if self.oft.is_open(inum) {
            return Err(FsError::FileBusy(name.to_string()));
        }

        self.inodes.reset(inum, &mut self.free_list)?;
        self.directory.remove(name);
        self.sync_free_list()?;
        self.sync_inodes()?;
        self.sync_directory()?;
        debug!("removed '{}' (inode {})", name, inum);
        Ok(())
    }

    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let inum = self
            .directory
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        self.stat_inode(name, inum)
    }

    /// All files, sorted by name.
    pub fn list(&self) -> Result<Vec<FileStat>> {
        let mut files = self
            .directory
            .entries()
            .map(|entry| self.stat_inode(&entry.name, entry.inum))
            .collect::<Result<Vec<_>>>()?;
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn usage(&self) -> Usage {
        Usage {
            data_blocks: self.free_list.total_blocks(),
            free_blocks: self.free_list.free_count(),
            inodes: self.inodes.len(),
            free_inodes: self.inodes.len().saturating_sub(self.directory.len() as u32),
            open_files: self.oft.open_count(),
            open_file_limit: self.oft.capacity(),
        }
    }

    fn stat_inode(&self, name: &str, inum: u32) -> Result<FileStat> {
        let inode = self.inodes.get(inum)?;
        Ok(FileStat {
            name: name.to_string(),
            inode: inum,
            size: inode.size,
            blocks: inode.block_count(),
            modified: inode.modified,
        })
    }

    /// Lowest inode no directory entry refers to.
    fn free_inode(&self) -> Option<u32> {
        (0..self.inodes.len()).find(|&inum| !self.directory.references(inum))
    }

    fn check_name(&self, name: &str) -> Result<()> {
        let bad = name.is_empty()
            || name.len() > self.geometry().max_name_len
            || name.contains(['/', '\0'])
            || name.trim() != name;
        if bad {
            return Err(FsError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn sync_inodes(&self) -> Result<()> {
        let r = self.super_block.inode_table;
        region::write(&self.disk, r.start, r.blocks, &self.inodes)
    }

    fn sync_directory(&self) -> Result<()> {
        let r = self.super_block.directory;
        region::write(&self.disk, r.start, r.blocks, &self.directory)
    }

    fn sync_free_list(&self) -> Result<()> {
        let r = self.super_block.free_list;
        region::write(&self.disk, r.start, r.blocks, &self.free_list)
    }
}
