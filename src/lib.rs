//! BFS: a small single-directory file system living in a flat disk image.
//!
//! The image is split into fixed-size blocks: a superblock at block 0, then
//! the inode table, the directory and the free list, then data blocks.
//! [`FileSystem`] owns all of it and exposes create/open/close and
//! byte-granular read/write/seek on descriptors.

pub mod disk;
pub mod fs;
pub mod utils;

pub use disk::{BlockDevice, FileDisk, MemDisk};
pub use fs::{
    config::Geometry,
    error::{ErrorClass, FsError, Result},
    file_io::Whence,
    open_file_table::Fd,
    FileStat, FileSystem, Usage,
};
