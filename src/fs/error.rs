use std::path::PathBuf;

use thiserror::Error;

use crate::fs::open_file_table::Fd;

/// How a caller is expected to treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The "file not found" class: the caller may branch or retry.
    Recoverable,
    /// The operation was aborted; no rollback was attempted.
    Fatal,
}

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FsError {
    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("disk image not found: {}", .0.display())]
    NoDisk(PathBuf),

    #[error("cannot create disk image {}: {source}", .path.display())]
    DiskCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("no free inode left for '{0}'")]
    InodesExhausted(String),

    #[error("directory is full, cannot add '{0}'")]
    DirectoryFull(String),

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("file is open: {0}")]
    FileBusy(String),

    #[error("bad file descriptor: {0}")]
    BadDescriptor(Fd),

    #[error("open file table is full ({0} entries)")]
    OpenTableFull(usize),

    #[error("negative seek offset: {0}")]
    NegativeOffset(i64),

    #[error("unknown seek origin: {0}")]
    BadWhence(i32),

    #[error("cursor overflow")]
    CursorOverflow,

    #[error("no free data blocks left")]
    DiskFull,

    #[error("file too large: {requested} bytes exceeds the {limit} byte limit")]
    FileTooLarge { requested: u64, limit: u64 },

    #[error("invalid inode: {0}")]
    InvalidInode(u32),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("file system corrupted: {0}")]
    Corrupted(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl FsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_)
            | Self::InodesExhausted(_)
            | Self::DirectoryFull(_)
            | Self::InvalidName(_)
            | Self::FileBusy(_) => ErrorClass::Recoverable,
            _ => ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_exhaustion_is_in_the_not_found_class() {
        assert_eq!(
            FsError::InodesExhausted("a".into()).class(),
            FsError::NotFound("a".into()).class()
        );
        assert!(!FsError::DirectoryFull("a".into()).is_fatal());
    }

    #[test]
    fn descriptor_and_seek_errors_are_fatal() {
        assert!(FsError::BadDescriptor(Fd(3)).is_fatal());
        assert!(FsError::NegativeOffset(-1).is_fatal());
        assert!(FsError::BadWhence(9).is_fatal());
        assert!(FsError::OpenTableFull(20).is_fatal());
    }
}
