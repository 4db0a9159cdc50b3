use std::fmt;

use log::debug;

use crate::fs::error::{FsError, Result};

/// A caller-visible handle naming one open file table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fd(pub usize);

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub inum: u32,
    pub cursor: u64,
    pub refs: u32,
}

/// Bounded in-memory table of open files. Every `open` gets its own slot and
/// therefore its own cursor, even when the inode is already open.
#[derive(Debug)]
pub struct OpenFileTable {
    entries: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Takes the lowest free slot for `inum` with cursor 0 and one reference.
    pub fn acquire(&mut self, inum: u32) -> Result<Fd> {
        let slot = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::OpenTableFull(self.entries.len()))?;

        self.entries[slot] = Some(OpenFile {
            inum,
            cursor: 0,
            refs: 1,
        });
        debug!("fd {} -> inode {}", slot, inum);
        Ok(Fd(slot))
    }

    /// Adds a reference to an open slot.
    pub fn retain(&mut self, fd: Fd) -> Result<()> {
        self.get_mut(fd)?.refs += 1;
        Ok(())
    }

    /// Drops one reference; the slot and its cursor are discarded at zero.
    pub fn release(&mut self, fd: Fd) -> Result<()> {
        let entry = self.get_mut(fd)?;
        entry.refs -= 1;
        if entry.refs == 0 {
            self.entries[fd.0] = None;
            debug!("fd {} closed", fd);
        }
        Ok(())
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.entries
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(FsError::BadDescriptor(fd))
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.entries
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(FsError::BadDescriptor(fd))
    }

    pub fn inode_of(&self, fd: Fd) -> Result<u32> {
        Ok(self.get(fd)?.inum)
    }

    pub fn is_open(&self, inum: u32) -> bool {
        self.entries.iter().flatten().any(|entry| entry.inum == inum)
    }

    pub fn open_count(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inode_gets_independent_slots() {
        let mut oft = OpenFileTable::new(4);
        let a = oft.acquire(3).unwrap();
        let b = oft.acquire(3).unwrap();
        assert_ne!(a, b);

        oft.get_mut(a).unwrap().cursor = 10;
        assert_eq!(oft.get(b).unwrap().cursor, 0);
    }

    #[test]
    fn exhaustion_and_slot_reuse() {
        let mut oft = OpenFileTable::new(2);
        assert_eq!(oft.capacity(), 2);
        let a = oft.acquire(0).unwrap();
        oft.acquire(1).unwrap();
        assert!(matches!(oft.acquire(2), Err(FsError::OpenTableFull(2))));

        oft.release(a).unwrap();
        assert_eq!(oft.acquire(2).unwrap(), a);
        assert_eq!(oft.get(a).unwrap().cursor, 0);
    }

    #[test]
    fn refcount_keeps_slot_alive() {
        let mut oft = OpenFileTable::new(2);
        let fd = oft.acquire(5).unwrap();
        oft.retain(fd).unwrap();

        oft.release(fd).unwrap();
        assert_eq!(oft.inode_of(fd).unwrap(), 5);
        oft.release(fd).unwrap();
        assert!(matches!(oft.inode_of(fd), Err(FsError::BadDescriptor(_))));
        assert!(!oft.is_open(5));
    }

    #[test]
    fn unknown_descriptor() {
        let mut oft = OpenFileTable::new(1);
        assert!(oft.get(Fd(7)).is_err());
        assert!(oft.release(Fd(0)).is_err());
    }
}
