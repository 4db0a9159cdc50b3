use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::fs::{
    config::Geometry,
    error::{FsError, Result},
};

// 一个目录项
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inum: u32,
}

/// The volume's single flat namespace: a fixed number of slots, each either
/// empty or holding one (name, inode) pair.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Directory {
    slots: Vec<Option<DirEntry>>,
    #[serde(skip)]
    index_map: HashMap<String, usize>, // name -> slot
}

impl Directory {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: vec![None; capacity as usize],
            index_map: HashMap::new(),
        }
    }

    /// A directory with every slot holding a maximum-length name, used to
    /// size the on-disk region.
    pub fn worst_case(geometry: &Geometry) -> Self {
        let name = "x".repeat(geometry.max_name_len);
        Self {
            slots: (0..geometry.dir_capacity)
                .map(|_| {
                    Some(DirEntry {
                        name: name.clone(),
                        inum: u32::MAX,
                    })
                })
                .collect(),
            index_map: HashMap::new(),
        }
    }

    /// Rebuilds the name index after loading and checks the entries against
    /// the geometry.
    pub fn restore(mut self, geometry: &Geometry) -> Result<Self> {
        if self.slots.len() != geometry.dir_capacity as usize {
            return Err(FsError::Corrupted(format!(
                "directory has {} slots, expected {}",
                self.slots.len(),
                geometry.dir_capacity
            )));
        }
        self.index_map.clear();
        let mut seen = HashSet::new();
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(entry) = entry {
                if entry.inum >= geometry.inode_count
                    || !seen.insert(entry.inum)
                    || self.index_map.insert(entry.name.clone(), slot).is_some()
                {
                    return Err(FsError::Corrupted(format!(
                        "bad directory entry '{}'",
                        entry.name
                    )));
                }
            }
        }
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.index_map
            .get(name)
            .and_then(|&slot| self.slots[slot].as_ref())
            .map(|entry| entry.inum)
    }

    /// Adds `name` in the first free slot and returns that slot.
    pub fn insert(&mut self, name: &str, inum: u32) -> Result<usize> {
        if self.index_map.contains_key(name) {
            return Err(FsError::Corrupted(format!("duplicate directory entry '{}'", name)));
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| FsError::DirectoryFull(name.to_string()))?;

        self.slots[slot] = Some(DirEntry {
            name: name.to_string(),
            inum,
        });
        self.index_map.insert(name.to_string(), slot);
        Ok(slot)
    }

    // 删除目录项，返回 inode 编号
    pub fn remove(&mut self, name: &str) -> Option<u32> {
        let slot = self.index_map.remove(name)?;
        self.slots[slot].take().map(|entry| entry.inum)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn references(&self, inum: u32) -> bool {
        self.entries().any(|entry| entry.inum == inum)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.index_map.len()
    }

}
