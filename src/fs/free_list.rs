use log::trace;
use serde::{Deserialize, Serialize};

use crate::fs::error::{FsError, Result};

/// Allocation bitmap over the data area. Bit `i` covers DBN `data_start + i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeList {
    bits: Vec<u8>,      // 位图数据，每个 bit 表示一个数据块是否被使用
    data_start: u64,    // 数据区起始块号
    total_blocks: u64,  // 数据块总数
    #[serde(skip)]
    free_blocks: u64,   // 当前空闲块数，加载时重新统计
}

impl FreeList {
    pub fn new(data_start: u64, total_blocks: u64) -> Self {
        let byte_len = ((total_blocks + 7) / 8) as usize;

        Self {
            bits: vec![0; byte_len],
            data_start,
            total_blocks,
            free_blocks: total_blocks,
        }
    }

    /// Allocates the lowest free data block and returns its DBN.
    pub fn alloc(&mut self) -> Option<u64> {
        for (byte_index, byte) in self.bits.iter_mut().enumerate() {
            if *byte != 0xFF {
                for bit in 0..8 {
                    let index = (byte_index * 8 + bit) as u64;
                    if index >= self.total_blocks {
                        return None;
                    }
                    if *byte & (1 << bit) == 0 {
                        *byte |= 1 << bit;
                        self.free_blocks -= 1;
                        let dbn = self.data_start + index;
                        trace!("allocated block {}", dbn);
                        return Some(dbn);
                    }
                }
            }
        }
        None
    }

    /// Marks `dbn` free. Freeing a free or out-of-range block does nothing.
    pub fn release(&mut self, dbn: u64) {
        let Some(index) = self.index_of(dbn) else {
            return;
        };

        let byte_index = (index / 8) as usize;
        let bit_index = (index % 8) as u8;

        if self.bits[byte_index] & (1 << bit_index) != 0 {
            self.bits[byte_index] &= !(1 << bit_index);
            self.free_blocks += 1;
            trace!("released block {}", dbn);
        }
    }

    pub fn is_allocated(&self, dbn: u64) -> bool {
        match self.index_of(dbn) {
            Some(index) => self.bits[(index / 8) as usize] & (1 << (index % 8)) != 0,
            None => false,
        }
    }

    pub fn free_count(&self) -> u64 {
        self.free_blocks
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    fn index_of(&self, dbn: u64) -> Option<u64> {
        dbn.checked_sub(self.data_start)
            .filter(|&index| index < self.total_blocks)
    }

    /// Recounts free blocks after loading and checks the bitmap shape.
    pub fn restore(mut self, data_start: u64, total_blocks: u64) -> Result<Self> {
        if self.data_start != data_start
            || self.total_blocks != total_blocks
            || self.bits.len() != ((total_blocks + 7) / 8) as usize
        {
            return Err(FsError::Corrupted("free list does not match the layout".to_string()));
        }
        let used = self.bits.iter().map(|b| b.count_ones() as u64).sum::<u64>();
        if used > total_blocks {
            return Err(FsError::Corrupted("free list marks padding bits".to_string()));
        }
        self.free_blocks = total_blocks - used;
        Ok(self)
    }
}
