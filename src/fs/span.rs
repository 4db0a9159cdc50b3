//! Byte range to block translation.
//!
//! A transfer of `len` bytes starting at byte `cursor` touches a sequence of
//! file blocks; [`spans`] yields one [`Span`] per block, telling which bytes of
//! the block and which bytes of the caller's buffer correspond. Nothing here
//! touches the device.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// File block number.
    pub fbn: u64,
    /// Offset inside the block.
    pub offset: usize,
    pub len: usize,
    /// Offset inside the caller's buffer.
    pub buf_offset: usize,
}

impl Span {
    pub fn block_range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    pub fn buf_range(&self) -> Range<usize> {
        self.buf_offset..self.buf_offset + self.len
    }

    /// True when the span covers its whole block.
    pub fn is_full(&self, block_size: usize) -> bool {
        self.offset == 0 && self.len == block_size
    }
}

#[derive(Debug, Clone)]
pub struct Spans {
    pos: u64,
    remaining: usize,
    buf_offset: usize,
    block_size: usize,
}

pub fn spans(cursor: u64, len: usize, block_size: usize) -> Spans {
    Spans {
        pos: cursor,
        remaining: len,
        buf_offset: 0,
        block_size,
    }
}

impl Iterator for Spans {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.remaining == 0 {
            return None;
        }
        let bs = self.block_size as u64;
        let offset = (self.pos % bs) as usize;
        let len = (self.block_size - offset).min(self.remaining);

        let span = Span {
            fbn: self.pos / bs,
            offset,
            len,
            buf_offset: self.buf_offset,
        };
        self.pos += len as u64;
        self.remaining -= len;
        self.buf_offset += len;
        Some(span)
    }
}
