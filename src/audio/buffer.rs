//! Sliding window of raw audio blocks
//!
//! The window holds the most recent `capacity` blocks and is pre-filled
//! with silence, so it is always full. Only the newest block is handed to
//! the analyzer; older blocks are carried as history.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

/// What the stream loop does when a read delivers less than a full block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderrunPolicy {
    /// Leave the window untouched and analyze its current contents again
    Reuse,
    /// Skip the cycle, no packet is sent
    Skip,
}

/// Fixed-capacity ring of PCM blocks
pub struct RingWindow {
    /// Blocks in insertion order, oldest at the front
    blocks: VecDeque<Bytes>,
    capacity: usize,
    chunk_size: usize,
    /// Blocks accepted since creation (silence excluded)
    pushed: u64,
    /// Evictions caused by pushes
    evicted: u64,
    /// Pushes refused because the block had the wrong length
    rejected: u64,
}

impl RingWindow {
    /// Create a window of `capacity` silent blocks of `chunk_size` bytes
    pub fn new(capacity: usize, chunk_size: usize) -> Self {
        let silence = Bytes::from(vec![0u8; chunk_size]);
        let mut blocks = VecDeque::with_capacity(capacity + 1);
        for _ in 0..capacity {
            blocks.push_back(silence.clone());
        }

        Self {
            blocks,
            capacity,
            chunk_size,
            pushed: 0,
            evicted: 0,
            rejected: 0,
        }
    }

    /// Build from total window bytes, truncating to whole blocks
    pub fn with_buffer_size(buffer_size: usize, chunk_size: usize) -> Self {
        let capacity = if chunk_size == 0 { 0 } else { buffer_size / chunk_size };
        Self::new(capacity, chunk_size)
    }

    /// Push a full block, evicting the oldest when at capacity.
    ///
    /// Returns false and leaves the window unchanged if `block` is not
    /// exactly `chunk_size` bytes.
    pub fn push(&mut self, block: Bytes) -> bool {
        if block.len() != self.chunk_size || self.capacity == 0 {
            self.rejected += 1;
            return false;
        }

        self.blocks.push_back(block);
        while self.blocks.len() > self.capacity {
            self.blocks.pop_front();
            self.evicted += 1;
        }
        self.pushed += 1;
        true
    }

    /// All blocks concatenated, newest first
    pub fn combined(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.capacity * self.chunk_size);
        for block in self.blocks.iter().rev() {
            out.extend_from_slice(block);
        }
        out.freeze()
    }

    /// The first `chunk_size` bytes of [`combined`](Self::combined).
    ///
    /// Every stored block is exactly `chunk_size` long, so this is the
    /// newest block and is returned without building the concatenation.
    pub fn analysis_block(&self) -> Bytes {
        self.blocks.back().cloned().unwrap_or_default()
    }

    /// Most recent block, if any
    pub fn newest(&self) -> Option<&Bytes> {
        self.blocks.back()
    }

    /// Oldest retained block, if any
    pub fn oldest(&self) -> Option<&Bytes> {
        self.blocks.front()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get statistics
    pub fn stats(&self) -> RingStats {
        RingStats {
            pushed: self.pushed,
            evicted: self.evicted,
            rejected: self.rejected,
        }
    }
}

/// Ring window statistics
#[derive(Debug, Clone, Default)]
pub struct RingStats {
    pub pushed: u64,
    pub evicted: u64,
    pub rejected: u64,
}
