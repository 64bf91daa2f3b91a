//! RAM-backed block medium.
//!
//! Stands in for the SD card on the host: the demo binary serves it, and
//! tests use its fault injection to make individual blocks fail the way a
//! worn or missing card would.

use std::collections::BTreeSet;

use crate::error::DiskError;
use crate::ports::BlockDevice;
use crate::protocol::codec::{BLOCK_SIZE, Block};

/// Largest RAM medium `try_new` will allocate (1 GiB).
pub const MAX_RAM_BLOCKS: u32 = 1 << 21;

pub struct MemDisk {
    blocks: Vec<Block>,
    faulty: BTreeSet<u32>,
    reads: u64,
    writes: u64,
}

impl MemDisk {
    /// A zero-filled medium of `block_count` blocks.
    pub fn new(block_count: u32) -> Self {
        Self {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count as usize],
            faulty: BTreeSet::new(),
            reads: 0,
            writes: 0,
        }
    }

    /// Like [`MemDisk::new`], but refuses sizes above [`MAX_RAM_BLOCKS`]
    /// instead of attempting the allocation.
    pub fn try_new(block_count: u32) -> Result<Self, DiskError> {
        if block_count > MAX_RAM_BLOCKS {
            return Err(DiskError::TooLarge {
                blocks: block_count,
            });
        }
        Ok(Self::new(block_count))
    }

    /// Make every read and write of `block` fail until cleared.
    pub fn inject_fault(&mut self, block: u32) {
        self.faulty.insert(block);
    }

    pub fn clear_fault(&mut self, block: u32) {
        self.faulty.remove(&block);
    }

    /// Raw view of a block, bypassing fault injection.
    pub fn block(&self, block: u32) -> Option<&Block> {
        self.blocks.get(block as usize)
    }

    /// Successful physical reads so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Successful physical writes so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn check(&self, block: u32) -> Result<usize, DiskError> {
        if self.faulty.contains(&block) {
            return Err(DiskError::Fault { block });
        }
        let idx = block as usize;
        if idx >= self.blocks.len() {
            return Err(DiskError::OutOfRange { block });
        }
        Ok(idx)
    }
}

impl BlockDevice for MemDisk {
    type Error = DiskError;

    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn read_block(&mut self, block: u32, buf: &mut Block) -> Result<(), DiskError> {
        let idx = self.check(block)?;
        buf.copy_from_slice(&self.blocks[idx]);
        self.reads += 1;
        Ok(())
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<(), DiskError> {
        let idx = self.check(block)?;
        self.blocks[idx].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
