//! Port traits — the boundary between the bridge and the storage medium.
//!
//! ```text
//!   BlockServer ──▶ BlockDevice ◀── MemDisk / FileDisk / SD card driver
//!   filesystem  ──▶ BlockDevice ◀── RemoteDisk (over BlockClient)
//! ```
//!
//! The same trait sits on both sides of the bridge: the real-time core's
//! server drives a physical medium through it, and the high-level core's
//! filesystem consumes the remote medium through it.

use crate::protocol::codec::{BLOCK_SIZE, Block};

/// A medium addressed in fixed 512-byte blocks.
pub trait BlockDevice {
    /// Error type for this medium.
    type Error: core::fmt::Debug;

    /// Number of addressable blocks; valid addresses are `0..block_count()`.
    fn block_count(&self) -> u32;

    /// Read one whole block into `buf`.
    fn read_block(&mut self, block: u32, buf: &mut Block) -> Result<(), Self::Error>;

    /// Write one whole block.
    fn write_block(&mut self, block: u32, data: &Block) -> Result<(), Self::Error>;

    /// Erase a block. SD cards have no erase-before-write requirement, so
    /// erasing is a zero-fill.
    fn erase_block(&mut self, block: u32) -> Result<(), Self::Error> {
        self.write_block(block, &[0u8; BLOCK_SIZE])
    }

    /// Flush buffered writes. Whole-block writes are durable on return by
    /// default.
    fn sync(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    type Error = D::Error;

    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_block(&mut self, block: u32, buf: &mut Block) -> Result<(), Self::Error> {
        (**self).read_block(block, buf)
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<(), Self::Error> {
        (**self).write_block(block, data)
    }

    fn erase_block(&mut self, block: u32) -> Result<(), Self::Error> {
        (**self).erase_block(block)
    }

    fn sync(&mut self) -> Result<(), Self::Error> {
        (**self).sync()
    }
}
