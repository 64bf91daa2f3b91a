//! Remote disk: the real-time core's medium seen from the high-level core.
//!
//! Wraps a [`BlockClient`] in the [`BlockDevice`] port so a filesystem can
//! mount the remote card exactly like a local one. Also offers byte-range
//! access within a block (`read_at` / `program`), which filesystems with a
//! smaller program granularity than 512 bytes need; partial writes are a
//! read-modify-write of the whole block.

use log::debug;

use crate::config::BridgeConfig;
use crate::error::{Error, RequestError, Result};
use crate::ports::BlockDevice;
use crate::protocol::channel::Channel;
use crate::protocol::client::BlockClient;
use crate::protocol::codec::{BLOCK_SIZE, Block};

pub struct RemoteDisk<C: Channel> {
    client: BlockClient<C>,
    block_count: u32,
}

impl<C: Channel> RemoteDisk<C> {
    pub fn new(channel: C, config: &BridgeConfig) -> Self {
        Self {
            client: BlockClient::new(channel, config),
            block_count: config.block_count,
        }
    }

    /// Copy `buf.len()` bytes starting at `offset` within `block`.
    pub fn read_at(&mut self, block: u32, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = span(offset, buf.len())?;
        let data = self.client.read_block(block)?;
        buf.copy_from_slice(&data[range]);
        Ok(())
    }

    /// Overwrite `data.len()` bytes at `offset` within `block`, keeping the
    /// rest of the block intact.
    pub fn program(&mut self, block: u32, offset: usize, data: &[u8]) -> Result<()> {
        let range = span(offset, data.len())?;
        if range.len() == BLOCK_SIZE {
            return self.client.write_block_from(block, data);
        }
        let mut whole = self.client.read_block(block)?;
        whole[range].copy_from_slice(data);
        debug!(
            "remote disk: program {} bytes at {}:{}",
            data.len(),
            block,
            offset
        );
        self.client.write_block(block, &whole)
    }

    pub fn client(&self) -> &BlockClient<C> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut BlockClient<C> {
        &mut self.client
    }

    pub fn into_client(self) -> BlockClient<C> {
        self.client
    }
}

fn span(offset: usize, len: usize) -> Result<core::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= BLOCK_SIZE => Ok(offset..end),
        _ => Err(RequestError::BadLength { len }.into()),
    }
}

impl<C: Channel> BlockDevice for RemoteDisk<C> {
    type Error = Error;

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, block: u32, buf: &mut Block) -> Result<()> {
        *buf = self.client.read_block(block)?;
        Ok(())
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
        self.client.write_block(block, data)
    }
}
