//! Raw disk-image medium.
//!
//! Serves blocks out of a file holding a byte-for-byte copy of an SD card
//! (`dd if=/dev/sdX of=card.img`). The block count is the image length in
//! blocks, so images must be a whole number of blocks long.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::info;

use crate::error::DiskError;
use crate::ports::BlockDevice;
use crate::protocol::codec::{BLOCK_SIZE, Block};

pub struct FileDisk {
    file: File,
    block_count: u32,
}

impl FileDisk {
    /// Open an existing image for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(DiskError::ShortImage { len });
        }
        let block_count = u32::try_from(len / BLOCK_SIZE as u64)
            .map_err(|_| DiskError::ShortImage { len })?;
        info!("disk image {}: {} blocks", path.display(), block_count);
        Ok(Self { file, block_count })
    }

    /// Create (or truncate) a zero-filled image of `block_count` blocks.
    pub fn create(path: impl AsRef<Path>, block_count: u32) -> Result<Self, DiskError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(u64::from(block_count) * BLOCK_SIZE as u64)?;
        Ok(Self { file, block_count })
    }

    fn seek_to(&mut self, block: u32) -> Result<(), DiskError> {
        if block >= self.block_count {
            return Err(DiskError::OutOfRange { block });
        }
        self.file
            .seek(SeekFrom::Start(u64::from(block) * BLOCK_SIZE as u64))?;
        Ok(())
    }
}

impl BlockDevice for FileDisk {
    type Error = DiskError;

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, block: u32, buf: &mut Block) -> Result<(), DiskError> {
        self.seek_to(block)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<(), DiskError> {
        self.seek_to(block)?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DiskError> {
        self.file.sync_data()?;
        Ok(())
    }
}
