//! Block transport server — runs on the real-time core.
//!
//! Receives request frames, performs the physical I/O against the medium,
//! and answers each request with exactly one result frame. Requests are
//! processed strictly one at a time: the next frame is not received until
//! the previous reply has been sent.
//!
//! Failures never reach the wire as anything but a result code:
//! - address out of range → [`RESULT_OUT_OF_RANGE`], medium untouched
//! - medium error         → [`RESULT_IO_ERROR`]

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use log::{debug, info, trace, warn};

use crate::diagnostics::{ServerStats, hex_dump};
use crate::error::{ChannelFault, Error, Result};
use crate::ports::BlockDevice;

use super::channel::Channel;
use super::codec::{
    BLOCK_SIZE, Frame, Message, RESULT_IO_ERROR, RESULT_OK, RESULT_OUT_OF_RANGE, decode,
};

/// How long `run` blocks in one receive before re-checking its stop flag.
const RUN_POLL: Duration = Duration::from_millis(50);

/// Real-time-core half of the bridge. Owns the medium exclusively.
pub struct BlockServer<D: BlockDevice> {
    device: D,
    trace_blocks: bool,
    stats: ServerStats,
}

impl<D: BlockDevice> BlockServer<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            trace_blocks: false,
            stats: ServerStats::default(),
        }
    }

    /// Hex-dump every block read or written at trace level.
    pub fn with_block_trace(mut self, enabled: bool) -> Self {
        self.trace_blocks = enabled;
        self
    }

    /// Serve one decoded message. Requests always produce a reply; result
    /// kinds are not ours to answer and produce none.
    pub fn handle(&mut self, msg: Message) -> Option<Message> {
        match msg {
            Message::ReadRequest { block } => Some(self.read(block)),
            Message::WriteRequest { block, data } => Some(self.write(block, &data)),
            other => {
                self.stats.unexpected_dropped += 1;
                warn!(
                    "server: dropping unexpected {:?} for block {}",
                    other.kind(),
                    other.block()
                );
                None
            }
        }
    }

    fn in_range(&self, block: u32) -> bool {
        block < self.device.block_count()
    }

    fn read(&mut self, block: u32) -> Message {
        self.stats.reads += 1;
        if !self.in_range(block) {
            self.stats.out_of_range += 1;
            warn!(
                "server: read of block {} beyond medium ({} blocks)",
                block,
                self.device.block_count()
            );
            return Message::ReadFailed {
                block,
                result: RESULT_OUT_OF_RANGE,
            };
        }

        let mut data = [0u8; BLOCK_SIZE];
        match self.device.read_block(block, &mut data) {
            Ok(()) => {
                debug!("server: READ block {}", block);
                if self.trace_blocks {
                    trace!("{}", hex_dump(block, &data));
                }
                Message::ReadResult { block, data }
            }
            Err(e) => {
                self.stats.io_failures += 1;
                warn!("server: reading block {} failed: {:?}", block, e);
                Message::ReadFailed {
                    block,
                    result: RESULT_IO_ERROR,
                }
            }
        }
    }

    fn write(&mut self, block: u32, data: &[u8; BLOCK_SIZE]) -> Message {
        self.stats.writes += 1;
        if !self.in_range(block) {
            self.stats.out_of_range += 1;
            warn!(
                "server: write of block {} beyond medium ({} blocks)",
                block,
                self.device.block_count()
            );
            return Message::WriteResult {
                block,
                result: RESULT_OUT_OF_RANGE,
            };
        }

        if self.trace_blocks {
            trace!("{}", hex_dump(block, data));
        }
        let result = match self.device.write_block(block, data) {
            Ok(()) => {
                debug!("server: WRITE block {}", block);
                RESULT_OK
            }
            Err(e) => {
                self.stats.io_failures += 1;
                warn!("server: writing block {} failed: {:?}", block, e);
                RESULT_IO_ERROR
            }
        };
        Message::WriteResult { block, result }
    }

    /// Decode, serve and encode one frame. Malformed frames are dropped.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<Frame> {
        match decode(frame) {
            Ok(msg) => self.handle(msg).map(|reply| reply.encode()),
            Err(e) => {
                self.stats.malformed_dropped += 1;
                warn!("server: dropping malformed frame: {}", e);
                None
            }
        }
    }

    /// Receive one frame (waiting up to `timeout`), serve it to completion
    /// and send the reply. Returns whether a frame was received.
    pub fn serve_next<C: Channel>(&mut self, channel: &mut C, timeout: Duration) -> Result<bool> {
        let Some(frame) = channel.receive(timeout)? else {
            return Ok(false);
        };
        if let Some(reply) = self.handle_frame(&frame) {
            channel.send(&reply)?;
        }
        Ok(true)
    }

    /// Serve requests until `stop` is set or the peer disconnects.
    pub fn run<C: Channel>(&mut self, channel: &mut C, stop: &AtomicBool) -> Result<()> {
        info!(
            "server: serving {} blocks of {} bytes",
            self.device.block_count(),
            BLOCK_SIZE
        );
        while !stop.load(Ordering::Acquire) {
            match self.serve_next(channel, RUN_POLL) {
                Ok(_) => {}
                Err(Error::Channel(ChannelFault::Disconnected)) => {
                    info!("server: peer disconnected");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "server: stopped after {} reads, {} writes",
            self.stats.reads, self.stats.writes
        );
        Ok(())
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
