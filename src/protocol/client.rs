//! Block transport client — runs on the high-level core.
//!
//! Turns synchronous block reads and writes into request frames, then pumps
//! the channel until the matching result arrives. Every received frame goes
//! through the same three-gate path:
//!
//! 1. **Decode** — malformed frames are logged and dropped.
//! 2. **Direction** — request kinds arriving here are logged and dropped.
//! 3. **Match** — results are matched to the pending table by block number
//!    and operation; anything unmatched is stale and dropped.
//!
//! Results for other in-flight addresses are parked in their entries until
//! their own caller waits on them.

use core::time::Duration;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::config::BridgeConfig;
use crate::diagnostics::{TransportStats, hex_dump};
use crate::error::{Error, RequestError, Result, StorageFault};

use super::channel::Channel;
use super::codec::{Block, Message, decode};
use super::pending::{Completion, Delivery, Operation, PendingTable};

/// High-level-core half of the bridge.
pub struct BlockClient<C: Channel> {
    channel: C,
    pending: PendingTable,
    timeout: Duration,
    trace_blocks: bool,
    stats: TransportStats,
}

impl<C: Channel> BlockClient<C> {
    pub fn new(channel: C, config: &BridgeConfig) -> Self {
        Self {
            channel,
            pending: PendingTable::new(usize::from(config.max_in_flight)),
            timeout: config.response_timeout(),
            trace_blocks: config.trace_blocks,
            stats: TransportStats::default(),
        }
    }

    /// Read one block. Blocks until its result arrives or the response
    /// timeout elapses.
    pub fn read_block(&mut self, block: u32) -> Result<Block> {
        self.submit_read(block)?;
        match self.wait(block)? {
            Completion::Read(data) => Ok(data),
            // Read entries only ever complete with data or a failure code,
            // and failures already came back as `Error::Storage`.
            Completion::Written | Completion::Failed(_) => {
                Err(RequestError::NotPending { block }.into())
            }
        }
    }

    /// Write one block and wait for the acknowledgement.
    pub fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
        self.submit_write(block, data)?;
        self.wait(block).map(|_| ())
    }

    /// Write from a slice. Anything but exactly one block is rejected
    /// before a frame is built.
    pub fn write_block_from(&mut self, block: u32, data: &[u8]) -> Result<()> {
        let data: &Block = data
            .try_into()
            .map_err(|_| RequestError::BadLength { len: data.len() })?;
        self.write_block(block, data)
    }

    /// Send a read request without waiting for its result.
    ///
    /// Every submission first evicts entries older than the response
    /// timeout, so unwaited requests cannot hold table slots forever.
    pub fn submit_read(&mut self, block: u32) -> Result<()> {
        self.submit(block, Operation::Read, &Message::ReadRequest { block })
    }

    /// Send a write request without waiting for its result.
    pub fn submit_write(&mut self, block: u32, data: &Block) -> Result<()> {
        if self.trace_blocks {
            trace!("{}", hex_dump(block, data));
        }
        let msg = Message::WriteRequest { block, data: *data };
        self.submit(block, Operation::Write, &msg)
    }

    fn submit(&mut self, block: u32, op: Operation, msg: &Message) -> Result<()> {
        let now = Instant::now();
        for expired in self.pending.evict_expired(now, self.timeout) {
            self.stats.timeouts += 1;
            warn!("client: block {} expired without a wait", expired);
        }
        self.pending.register(block, op, now)?;

        if let Err(e) = self.channel.send(&msg.encode()) {
            warn!("client: send {:?} for block {} failed: {}", op, block, e);
            self.pending.cancel(block);
            return Err(e.into());
        }

        self.stats.requests_sent += 1;
        debug!("client: {:?} block {} sent", op, block);
        Ok(())
    }

    /// Wait for the result of an earlier submit for `block`.
    ///
    /// Returns the completion on success, `Error::Storage` if the real-time
    /// core reported a negative code, or `Error::Timeout` once the response
    /// timeout (counted from submission) has passed. On timeout the entry
    /// is dropped and a late result will be discarded as stale.
    pub fn wait(&mut self, block: u32) -> Result<Completion> {
        loop {
            if let Some((op, completion)) = self.pending.take(block) {
                return self.finish(block, op, completion);
            }

            let issued_at = self
                .pending
                .issued_at(block)
                .ok_or(RequestError::NotPending { block })?;
            let elapsed = issued_at.elapsed();
            if elapsed >= self.timeout {
                self.pending.cancel(block);
                self.stats.timeouts += 1;
                warn!(
                    "client: block {} timed out after {} ms",
                    block,
                    elapsed.as_millis()
                );
                return Err(Error::Timeout { block });
            }

            if let Err(e) = self.pump(self.timeout - elapsed) {
                self.pending.cancel(block);
                return Err(e);
            }
        }
    }

    fn finish(&mut self, block: u32, op: Operation, completion: Completion) -> Result<Completion> {
        match completion {
            Completion::Failed(code) => {
                self.stats.storage_faults += 1;
                warn!("client: {:?} block {} failed with code {}", op, block, code);
                Err(StorageFault { block, code }.into())
            }
            other => {
                self.stats.completed += 1;
                if let (true, Completion::Read(data)) = (self.trace_blocks, &other) {
                    trace!("{}", hex_dump(block, data));
                }
                Ok(other)
            }
        }
    }

    /// Receive at most one frame (waiting up to `timeout`) and dispatch it.
    /// Returns whether a frame was received. Only channel faults are errors.
    pub fn pump(&mut self, timeout: Duration) -> Result<bool> {
        let Some(frame) = self.channel.receive(timeout)? else {
            return Ok(false);
        };

        let msg = match decode(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.malformed_dropped += 1;
                warn!("client: dropping malformed frame: {}", e);
                return Ok(true);
            }
        };

        if msg.kind().is_request() {
            self.stats.unexpected_dropped += 1;
            warn!(
                "client: dropping unexpected {:?} for block {}",
                msg.kind(),
                msg.block()
            );
            return Ok(true);
        }

        match self.pending.deliver(&msg) {
            Delivery::Completed => trace!("client: result for block {} matched", msg.block()),
            Delivery::Stale => {
                self.stats.stale_dropped += 1;
                debug!(
                    "client: discarding stale {:?} for block {}",
                    msg.kind(),
                    msg.block()
                );
            }
        }
        Ok(true)
    }

    /// Abandon the request for `block`. A result arriving later is stale.
    pub fn cancel(&mut self, block: u32) -> bool {
        self.pending.cancel(block)
    }

    /// Number of block addresses currently in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}
