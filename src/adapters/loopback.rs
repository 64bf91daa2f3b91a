//! In-process loopback transport.
//!
//! Two [`LoopbackEndpoint`]s joined by a pair of bounded frame queues, one
//! per direction. Lets both halves of the bridge run in one host process
//! (server on its own thread) with the same ordering guarantees as the
//! inter-core socket.
//!
//! ```text
//!   endpoint A ──send──▶ [ a_to_b queue ] ──receive──▶ endpoint B
//!   endpoint A ◀─receive─ [ b_to_a queue ] ◀──send─── endpoint B
//! ```
//!
//! Dropping either endpoint closes both directions. The survivor can still
//! drain frames already queued, after which `receive` reports
//! [`ChannelFault::Disconnected`].

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel as FrameQueue;
use log::{debug, warn};

use crate::error::ChannelFault;
use crate::protocol::channel::Channel;
use crate::protocol::codec::Frame;

/// Frames each direction can hold before `send` starts waiting.
pub const LOOPBACK_DEPTH: usize = 8;

/// Poll interval while waiting on an empty or full queue.
const POLL: Duration = Duration::from_millis(1);

/// How long `send` waits for queue space before giving up.
const SEND_BOUND: Duration = Duration::from_millis(500);

struct Link {
    queue: FrameQueue<CriticalSectionRawMutex, Frame, LOOPBACK_DEPTH>,
    closed: AtomicBool,
}

impl Link {
    fn new() -> Self {
        Self {
            queue: FrameQueue::new(),
            closed: AtomicBool::new(false),
        }
    }
}

/// One end of a loopback pair.
pub struct LoopbackEndpoint {
    name: &'static str,
    tx: Arc<Link>,
    rx: Arc<Link>,
}

/// Create two connected endpoints, named for log output.
pub fn loopback_pair() -> (LoopbackEndpoint, LoopbackEndpoint) {
    let a_to_b = Arc::new(Link::new());
    let b_to_a = Arc::new(Link::new());
    let a = LoopbackEndpoint {
        name: "hl",
        tx: Arc::clone(&a_to_b),
        rx: Arc::clone(&b_to_a),
    };
    let b = LoopbackEndpoint {
        name: "rt",
        tx: b_to_a,
        rx: a_to_b,
    };
    (a, b)
}

impl LoopbackEndpoint {
    /// Frames waiting to be received on this end.
    pub fn queued(&self) -> usize {
        self.rx.queue.len()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Channel for LoopbackEndpoint {
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelFault> {
        if self.tx.closed.load(Ordering::Acquire) {
            return Err(ChannelFault::Disconnected);
        }
        let mut frame = Frame::from_slice(frame).map_err(|_| ChannelFault::FrameTooLarge)?;

        let started = Instant::now();
        loop {
            match self.tx.queue.try_send(frame) {
                Ok(()) => return Ok(()),
                Err(embassy_sync::channel::TrySendError::Full(back)) => frame = back,
            }
            if self.tx.closed.load(Ordering::Acquire) {
                return Err(ChannelFault::Disconnected);
            }
            if started.elapsed() >= SEND_BOUND {
                warn!("loopback[{}]: queue full, dropping frame", self.name);
                return Err(ChannelFault::QueueFull);
            }
            std::thread::sleep(POLL);
        }
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, ChannelFault> {
        let started = Instant::now();
        loop {
            if let Ok(frame) = self.rx.queue.try_receive() {
                return Ok(Some(frame));
            }
            if self.rx.closed.load(Ordering::Acquire) {
                return Err(ChannelFault::Disconnected);
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            std::thread::sleep(POLL.min(timeout - elapsed));
        }
    }
}

impl Drop for LoopbackEndpoint {
    fn drop(&mut self) {
        self.tx.closed.store(true, Ordering::Release);
        self.rx.closed.store(true, Ordering::Release);
        debug!("loopback[{}]: closed", self.name);
    }
}
