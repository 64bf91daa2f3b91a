//! Client-side pending-request table.
//!
//! Maps each in-flight block address to a one-shot completion handle. The
//! dispatch path signals the handle when a matching result arrives; the
//! waiting caller takes the completion and the entry is destroyed.
//!
//! ```text
//!  submit ──▶ register(block) ──▶ [ block → Signal ] ◀── deliver(result)
//!                                        │
//!  wait   ◀────────── take(block) ◀──────┘
//! ```
//!
//! One entry per address: results are matched purely by block number and
//! operation, so two requests for the same address could not be told apart.

use core::time::Duration;
use std::time::Instant;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use heapless::FnvIndexMap;

use crate::error::RequestError;

use super::codec::{Block, Message};

/// Upper bound on concurrently outstanding block addresses.
pub const MAX_IN_FLIGHT: usize = 8;

/// Which operation an entry is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Outcome delivered to a waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Read finished; the block contents.
    Read(Block),
    /// Write finished successfully.
    Written,
    /// The real-time core reported a negative result code.
    Failed(i32),
}

/// What the table did with an incoming result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Matched a waiting entry and signalled it.
    Completed,
    /// No entry waiting for this result; the caller should drop it.
    Stale,
}

struct PendingEntry {
    op: Operation,
    issued_at: Instant,
    done: Signal<NoopRawMutex, Completion>,
}

/// Address-keyed table of outstanding requests. Owned by the client alone.
pub struct PendingTable {
    entries: FnvIndexMap<u32, PendingEntry, MAX_IN_FLIGHT>,
    limit: usize,
}

impl PendingTable {
    /// Create a table admitting at most `limit` entries (clamped to
    /// `1..=MAX_IN_FLIGHT`).
    pub fn new(limit: usize) -> Self {
        Self {
            entries: FnvIndexMap::new(),
            limit: limit.clamp(1, MAX_IN_FLIGHT),
        }
    }

    /// Track a new request for `block`.
    pub fn register(
        &mut self,
        block: u32,
        op: Operation,
        now: Instant,
    ) -> Result<(), RequestError> {
        if self.entries.contains_key(&block) {
            return Err(RequestError::AddressBusy { block });
        }
        if self.entries.len() >= self.limit {
            return Err(RequestError::TableFull);
        }

        let entry = PendingEntry {
            op,
            issued_at: now,
            done: Signal::new(),
        };
        self.entries
            .insert(block, entry)
            .map_err(|_| RequestError::TableFull)?;
        Ok(())
    }

    /// Match a result message against the table and signal its waiter.
    ///
    /// Requests, results for unknown addresses, results for the other
    /// operation, and duplicates of an already signalled entry are all
    /// [`Delivery::Stale`].
    pub fn deliver(&self, msg: &Message) -> Delivery {
        let (op, completion) = match msg {
            Message::ReadResult { data, .. } => (Operation::Read, Completion::Read(*data)),
            Message::ReadFailed { result, .. } => (Operation::Read, Completion::Failed(*result)),
            Message::WriteResult { result, .. } if *result < 0 => {
                (Operation::Write, Completion::Failed(*result))
            }
            Message::WriteResult { .. } => (Operation::Write, Completion::Written),
            Message::WriteRequest { .. } | Message::ReadRequest { .. } => return Delivery::Stale,
        };

        match self.entries.get(&msg.block()) {
            Some(entry) if entry.op == op && !entry.done.signaled() => {
                entry.done.signal(completion);
                Delivery::Completed
            }
            _ => Delivery::Stale,
        }
    }

    /// Take the completion for `block` if it has been signalled, removing
    /// the entry.
    pub fn take(&mut self, block: u32) -> Option<(Operation, Completion)> {
        let entry = self.entries.get(&block)?;
        let completion = entry.done.try_take()?;
        let op = entry.op;
        self.entries.remove(&block);
        Some((op, completion))
    }

    /// When the request for `block` was registered.
    pub fn issued_at(&self, block: u32) -> Option<Instant> {
        self.entries.get(&block).map(|e| e.issued_at)
    }

    /// Drop the entry for `block`. A result arriving later is stale.
    pub fn cancel(&mut self, block: u32) -> bool {
        self.entries.remove(&block).is_some()
    }

    /// Drop every entry issued `timeout` or more before `now`, returning
    /// the evicted addresses. Results arriving for them later are stale.
    pub fn evict_expired(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> heapless::Vec<u32, MAX_IN_FLIGHT> {
        let mut expired = heapless::Vec::new();
        for (&block, entry) in &self.entries {
            if now.saturating_duration_since(entry.issued_at) >= timeout {
                // At most MAX_IN_FLIGHT entries exist.
                let _ = expired.push(block);
            }
        }
        for block in &expired {
            self.entries.remove(block);
        }
        expired
    }

    pub fn contains(&self, block: u32) -> bool {
        self.entries.contains_key(&block)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
