//! Transport counters and block dumps.
//!
//! Both halves keep a small set of counters that the host binary prints on
//! exit. `hex_dump` renders a block as offset / hex / ASCII rows for
//! `trace`-level logging when `trace_blocks` is enabled.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::protocol::codec::BLOCK_SIZE;

/// Client-side counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub completed: u64,
    pub storage_faults: u64,
    pub timeouts: u64,
    /// Results with no waiting entry, dropped on arrival.
    pub stale_dropped: u64,
    pub malformed_dropped: u64,
    /// Request kinds that arrived at the client.
    pub unexpected_dropped: u64,
}

/// Server-side counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub reads: u64,
    pub writes: u64,
    pub io_failures: u64,
    pub out_of_range: u64,
    pub malformed_dropped: u64,
    /// Result kinds that arrived at the server.
    pub unexpected_dropped: u64,
}

const ROW: usize = 16;

/// Render `data` as 16-byte rows of `offset  hex  |ascii|`. Offsets are
/// absolute on the medium (`block * BLOCK_SIZE + row`).
pub fn hex_dump(block: u32, data: &[u8]) -> String {
    let base = u64::from(block) * BLOCK_SIZE as u64;
    let mut out = String::with_capacity(data.len() * 4 + 64);
    let _ = writeln!(out, "block {block}:");

    for (i, row) in data.chunks(ROW).enumerate() {
        let _ = write!(out, "{:08x} ", base + (i * ROW) as u64);
        for col in 0..ROW {
            match row.get(col) {
                Some(b) => {
                    let _ = write!(out, " {b:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        for &b in row {
            out.push(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            });
        }
        out.push_str("|\n");
    }
    out
}
