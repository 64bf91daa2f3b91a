//! Inter-core block transport.
//!
//! Carries 512-byte block reads and writes between the high-level core,
//! which hosts the filesystem, and the real-time core, which owns the SD
//! card.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Block Transport Stack                     │
//! │                                                              │
//! │  high-level core                         real-time core      │
//! │  ┌─────────────┐                         ┌─────────────┐     │
//! │  │ BlockClient │                         │ BlockServer │     │
//! │  │ + Pending   │                         │             │     │
//! │  └─────┬───────┘                         └──────┬──────┘     │
//! │        │ ▲                                      │ ▲          │
//! │        ▼ │           ┌──────────┐               ▼ │          │
//! │  ┌───────────┐       │ Channel  │         ┌───────────┐      │
//! │  │   Codec   │──────▶│ (trait)  │────────▶│   Codec   │      │
//! │  └───────────┘◀──────│          │◀────────└───────────┘      │
//! │                      └──────────┘               │            │
//! │                                          ┌──────▼──────┐     │
//! │                                          │ BlockDevice │     │
//! │                                          └─────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channel;
pub mod client;
pub mod codec;
pub mod pending;
pub mod server;
