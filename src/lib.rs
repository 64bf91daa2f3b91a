//! SD-card block bridge library.
//!
//! Both halves of the inter-core block transport, the ports they plug
//! into and the host-side adapters. The binary wires them together over a
//! loopback; tests and fuzzing use the same public surface.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ports;
pub mod protocol;
