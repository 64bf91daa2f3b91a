//! Channel abstraction — the inter-core message transport.
//!
//! Concrete implementations:
//! - the inter-core socket between the two cores (platform specific)
//! - [`LoopbackEndpoint`](crate::adapters::loopback::LoopbackEndpoint)
//!   for running both halves in one host process
//!
//! The client and server are generic over `Channel`, so a new transport
//! needs zero changes to the protocol logic. Implementations must deliver
//! whole messages, in order, without loss or duplication.

use core::time::Duration;

use crate::error::ChannelFault;

use super::codec::Frame;

/// Duplex, message-oriented, reliable-order transport.
pub trait Channel {
    /// Send one message.
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelFault>;

    /// Block until one message arrives or `timeout` elapses.
    /// Returns `Ok(None)` if nothing arrived in time.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, ChannelFault>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, frame: &[u8]) -> Result<(), ChannelFault> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, ChannelFault> {
        (**self).receive(timeout)
    }
}

/// A null channel that discards all sends and never delivers.
/// Useful when the peer core is absent; every request times out.
pub struct NullChannel;

impl Channel for NullChannel {
    fn send(&mut self, _frame: &[u8]) -> Result<(), ChannelFault> {
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, ChannelFault> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}
