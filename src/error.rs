//! Unified error types for the block bridge.
//!
//! A single `Error` enum that every subsystem converts into, so the client,
//! the server and the block-device adapters all report failures the same
//! way. All variants are `Copy` so they travel through the pending table
//! and diagnostics without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level bridge error
// ---------------------------------------------------------------------------

/// Every fallible bridge operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A received frame could not be decoded.
    Malformed(MalformedMessage),
    /// The real-time core reported a storage failure for a block.
    Storage(StorageFault),
    /// No matching result arrived within the response timeout.
    Timeout { block: u32 },
    /// The inter-core channel itself failed.
    Channel(ChannelFault),
    /// The caller misused the client API.
    Request(RequestError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed message: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Timeout { block } => write!(f, "timed out waiting for block {block}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Request(e) => write!(f, "request: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Why a received buffer was rejected by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedMessage {
    /// Zero-length buffer; there is no kind tag to inspect.
    Empty,
    /// The first byte is not one of the four message kinds.
    UnknownKind(u8),
    /// The buffer is shorter than the shape its tag requires.
    Truncated { kind: u8, len: usize, needed: usize },
}

impl fmt::Display for MalformedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty frame"),
            Self::UnknownKind(tag) => write!(f, "unknown kind tag 0x{tag:02x}"),
            Self::Truncated { kind, len, needed } => {
                write!(f, "kind {kind} frame is {len} bytes, needs {needed}")
            }
        }
    }
}

impl From<MalformedMessage> for Error {
    fn from(e: MalformedMessage) -> Self {
        Self::Malformed(e)
    }
}

// ---------------------------------------------------------------------------
// Storage faults
// ---------------------------------------------------------------------------

/// A negative result code returned by the real-time core.
///
/// The code is forwarded verbatim from the wire; only its sign carries
/// meaning on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageFault {
    pub block: u32,
    pub code: i32,
}

impl fmt::Display for StorageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} failed with code {}", self.block, self.code)
    }
}

impl From<StorageFault> for Error {
    fn from(e: StorageFault) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Channel faults
// ---------------------------------------------------------------------------

/// Failures of the underlying inter-core transport. Fatal to the caller:
/// the protocol has no retry of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFault {
    /// The peer endpoint is gone.
    Disconnected,
    /// The outbound queue stayed full past the send bound.
    QueueFull,
    /// The frame does not fit the transport's message size.
    FrameTooLarge,
    /// Any other transport-level failure.
    Transport,
}

impl fmt::Display for ChannelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "peer disconnected"),
            Self::QueueFull => write!(f, "outbound queue full"),
            Self::FrameTooLarge => write!(f, "frame too large"),
            Self::Transport => write!(f, "transport failure"),
        }
    }
}

impl From<ChannelFault> for Error {
    fn from(e: ChannelFault) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Caller misuse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// A request for this block address is already in flight.
    AddressBusy { block: u32 },
    /// The pending-request table has no free slot.
    TableFull,
    /// Block payloads must be exactly one block long.
    BadLength { len: usize },
    /// `wait` was called for an address with no pending request.
    NotPending { block: u32 },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressBusy { block } => write!(f, "block {block} already in flight"),
            Self::TableFull => write!(f, "pending-request table full"),
            Self::BadLength { len } => write!(f, "payload is {len} bytes, expected one block"),
            Self::NotPending { block } => write!(f, "no request pending for block {block}"),
        }
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation. Names the field and the rule.
    ValidationFailed(&'static str),
    /// The config file could not be read.
    Io,
    /// The config file is not valid JSON for [`BridgeConfig`](crate::config::BridgeConfig).
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Io => write!(f, "config file unreadable"),
            Self::Parse => write!(f, "config file unparseable"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Medium errors
// ---------------------------------------------------------------------------

/// Errors from the bundled [`BlockDevice`](crate::ports::BlockDevice)
/// adapters. The server reports any of them as an I/O result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// Address at or beyond the medium's block count.
    OutOfRange { block: u32 },
    /// Injected or hardware-reported block failure.
    Fault { block: u32 },
    /// Host I/O failure on a disk image.
    Io(std::io::ErrorKind),
    /// Disk image length is not a whole number of blocks.
    ShortImage { len: u64 },
    /// Requested RAM medium exceeds the host allocation cap.
    TooLarge { blocks: u32 },
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { block } => write!(f, "block {block} out of range"),
            Self::Fault { block } => write!(f, "block {block} faulted"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::ShortImage { len } => write!(f, "image length {len} is not whole blocks"),
            Self::TooLarge { blocks } => write!(f, "{blocks} blocks exceeds the RAM disk cap"),
        }
    }
}

impl std::error::Error for DiskError {}

impl From<std::io::Error> for DiskError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
