//! Fixed-layout message codec.
//!
//! Wire format (all integers little-endian):
//! ```text
//! status shape (9 B)
//! ┌──────┬─────────────┬─────────────┐
//! │ Kind │ Block (u32) │ Result (i32)│
//! │ 1B   │ 4B          │ 4B          │
//! └──────┴─────────────┴─────────────┘
//!
//! data shape (517 B)
//! ┌──────┬─────────────┬──────────────────────┐
//! │ Kind │ Block (u32) │ Block payload (512B) │
//! │ 1B   │ 4B          │ 512B                 │
//! └──────┴─────────────┴──────────────────────┘
//! ```
//!
//! There is no length prefix: the channel preserves message boundaries and
//! the kind tag fixes the shape. The one exception is `BlockReadResult`,
//! which the real-time core sends in the status shape when the physical
//! read failed; the two shapes are told apart by frame length.

use heapless::Vec;

use crate::error::MalformedMessage;

/// Size of one storage block and of every block payload on the wire.
pub const BLOCK_SIZE: usize = 512;

/// Kind tag + block number.
const HEADER_LEN: usize = 1 + 4;

/// Frame length of messages carrying a result code.
pub const STATUS_FRAME_LEN: usize = HEADER_LEN + 4;

/// Frame length of messages carrying a block payload.
pub const DATA_FRAME_LEN: usize = HEADER_LEN + BLOCK_SIZE;

/// Largest frame the protocol ever produces.
pub const MAX_FRAME_LEN: usize = DATA_FRAME_LEN;

/// Operation succeeded.
pub const RESULT_OK: i32 = 0;

/// The physical medium reported an I/O failure.
pub const RESULT_IO_ERROR: i32 = -1;

/// The block address is at or beyond the medium's capacity.
pub const RESULT_OUT_OF_RANGE: i32 = -2;

/// One block's worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

/// An encoded message, ready for the channel.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Kind tag carried in byte 0 of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    BlockWriteRequest = 1,
    BlockReadRequest = 2,
    BlockReadResult = 3,
    BlockWriteResult = 4,
}

impl MessageKind {
    /// Parse a kind from its wire tag.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::BlockWriteRequest),
            2 => Some(Self::BlockReadRequest),
            3 => Some(Self::BlockReadResult),
            4 => Some(Self::BlockWriteResult),
            _ => None,
        }
    }

    /// Wire tag for this kind.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Returns true for the kinds the high-level core sends.
    pub fn is_request(self) -> bool {
        matches!(self, Self::BlockWriteRequest | Self::BlockReadRequest)
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Write `data` to `block`.
    WriteRequest { block: u32, data: Block },
    /// Read `block`.
    ReadRequest { block: u32 },
    /// `block` was read successfully.
    ReadResult { block: u32, data: Block },
    /// Reading `block` failed; `result` is negative.
    ReadFailed { block: u32, result: i32 },
    /// Outcome of a write to `block`.
    WriteResult { block: u32, result: i32 },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::WriteRequest { .. } => MessageKind::BlockWriteRequest,
            Self::ReadRequest { .. } => MessageKind::BlockReadRequest,
            Self::ReadResult { .. } | Self::ReadFailed { .. } => MessageKind::BlockReadResult,
            Self::WriteResult { .. } => MessageKind::BlockWriteResult,
        }
    }

    /// Block address this message refers to.
    pub fn block(&self) -> u32 {
        match self {
            Self::WriteRequest { block, .. }
            | Self::ReadRequest { block }
            | Self::ReadResult { block, .. }
            | Self::ReadFailed { block, .. }
            | Self::WriteResult { block, .. } => *block,
        }
    }

    /// Encoded length of this message.
    pub fn frame_len(&self) -> usize {
        match self {
            Self::WriteRequest { .. } | Self::ReadResult { .. } => DATA_FRAME_LEN,
            Self::ReadRequest { .. } | Self::ReadFailed { .. } | Self::WriteResult { .. } => {
                STATUS_FRAME_LEN
            }
        }
    }

    /// Encode into `out`, returning the number of bytes written, or `None`
    /// if `out` is too small.
    pub fn encode_into(&self, out: &mut [u8]) -> Option<usize> {
        let len = self.frame_len();
        if out.len() < len {
            return None;
        }

        out[0] = self.kind().to_byte();
        out[1..HEADER_LEN].copy_from_slice(&self.block().to_le_bytes());

        match self {
            Self::WriteRequest { data, .. } | Self::ReadResult { data, .. } => {
                out[HEADER_LEN..len].copy_from_slice(data);
            }
            // The result word of a read request is unused; always sent as zero.
            Self::ReadRequest { .. } => {
                out[HEADER_LEN..len].copy_from_slice(&RESULT_OK.to_le_bytes());
            }
            Self::ReadFailed { result, .. } | Self::WriteResult { result, .. } => {
                out[HEADER_LEN..len].copy_from_slice(&result.to_le_bytes());
            }
        }

        Some(len)
    }

    /// Encode into an owned frame.
    pub fn encode(&self) -> Frame {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = self.encode_into(&mut buf).unwrap_or(0);
        let mut frame = Frame::new();
        // Every shape fits MAX_FRAME_LEN.
        let _ = frame.extend_from_slice(&buf[..len]);
        frame
    }
}

/// Decode one frame.
///
/// Trailing bytes beyond the shape implied by the tag are ignored. Pure:
/// nothing outside the returned value is touched.
pub fn decode(bytes: &[u8]) -> Result<Message, MalformedMessage> {
    let tag = *bytes.first().ok_or(MalformedMessage::Empty)?;
    let kind = MessageKind::from_byte(tag).ok_or(MalformedMessage::UnknownKind(tag))?;

    let needed = match kind {
        MessageKind::BlockWriteRequest => DATA_FRAME_LEN,
        MessageKind::BlockReadRequest | MessageKind::BlockWriteResult => STATUS_FRAME_LEN,
        MessageKind::BlockReadResult if bytes.len() == STATUS_FRAME_LEN => STATUS_FRAME_LEN,
        MessageKind::BlockReadResult => DATA_FRAME_LEN,
    };
    if bytes.len() < needed {
        return Err(MalformedMessage::Truncated {
            kind: tag,
            len: bytes.len(),
            needed,
        });
    }

    let block = read_u32(&bytes[1..HEADER_LEN]);
    let body = &bytes[HEADER_LEN..needed];

    let msg = match kind {
        MessageKind::BlockWriteRequest => Message::WriteRequest {
            block,
            data: read_block(body),
        },
        MessageKind::BlockReadRequest => Message::ReadRequest { block },
        MessageKind::BlockReadResult if needed == STATUS_FRAME_LEN => Message::ReadFailed {
            block,
            result: read_i32(body),
        },
        MessageKind::BlockReadResult => Message::ReadResult {
            block,
            data: read_block(body),
        },
        MessageKind::BlockWriteResult => Message::WriteResult {
            block,
            result: read_i32(body),
        },
    };
    Ok(msg)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(word)
}

fn read_block(bytes: &[u8]) -> Block {
    let mut data = [0u8; BLOCK_SIZE];
    data.copy_from_slice(&bytes[..BLOCK_SIZE]);
    data
}
