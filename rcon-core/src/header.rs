//! Fixed 12-byte prefix of every RCON frame.
//!
//! ```text
//! length      i32 LE  (byte count of everything after this field)
//! request_id  i32 LE
//! type        i32 LE
//! ```

use crate::error::RconError;

pub type FrameHeaderBytes = [u8; HEADER_LENGTH];

/// Size of the `length` field alone.
pub const LENGTH_FIELD: usize = 4;
/// Size of `length` + `request_id` + `type`.
pub const HEADER_LENGTH: usize = 12;
/// Two NUL bytes close every frame.
pub const TERMINATOR: [u8; 2] = [0, 0];
/// Smallest legal `length`: request id, type and terminator with an empty payload.
pub const MIN_FRAME_LENGTH: i32 = 4 + 4 + TERMINATOR.len() as i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    length: i32,
    request_id: i32,
    kind: i32,
}

impl FrameHeader {
    /// Header for a frame carrying `payload_len` payload bytes.
    pub fn new(request_id: i32, kind: i32, payload_len: usize) -> Self {
        Self {
            length: MIN_FRAME_LENGTH + payload_len as i32,
            request_id,
            kind,
        }
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut header: FrameHeaderBytes = [0; HEADER_LENGTH];
        header[0..4].copy_from_slice(&self.length.to_le_bytes());
        header[4..8].copy_from_slice(&self.request_id.to_le_bytes());
        header[8..12].copy_from_slice(&self.kind.to_le_bytes());
        header
    }

    /// Parse a header, checking only that `length` is large enough.
    pub fn from_bytes(bytes: FrameHeaderBytes) -> Result<Self, RconError> {
        let length = read_i32(&bytes[0..4]);
        if length < MIN_FRAME_LENGTH {
            return Err(RconError::InvalidLength(length));
        }
        Ok(Self {
            length,
            request_id: read_i32(&bytes[4..8]),
            kind: read_i32(&bytes[8..12]),
        })
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    pub fn kind(&self) -> i32 {
        self.kind
    }

    /// Payload bytes implied by `length`.
    pub fn payload_length(&self) -> usize {
        (self.length - MIN_FRAME_LENGTH) as usize
    }
}

/// Little-endian `i32` from exactly four bytes.
pub(crate) fn read_i32(bytes: &[u8]) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(raw)
}
