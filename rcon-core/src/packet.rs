//! A single RCON frame and its pure encode/decode.
//!
//! ```text
//! length      i32 LE   = 4 + 4 + len(payload) + 2
//! request_id  i32 LE
//! type        i32 LE
//! payload     UTF-8, no embedded NUL
//! terminator  0x00 0x00
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::RconError;
use crate::header::{self, FrameHeader, FrameHeaderBytes, LENGTH_FIELD, MIN_FRAME_LENGTH};
use crate::message::{AUTH_RESPONSE, PacketType};

/// Largest outbound payload. Servers refuse request frames above 4096 bytes.
pub const MAX_PAYLOAD_SIZE: usize = 4096 - MIN_FRAME_LENGTH as usize;

/// Largest inbound `length` the decoder accepts. Replies (player lists,
/// log dumps) can be far larger than requests.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    request_id: i32,
    kind: i32,
    payload: String,
}

impl Packet {
    /// Build an outbound packet, rejecting payloads the wire cannot carry.
    pub fn new(
        request_id: i32,
        kind: PacketType,
        payload: impl Into<String>,
    ) -> Result<Self, RconError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RconError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if payload.contains('\0') {
            return Err(RconError::Encoding(
                "payload contains an embedded NUL byte".into(),
            ));
        }
        Ok(Self {
            request_id,
            kind: kind.code(),
            payload,
        })
    }

    pub fn auth(request_id: i32, password: &str) -> Result<Self, RconError> {
        Self::new(request_id, PacketType::Auth, password)
    }

    pub fn command(request_id: i32, command: &str) -> Result<Self, RconError> {
        Self::new(request_id, PacketType::ExecCommand, command)
    }

    /// Server-side reply to a command. Not bound by the request size limit.
    pub fn reply(request_id: i32, payload: impl Into<String>) -> Self {
        Self {
            request_id,
            kind: PacketType::ResponseValue.code(),
            payload: payload.into(),
        }
    }

    /// Server-side reply to an auth packet; `request_id` is -1 on rejection.
    pub fn auth_reply(request_id: i32) -> Self {
        Self {
            request_id,
            kind: AUTH_RESPONSE,
            payload: String::new(),
        }
    }

    /// Encode `(request_id, type, payload)` straight to wire bytes.
    pub fn encode(request_id: i32, kind: PacketType, payload: &str) -> Result<Vec<u8>, RconError> {
        Ok(Self::new(request_id, kind, payload)?.to_bytes())
    }

    /// Decode a frame from its 4-byte length prefix and the bytes that follow.
    ///
    /// `body` must hold at least the declared length; anything shorter means
    /// the stream closed mid-frame. Invalid UTF-8 in the payload is replaced,
    /// never rejected: server log output is not guaranteed to be clean.
    pub fn decode(length_prefix: [u8; LENGTH_FIELD], body: &[u8]) -> Result<Self, RconError> {
        let length = i32::from_le_bytes(length_prefix);
        if length < MIN_FRAME_LENGTH {
            return Err(RconError::InvalidLength(length));
        }
        let length = length as usize;
        if length > MAX_FRAME_SIZE {
            return Err(RconError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }
        if body.len() < length {
            return Err(RconError::Framing {
                expected: length,
                actual: body.len(),
            });
        }

        let request_id = header::read_i32(&body[0..4]);
        let kind = header::read_i32(&body[4..8]);
        let mut text = &body[8..length - 2];
        // Some servers pad replies with extra NULs.
        while let [rest @ .., 0] = text {
            text = rest;
        }

        Ok(Self {
            request_id,
            kind,
            payload: String::from_utf8_lossy(text).into_owned(),
        })
    }

    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    /// Raw type code as sent by the peer.
    pub fn kind(&self) -> i32 {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader::new(self.request_id, self.kind, self.payload.len())
    }

    /// Total bytes this packet occupies on the wire.
    pub fn wire_len(&self) -> usize {
        LENGTH_FIELD + self.header().length() as usize
    }

    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        let header: FrameHeaderBytes = self.header().to_bytes();
        dst.put_slice(&header);
        dst.put_slice(self.payload.as_bytes());
        dst.put_slice(&header::TERMINATOR);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.write_to(&mut buf);
        buf.to_vec()
    }
}
