use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::RconError;
use crate::header::{LENGTH_FIELD, MIN_FRAME_LENGTH};
use crate::packet::{MAX_FRAME_SIZE, Packet};

/// Length-prefixed RCON framing for `tokio_util::codec::Framed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RconCodec {}

impl RconCodec {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for RconCodec {
    type Item = Packet;
    type Error = RconError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_FIELD];
        prefix.copy_from_slice(&src[..LENGTH_FIELD]);
        let length = i32::from_le_bytes(prefix);
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

        let frame_len = LENGTH_FIELD + length;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Packet::decode(prefix, &frame[LENGTH_FIELD..]).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(packet) = self.decode(buf)? {
            return Ok(Some(packet));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        // The peer closed mid-frame.
        let expected = if buf.len() >= LENGTH_FIELD {
            let mut prefix = [0u8; LENGTH_FIELD];
            prefix.copy_from_slice(&buf[..LENGTH_FIELD]);
            LENGTH_FIELD + i32::from_le_bytes(prefix) as usize
        } else {
            LENGTH_FIELD
        };
        let actual = buf.len();
        buf.clear();
        Err(RconError::Framing { expected, actual })
    }
}

impl Encoder<Packet> for RconCodec {
    type Error = RconError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}
