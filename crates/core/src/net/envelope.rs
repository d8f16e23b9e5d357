use serde::{Deserialize, Serialize};

use super::error::ProtocolError;
use crate::codec::{BufferReader, BufferWriter};

/// Largest datagram the transport is expected to carry without fragmentation.
pub const MAX_PAYLOAD_SIZE: usize = 1200;
/// Reliability byte plus the `u64` id.
pub const FRAME_HEADER_SIZE: usize = 1 + 8;
/// Largest datagram accepted from the socket.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Transport-level signal ids, identical in both directions.
pub const ACK_SIGNAL: u16 = 0;
pub const HEARTBEAT_SIGNAL: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Reliability {
    /// Fire and forget, no id. Only used for acks and heartbeats.
    Unreliable = 0,
    /// Newer supersedes older, stale frames are discarded.
    UnreliableSequenced = 1,
    /// Must arrive, delivered as soon as it does.
    Reliable = 2,
    /// Must arrive, delivered in send order.
    ReliableOrdered = 4,
}

impl Reliability {
    pub fn is_reliable(self) -> bool {
        matches!(self, Self::Reliable | Self::ReliableOrdered)
    }

    pub fn has_id(self) -> bool {
        self != Self::Unreliable
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreliable => "unreliable",
            Self::UnreliableSequenced => "unreliable-sequenced",
            Self::Reliable => "reliable",
            Self::ReliableOrdered => "reliable-ordered",
        }
    }
}

impl TryFrom<u8> for Reliability {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unreliable),
            1 => Ok(Self::UnreliableSequenced),
            2 => Ok(Self::Reliable),
            4 => Ok(Self::ReliableOrdered),
            other => Err(ProtocolError::UnknownReliability(other)),
        }
    }
}

/// A decoded datagram: reliability class, sequence id and the signal body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub reliability: Reliability,
    pub id: u64,
    pub body: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn decode(data: &'a [u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }

        let mut reader = BufferReader::new(data);
        let reliability = Reliability::try_from(reader.read::<u8>()?)?;
        let id = if reliability.has_id() {
            reader.read::<u64>()?
        } else {
            0
        };

        Ok(Self {
            reliability,
            id,
            body: reader.rest(),
        })
    }

    pub fn encode(reliability: Reliability, id: u64, body: &[u8]) -> Vec<u8> {
        let mut writer = BufferWriter::with_capacity(FRAME_HEADER_SIZE + body.len());
        writer.write(reliability as u8);
        if reliability.has_id() {
            writer.write(id);
        }
        writer.write_raw(body);
        writer.into_inner()
    }

    pub fn signal(&self) -> Option<u16> {
        peek_signal(self.body)
    }
}

/// Signal id at the start of a body, if present.
pub fn peek_signal(body: &[u8]) -> Option<u16> {
    BufferReader::new(body).read::<u16>().ok()
}

pub fn encode_ack(reliability: Reliability, id: u64) -> Vec<u8> {
    let mut body = BufferWriter::with_capacity(11);
    body.write(ACK_SIGNAL).write(reliability as u8).write(id);
    Frame::encode(Reliability::Unreliable, 0, body.as_bytes())
}

/// Parses the body of an ack signal (after the signal id).
pub fn decode_ack(body: &[u8]) -> Result<(Reliability, u64), ProtocolError> {
    let mut reader = BufferReader::new(body);
    let _signal = reader.read::<u16>()?;
    let reliability = Reliability::try_from(reader.read::<u8>()?)?;
    let id = reader.read::<u64>()?;
    Ok((reliability, id))
}

pub fn encode_heartbeat() -> Vec<u8> {
    Frame::encode(Reliability::Unreliable, 0, &HEARTBEAT_SIGNAL.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreliable_frames_carry_no_id() {
        let data = Frame::encode(Reliability::Unreliable, 99, &[1, 2]);
        assert_eq!(data, vec![0, 1, 2]);

        let frame = Frame::decode(&data).unwrap();
        assert_eq!(frame.id, 0);
        assert_eq!(frame.body, &[1, 2]);
    }

    #[test]
    fn test_sequenced_frame_layout() {
        let data = Frame::encode(Reliability::ReliableOrdered, 3, &[0xAA]);
        assert_eq!(data, vec![4, 3, 0, 0, 0, 0, 0, 0, 0, 0xAA]);

        let frame = Frame::decode(&data).unwrap();
        assert_eq!(frame.reliability, Reliability::ReliableOrdered);
        assert_eq!(frame.id, 3);
    }

    #[test]
    fn test_unknown_reliability_rejected() {
        assert_eq!(
            Frame::decode(&[3, 0]),
            Err(ProtocolError::UnknownReliability(3))
        );
        assert_eq!(Frame::decode(&[]), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_truncated_id_rejected() {
        assert!(matches!(
            Frame::decode(&[2, 1, 0]),
            Err(ProtocolError::Codec(_))
        ));
    }

    #[test]
    fn test_ack_layout() {
        let data = encode_ack(Reliability::Reliable, 42);
        let frame = Frame::decode(&data).unwrap();

        assert_eq!(frame.reliability, Reliability::Unreliable);
        assert_eq!(frame.signal(), Some(ACK_SIGNAL));
        assert_eq!(decode_ack(frame.body), Ok((Reliability::Reliable, 42)));
    }
}
