//! Transmission units exchanged over the simulated link
//!
//! Frames and acknowledgments live in memory; the channel only decides
//! whether a unit arrives. A frame can additionally be flattened into a
//! self-checking byte form so the receiver peer can verify integrity with
//! the CRC engine.
//!
//! # Encoded frame layout
//! - sequence bit: 1 byte (0 or 1)
//! - payload: N bytes
//! - CRC-CCITT over the two fields above: 2 bytes, high byte first
use std::fmt;

use crate::checksum::{append_crc, calculate_crc, verify_trailer};
use crate::errors::{LinkError, Result};

/// Bytes an encoded frame carries besides its payload
pub const FRAME_OVERHEAD: usize = 3;

/// One-bit sequence number of Stop-and-Wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceBit {
    #[default]
    Zero,
    One,
}

impl SequenceBit {
    /// The other bit
    pub fn flipped(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    /// Bit used for the `k`-th delivered message (0-indexed)
    pub fn for_message(k: u64) -> Self {
        if k % 2 == 0 {
            Self::Zero
        } else {
            Self::One
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl TryFrom<u8> for SequenceBit {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            other => Err(LinkError::MalformedFrame(format!(
                "sequence byte must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SequenceBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Frame - one message on its way from sender to receiver
///
/// Immutable once built; a retransmission sends the same frame again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence_bit: SequenceBit,
    payload: Vec<u8>,
}

impl Frame {
    pub fn new(sequence_bit: SequenceBit, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence_bit,
            payload: payload.into(),
        }
    }

    pub fn sequence_bit(&self) -> SequenceBit {
        self.sequence_bit
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledgment a receiver sends back for this frame
    pub fn acknowledgment(&self) -> Acknowledgment {
        Acknowledgment::new(self.sequence_bit)
    }

    /// Flatten into `seq ‖ payload ‖ crc_hi ‖ crc_lo`
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.payload.len() + 1);
        body.push(self.sequence_bit.as_u8());
        body.extend_from_slice(&self.payload);

        let crc = calculate_crc(&body);
        append_crc(&body, crc)
    }

    /// Parse and integrity-check an encoded frame
    ///
    /// # Errors
    /// - `MalformedFrame` if shorter than the header plus trailer, or the
    ///   sequence byte is not 0/1
    /// - `IntegrityCheckFailed` if the CRC trailer does not match
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_OVERHEAD {
            return Err(LinkError::MalformedFrame(format!(
                "need at least {} bytes, got {}",
                FRAME_OVERHEAD,
                bytes.len()
            )));
        }

        if !verify_trailer(bytes) {
            let body_end = bytes.len() - 2;
            return Err(LinkError::IntegrityCheckFailed {
                expected: u16::from_be_bytes([bytes[body_end], bytes[body_end + 1]]),
                actual: calculate_crc(&bytes[..body_end]),
            });
        }

        let sequence_bit = SequenceBit::try_from(bytes[0])?;
        Ok(Self::new(sequence_bit, &bytes[1..bytes.len() - 2]))
    }
}

/// Acknowledgment - confirms receipt of the frame with the same bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgment {
    sequence_bit: SequenceBit,
}

impl Acknowledgment {
    pub fn new(sequence_bit: SequenceBit) -> Self {
        Self { sequence_bit }
    }

    pub fn sequence_bit(&self) -> SequenceBit {
        self.sequence_bit
    }

    /// Whether this acknowledges `frame`
    pub fn acknowledges(&self, frame: &Frame) -> bool {
        self.sequence_bit == frame.sequence_bit()
    }
}

/// Anything the channel can carry
#[derive(Debug, Clone, Copy)]
pub enum Unit<'a> {
    Frame(&'a Frame),
    Ack(&'a Acknowledgment),
}

impl Unit<'_> {
    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Frame(_) => "frame",
            Self::Ack(_) => "ACK",
        }
    }

    pub fn sequence_bit(&self) -> SequenceBit {
        match self {
            Self::Frame(frame) => frame.sequence_bit(),
            Self::Ack(ack) => ack.sequence_bit(),
        }
    }
}
