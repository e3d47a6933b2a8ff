//! CRC-16/CCITT checksum engine
//!
//! Bit-by-bit CRC over arbitrary byte sequences, MSB first, no input or
//! output reflection and no final XOR. With the default parameters this is
//! the variant whose check value for `"123456789"` is `0x29B1`.
//!
//! Appending the big-endian CRC to the data makes the combined sequence an
//! exact multiple of the generator polynomial, so recomputing the CRC over
//! `data ‖ crc` yields `0x0000` for intact data.

use crate::errors::{LinkError, Result};

/// Generator polynomial for CRC-CCITT
pub const POLY: u16 = 0x1021;

/// Initial register value for CRC-CCITT
pub const INITIAL_VALUE: u16 = 0xFFFF;

/// Parameters of a non-reflected 16-bit CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcParams {
    /// Generator polynomial (implicit x^16 term)
    pub poly: u16,

    /// Register value before the first byte
    pub init: u16,
}

/// CRC-CCITT as used throughout this crate
pub const CRC_CCITT: CrcParams = CrcParams {
    poly: POLY,
    init: INITIAL_VALUE,
};

/// XMODEM flavour: same polynomial, zero initial register
pub const CRC_XMODEM: CrcParams = CrcParams {
    poly: POLY,
    init: 0x0000,
};

/// Checksum engine bound to one parameter set
///
/// Stateless apart from its parameters; a single instance can be shared
/// freely by any layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    params: CrcParams,
}

impl Crc16 {
    /// Create an engine for the given parameters
    pub const fn new(params: CrcParams) -> Self {
        Self { params }
    }

    /// Parameters this engine was built with
    pub fn params(&self) -> CrcParams {
        self.params
    }

    /// Compute the checksum of `data`
    ///
    /// Total over all inputs; the empty slice yields the initial value.
    pub fn checksum(&self, data: &[u8]) -> u16 {
        let mut crc = self.params.init;

        for &byte in data {
            crc ^= (byte as u16) << 8;

            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ self.params.poly
                } else {
                    crc << 1
                };
            }
        }

        crc
    }

    /// Recompute over `data ‖ crc`; zero means `crc` matches `data`
    pub fn check_with_crc(&self, data: &[u8], crc: u16) -> u16 {
        self.checksum(&append_crc(data, crc))
    }

    /// Verify that `crc` is the checksum of `data`
    ///
    /// # Errors
    /// `IntegrityCheckFailed` carrying the supplied and recomputed values.
    pub fn verify(&self, data: &[u8], crc: u16) -> Result<()> {
        if self.check_with_crc(data, crc) == 0 {
            return Ok(());
        }

        Err(LinkError::IntegrityCheckFailed {
            expected: crc,
            actual: self.checksum(data),
        })
    }

    /// Check a buffer that already ends in its two CRC bytes
    pub fn verify_trailer(&self, bytes: &[u8]) -> bool {
        bytes.len() >= 2 && self.checksum(bytes) == 0
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new(CRC_CCITT)
    }
}

/// Compute CRC-CCITT over `data`
pub fn calculate_crc(data: &[u8]) -> u16 {
    Crc16::default().checksum(data)
}

/// Return `data` followed by `crc`, high byte first
pub fn append_crc(data: &[u8], crc: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// CRC-CCITT over `data ‖ crc`; `0x0000` for intact data
pub fn check_with_crc(data: &[u8], crc: u16) -> u16 {
    Crc16::default().check_with_crc(data, crc)
}

/// Verify `crc` against `data` with CRC-CCITT
pub fn verify_crc(data: &[u8], crc: u16) -> Result<()> {
    Crc16::default().verify(data, crc)
}

/// True when `bytes` ends in a valid CRC-CCITT trailer
pub fn verify_trailer(bytes: &[u8]) -> bool {
    Crc16::default().verify_trailer(bytes)
}
