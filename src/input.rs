//! Input parsing for the command-line front end
//!
//! Rejected input is reported as an error and never reaches the checksum
//! engine or the protocol.
use crate::errors::{LinkError, Result};

/// Convert a string of `0`/`1` characters to bytes
///
/// The bit string is left-padded with zeros to a whole number of bytes, so
/// `"101"` becomes `[0b0000_0101]`.
///
/// # Errors
/// `InvalidBinaryString` if the input is empty or contains any other character.
pub fn binary_string_to_bytes(bits: &str) -> Result<Vec<u8>> {
    if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(LinkError::InvalidBinaryString(bits.to_string()));
    }

    let pad = (8 - bits.len() % 8) % 8;
    let padded: Vec<u8> = std::iter::repeat(b'0')
        .take(pad)
        .chain(bits.bytes())
        .collect();

    Ok(padded
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit - b'0')))
        .collect())
}

/// Parse a 16-bit CRC written in hex, with or without a `0x` prefix
///
/// # Errors
/// `InvalidCrcHex` if the text is not hex or does not fit in 16 bits.
pub fn parse_crc_hex(text: &str) -> Result<u16> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u16::from_str_radix(digits, 16).map_err(|_| LinkError::InvalidCrcHex(text.to_string()))
}
