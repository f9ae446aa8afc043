//! # Core Primitives
//!
//! Fixed-width identifiers used by every crate in the workspace.
//!
//! - `Address`: 20-byte signer/recipient account
//! - `Hash`: 32-byte identifier handed back by the broadcast layer
//! - `U256`: exact integer for values and gas (never floating point)

use crate::errors::ParseError;
use uuid::Uuid;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 20-byte account address.
///
/// Hex input is case-insensitive, so two spellings of the same signer always
/// map to the same key.
pub type Address = [u8; 20];

/// A 32-byte identifier (transaction hash as reported by the adapter).
pub type Hash = [u8; 32];

/// Numeric chain identifier (EIP-155 style).
pub type ChainId = u64;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Identifier of a submission record.
pub type RecordId = Uuid;

/// Parses a hex address, with or without a `0x` prefix, in any letter case.
pub fn parse_address(input: &str) -> Result<Address, ParseError> {
    let bytes = decode_hex(input)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| ParseError::InvalidLength {
            expected: 20,
            actual: b.len(),
        })
}

/// Parses a 32-byte hex hash, with or without a `0x` prefix.
pub fn parse_hash(input: &str) -> Result<Hash, ParseError> {
    let bytes = decode_hex(input)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| ParseError::InvalidLength {
            expected: 32,
            actual: b.len(),
        })
}

/// Lower-case `0x`-prefixed rendering of an address.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Lower-case `0x`-prefixed rendering of a hash.
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

fn decode_hex(input: &str) -> Result<Vec<u8>, ParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))
}
