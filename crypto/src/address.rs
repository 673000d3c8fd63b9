//! SS58 account address codec.
//!
//! Address format: base58(prefix ++ account_id ++ checksum)
//!
//! - prefix: the network format, 1 byte for formats < 64, 2 bytes up to 16383
//! - account_id: the 32-byte public key
//! - checksum: first 2 bytes of Blake2b-512(`SS58PRE` ++ prefix ++ account_id)
//!
//! Base58 alphabet: Bitcoin's (no `0`, `O`, `I`, `l`).

use thiserror::Error;

use crate::hash::blake2b_512_multi;

/// Base58 alphabet (58 chars).
const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Reverse lookup table: ASCII byte → base58 digit (0xFF = invalid).
const BASE58_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE58_ALPHABET;
    let mut i = 0;
    while i < 58 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Checksum domain separator.
const CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
/// Length of an account id.
const ACCOUNT_LEN: usize = 32;
/// Checksum bytes appended to a 32-byte account id.
const CHECKSUM_LEN: usize = 2;
/// Highest format representable with the two-byte prefix.
pub const MAX_FORMAT: u16 = 16_383;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is not valid base58 or hex")]
    InvalidEncoding,

    #[error("decoded address has unexpected length {0}")]
    InvalidLength(usize),

    #[error("address checksum mismatch")]
    InvalidChecksum,

    #[error("address uses a reserved prefix byte")]
    InvalidPrefix,

    #[error("ss58 format {0} is out of range")]
    UnsupportedFormat(u16),
}

/// Encode a byte slice as base58.
fn encode_base58(bytes: &[u8]) -> String {
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();
    // Little-endian base58 digits.
    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len() * 138 / 100 + 1);

    for &byte in &bytes[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut result = String::with_capacity(zeros + digits.len());
    result.extend(std::iter::repeat('1').take(zeros));
    result.extend(digits.iter().rev().map(|&d| BASE58_ALPHABET[d as usize] as char));
    result
}

/// Decode a base58 string. Returns `None` on characters outside the alphabet.
fn decode_base58(s: &str) -> Option<Vec<u8>> {
    let zeros = s.bytes().take_while(|&c| c == b'1').count();
    // Little-endian base256 bytes.
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len());

    for c in s.bytes().skip(zeros) {
        if c >= 128 {
            return None;
        }
        let val = BASE58_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        let mut carry = val as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut result = vec![0u8; zeros];
    result.extend(bytes.iter().rev());
    Some(result)
}

fn prefix_bytes(format: u16) -> Result<Vec<u8>, AddressError> {
    match format {
        0..=63 => Ok(vec![format as u8]),
        64..=MAX_FORMAT => {
            let first = ((format & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
            let second = (format >> 8) as u8 | ((format & 0b0000_0000_0000_0011) << 6) as u8;
            Ok(vec![first, second])
        }
        _ => Err(AddressError::UnsupportedFormat(format)),
    }
}

fn checksum(prefix: &[u8], account: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = blake2b_512_multi(&[CHECKSUM_PREFIX, prefix, account]);
    [hash[0], hash[1]]
}

/// Encode a 32-byte account id as an SS58 address in the given network format.
pub fn encode_address(account: &[u8; 32], format: u16) -> Result<String, AddressError> {
    let prefix = prefix_bytes(format)?;
    let mut payload = Vec::with_capacity(prefix.len() + ACCOUNT_LEN + CHECKSUM_LEN);
    payload.extend_from_slice(&prefix);
    payload.extend_from_slice(account);
    payload.extend_from_slice(&checksum(&prefix, account));
    Ok(encode_base58(&payload))
}

/// Decode an address into its network format and 32-byte account id.
///
/// Accepts SS58 in any format, or a `0x`-prefixed hex account id (reported
/// with format `None`).
pub fn decode_address(address: &str) -> Result<(Option<u16>, [u8; 32]), AddressError> {
    if let Some(hex_digits) = address.strip_prefix("0x") {
        let mut account = [0u8; ACCOUNT_LEN];
        hex::decode_to_slice(hex_digits, &mut account)
            .map_err(|_| AddressError::InvalidEncoding)?;
        return Ok((None, account));
    }

    let data = decode_base58(address).ok_or(AddressError::InvalidEncoding)?;
    let (prefix_len, format) = match data.first() {
        Some(&b0) if b0 < 64 => (1, b0 as u16),
        Some(&b0) if b0 < 128 => {
            let b1 = *data.get(1).ok_or(AddressError::InvalidLength(data.len()))?;
            let lower = (b0 << 2) | (b1 >> 6);
            let upper = b1 & 0b0011_1111;
            (2, lower as u16 | ((upper as u16) << 8))
        }
        Some(_) => return Err(AddressError::InvalidPrefix),
        None => return Err(AddressError::InvalidLength(0)),
    };

    if data.len() != prefix_len + ACCOUNT_LEN + CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(data.len()));
    }

    let (prefix, rest) = data.split_at(prefix_len);
    let (account_bytes, check) = rest.split_at(ACCOUNT_LEN);
    if check != checksum(prefix, account_bytes) {
        return Err(AddressError::InvalidChecksum);
    }

    let mut account = [0u8; ACCOUNT_LEN];
    account.copy_from_slice(account_bytes);
    Ok((Some(format), account))
}

/// Re-encode an address (any SS58 format, or hex) into `format`.
pub fn reencode_address(address: &str, format: u16) -> Result<String, AddressError> {
    let (_, account) = decode_address(address.trim())?;
    encode_address(&account, format)
}
