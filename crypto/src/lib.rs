//! Address primitives for vestdrop.
//!
//! - **SS58** decoding and encoding of 32-byte account ids
//! - **Blake2b-512** checksums (`SS58PRE` domain)
//! - Re-encoding an address from one network format into another

pub mod address;
pub mod hash;

pub use address::{decode_address, encode_address, reencode_address, AddressError, MAX_FORMAT};
pub use hash::blake2b_512_multi;
