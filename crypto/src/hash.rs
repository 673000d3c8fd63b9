//! Blake2b hashing used by the SS58 checksum.

use blake2::{Blake2b512, Digest};

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_512_multi(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_input_matches_whole_input() {
        assert_eq!(
            blake2b_512_multi(&[b"SS58", b"PRE"]),
            blake2b_512_multi(&[b"SS58PRE"])
        );
    }
}
