//! Deterministic byte serialization for hash preimages.

/// Fixed-width big-endian encoding of a signed 64-bit integer. The result
/// never depends on host byte order.
pub fn encode_i64(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Order-preserving concatenation with no delimiter. Safe only because every
/// integer part is fixed-width; callers must keep the exact field order used
/// by `ProofOfWork::prepare_data`.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_big_endian() {
        assert_eq!(encode_i64(0), [0u8; 8]);
        assert_eq!(encode_i64(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encode_i64(0x0102_0304_0506_0708), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(encode_i64(-1), [0xff; 8]);
    }

    #[test]
    fn concat_preserves_order_without_delimiters() {
        let joined = concat(&[b"ab", b"", b"cd", &encode_i64(5)]);
        assert_eq!(joined, b"abcd\x00\x00\x00\x00\x00\x00\x00\x05".to_vec());
    }
}
