//! Unpadded URL-safe base64 encoding for blob payloads.

/// URL-safe base64 alphabet (`A-Z a-z 0-9 - _`), no padding character.
const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Number of base64 characters produced for `len` payload bytes.
pub const fn encoded_len(len: usize) -> usize {
    (len * 4).div_ceil(3)
}

/// Encodes `data` as unpadded base64url, emitting one ASCII byte at a time.
///
/// Streaming by callback keeps the encoder allocation-free so callers can
/// chunk output into a bounded transmit buffer.
pub fn encode_into<F: FnMut(u8)>(data: &[u8], mut emit: F) {
    for chunk in data.chunks(3) {
        let mut val = 0u32;
        for &b in chunk {
            val = (val << 8) | b as u32;
        }
        val <<= (3 - chunk.len()) * 8;

        let out_chars = chunk.len() + 1;
        emit(TABLE[(val >> 18) as usize & 0x3F]);
        emit(TABLE[(val >> 12) as usize & 0x3F]);
        if out_chars > 2 {
            emit(TABLE[(val >> 6) as usize & 0x3F]);
        }
        if out_chars > 3 {
            emit(TABLE[val as usize & 0x3F]);
        }
    }
}

/// Encodes `data` into an owned `String`.
#[cfg(feature = "std")]
pub fn encode_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(data.len()));
    encode_into(data, |b| out.push(b as char));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_vector() {
        assert_eq!(encode_string(&[1, 2, 3, 4]), "AQIDBA");
    }

    #[test]
    fn empty() {
        assert_eq!(encode_string(&[]), "");
    }

    #[test]
    fn tail_lengths() {
        assert_eq!(encode_string(&[0xFF]), "_w");
        assert_eq!(encode_string(&[0xFF, 0xFF]), "__8");
        assert_eq!(encode_string(&[0xFF, 0xFF, 0xFF]), "____");
    }

    #[test]
    fn url_safe_alphabet() {
        // 0xFB 0xEF yields '-'/'_' territory in the url-safe table.
        let encoded = encode_string(&[0xFB, 0xEF, 0xBE]);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('='));
    }

    #[test]
    fn encoded_len_matches() {
        for n in 0..32usize {
            let data: Vec<u8> = (0..n as u8).collect();
            assert_eq!(encode_string(&data).len(), encoded_len(n));
        }
    }
}
