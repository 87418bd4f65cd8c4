//! Binary image decoding.
//!
//! A program image is a raw byte stream of little-endian 16-bit words with
//! no header; the word count is implicit from the byte count. Words are
//! not range-checked here — out-of-range values only matter once they are
//! used in an operand position.

/// Decode a raw byte stream into words. An odd trailing byte is ignored.
pub fn decode_image(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode words back into the little-endian byte layout of an image.
pub fn encode_image(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_bytes_little_endian() {
        let words = decode_image(&[0x34, 0x12, 0xFF, 0x7F]);
        assert_eq!(words, vec![0x1234, 0x7FFF]);
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        let words = decode_image(&[0x01, 0x00, 0x02]);
        assert_eq!(words, vec![1]);
    }

    #[test]
    fn empty_image_decodes_to_no_words() {
        assert!(decode_image(&[]).is_empty());
    }

    #[test]
    fn encode_is_the_exact_inverse() {
        let words = vec![0, 1, 32767, 32768, 32775, 65535];
        assert_eq!(decode_image(&encode_image(&words)), words);
    }
}
