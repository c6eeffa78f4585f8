//! Strict UTF-8 decoding of NUL-terminated message bytes.
//!
//! Each sequence is packed by concatenating its raw bytes into a `u32`
//! (`"ß"` is `0xc39f`) and accepted only if the packed value falls in one of
//! the well-formed ranges. Anything else decodes to U+FFFD and consumes a
//! single byte, so decoding always makes progress.

/// Sequence length indexed by the top nibble of the leader byte.
const LENGTHS: [u8; 16] = [
    1, 1, 1, 1, // 00xx xxxx
    1, 1, 1, 1, // 01xx xxxx
    0, 0, 0, 0, // 10xx xxxx
    2, 2, 3, 4, // 11xx xxxx
];

/// U+FFFD as packed UTF-8.
const REPLACEMENT_PACKED: u32 = 0x00ef_bfbd;

/// Length of the sequence `leader` starts, or 0 for a continuation byte.
pub fn sequence_length(leader: u8) -> usize {
    usize::from(LENGTHS[usize::from(leader >> 4)])
}

/// Returns true for a `10xx_xxxx` byte.
pub fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

/// Checks a packed sequence against the well-formed UTF-8 ranges.
pub fn validate_packed(c: u32) -> bool {
    match c {
        0..=0x7f => true,
        0xc280..=0xdfbf => c & 0xe0c0 == 0xc080,
        // UTF-16 surrogates are never valid.
        0x00ed_a080..=0x00ed_bfbf => false,
        0x00e0_a080..=0x00ef_bfbf => c & 0x00f0_c0c0 == 0x00e0_8080,
        0xf090_8080..=0xf48f_bfbf => c & 0xf8c0_c0c0 == 0xf080_8080,
        _ => false,
    }
}

/// Packs the sequence at the start of `src`.
///
/// Returns the packed value and the number of bytes consumed. A NUL byte or
/// the end of `src` ends a sequence early, which then fails validation.
pub fn next_sequence(src: &[u8]) -> (u32, usize) {
    let Some(&leader) = src.first() else {
        return (0, 0);
    };
    let len = sequence_length(leader);

    let packed = src
        .iter()
        .take(len)
        .take_while(|&&b| b != 0)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

    if len == 0 || !validate_packed(packed) {
        (REPLACEMENT_PACKED, 1)
    } else {
        (packed, len)
    }
}

/// Converts a validated packed sequence to its scalar value.
pub fn packed_to_char(c: u32) -> char {
    let code = if c > 0x7f {
        let mask = if c <= 0x00ef_bfbf {
            0x000f_0000
        } else {
            0x003f_0000
        };
        ((c & 0x0700_0000) >> 6) | ((c & mask) >> 4) | ((c & 0x0000_3f00) >> 2) | (c & 0x3f)
    } else {
        c
    };
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Decodes `src` into `out` until `out` is full or the terminator (a NUL
/// byte or the end of `src`) is reached.
///
/// Returns the number of codepoints written and whether decoding stopped at
/// the terminator. Slots past the returned count are left untouched.
pub fn decode_into(src: &[u8], out: &mut [char]) -> (usize, bool) {
    let mut pos = 0;
    let mut count = 0;

    while count < out.len() {
        match src.get(pos) {
            None | Some(0) => break,
            Some(_) => {}
        }
        let (packed, len) = next_sequence(&src[pos..]);
        out[count] = packed_to_char(packed);
        count += 1;
        pos += len;
    }

    let complete = matches!(src.get(pos), None | Some(0));
    (count, complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(src: &[u8], limit: usize) -> (Vec<char>, bool) {
        let mut out = vec!['\0'; limit];
        let (count, complete) = decode_into(src, &mut out);
        out.truncate(count);
        (out, complete)
    }

    #[test]
    fn test_sequences() {
        let src = "Aaß書.".as_bytes();
        let expected = [
            (0x41, 1, 'A'),
            (0x61, 1, 'a'),
            (0xc39f, 2, 'ß'),
            (0xe69bb8, 3, '書'),
            (0x2e, 1, '.'),
        ];
        let mut pos = 0;
        for (packed, len, ch) in expected {
            assert_eq!(next_sequence(&src[pos..]), (packed, len));
            assert_eq!(packed_to_char(packed), ch);
            pos += len;
        }
        assert_eq!(pos, src.len());
    }

    #[test]
    fn test_valid_multibyte_round_trip() {
        let text = "27-33度  多雲，午後有局部短暫雷陣雨 😀";
        let (chars, complete) = decode(text.as_bytes(), 64);
        assert!(complete);
        assert_eq!(chars.iter().collect::<String>(), text);
    }

    #[test]
    fn test_invalid_bytes_replace_one_each() {
        let (chars, complete) = decode(b"\x94\x41\xe9\x42\xc8", 10);
        assert!(complete);
        assert_eq!(chars, vec!['\u{fffd}', 'A', '\u{fffd}', 'B', '\u{fffd}']);

        let (chars, _) = decode(b"\x94\xe9\xc8", 10);
        assert_eq!(chars, vec!['\u{fffd}'; 3]);
    }

    #[test]
    fn test_overlong_rejected() {
        assert!(!validate_packed(0xc181));
        let (chars, complete) = decode(b"\xc1\x81", 10);
        assert!(complete);
        assert_eq!(chars, vec!['\u{fffd}', '\u{fffd}']);

        // Overlong three- and four-byte forms.
        assert!(!validate_packed(0xe08080));
        assert!(!validate_packed(0xf0808080));
    }

    #[test]
    fn test_surrogates_rejected() {
        for packed in [0xeda080, 0xedafbf, 0xedb080, 0xedbfbf] {
            assert!(!validate_packed(packed), "{:x}", packed);
        }
        let (chars, _) = decode(b"\xed\xa0\x80", 10);
        assert_eq!(chars, vec!['\u{fffd}'; 3]);
        // Either side of the surrogate block is fine.
        assert!(validate_packed(0xed9fbf));
        assert!(validate_packed(0xee8080));
    }

    #[test]
    fn test_above_unicode_range_rejected() {
        assert!(validate_packed(0xf48fbfbf));
        assert!(!validate_packed(0xf4908080));
    }

    #[test]
    fn test_capacity_limits_output() {
        let mut out = ['#'; 4];
        let (count, complete) = decode_into("abcde".as_bytes(), &mut out[..3]);
        assert_eq!(count, 3);
        assert!(!complete);
        assert_eq!(out, ['a', 'b', 'c', '#']);
    }

    #[test]
    fn test_capacity_exactly_reaches_terminator() {
        let mut out = ['#'; 2];
        assert_eq!(decode_into(b"ab", &mut out), (2, true));
        assert_eq!(decode_into(b"ab\0cd", &mut out), (2, true));
    }

    #[test]
    fn test_nul_terminates() {
        let (chars, complete) = decode(b"hi\0there", 10);
        assert!(complete);
        assert_eq!(chars, vec!['h', 'i']);

        // A NUL inside a sequence cuts it short.
        assert_eq!(next_sequence(b"\xe6\x9b\0"), (REPLACEMENT_PACKED, 1));
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        let (chars, complete) = decode(b"\xe6\x9b", 10);
        assert!(complete);
        assert_eq!(chars, vec!['\u{fffd}', '\u{fffd}']);
    }

    #[test]
    fn test_empty_and_zero_capacity() {
        assert_eq!(decode(b"", 4), (vec![], true));
        assert_eq!(decode_into(b"abc", &mut []), (0, false));
    }
}
