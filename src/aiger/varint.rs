// SPDX-License-Identifier: Apache-2.0

//! Biere-style 7-bit variable-length integers and the two delta codings
//! layered on them.
//!
//! Three distinct schemes live here and must not be mixed up:
//! - plain unsigned varints (7 payload bits per byte, 0x80 continuation);
//! - signed varints storing sign-magnitude in the low bit (NOT zig-zag);
//! - driver-literal delta lists, where the low bit of each delta is a
//!   direction flag (set means the literal went DOWN relative to the
//!   previous one -- the opposite reading from the signed scheme's low bit).
//!
//! Decoders are bounded: a stream needing more than `ceil(width/7)` groups,
//! or one whose final group overflows the target width, is an error rather
//! than an out-of-bounds read or a silent wrap.

pub fn encode_u32(out: &mut Vec<u8>, mut x: u32) {
    while x & !0x7f != 0 {
        out.push(((x & 0x7f) as u8) | 0x80);
        x >>= 7;
    }
    out.push((x & 0x7f) as u8);
}

pub fn encode_u64(out: &mut Vec<u8>, mut x: u64) {
    while x & !0x7f != 0 {
        out.push(((x & 0x7f) as u8) | 0x80);
        x >>= 7;
    }
    out.push((x & 0x7f) as u8);
}

pub fn decode_u32(src: &[u8], cursor: &mut usize) -> Result<u32, String> {
    let mut shift = 0u32;
    let mut acc = 0u32;
    loop {
        if *cursor >= src.len() {
            return Err("unexpected end of stream in varint".to_string());
        }
        let byte = src[*cursor];
        *cursor += 1;
        if shift >= 32 {
            return Err("varint longer than 5 bytes for a 32-bit value".to_string());
        }
        let group = (byte & 0x7f) as u32;
        if shift == 28 && group >> 4 != 0 {
            return Err("varint overflows 32 bits".to_string());
        }
        acc |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(acc);
        }
        shift += 7;
    }
}

pub fn decode_u64(src: &[u8], cursor: &mut usize) -> Result<u64, String> {
    let mut shift = 0u32;
    let mut acc = 0u64;
    loop {
        if *cursor >= src.len() {
            return Err("unexpected end of stream in varint".to_string());
        }
        let byte = src[*cursor];
        *cursor += 1;
        if shift >= 64 {
            return Err("varint longer than 10 bytes for a 64-bit value".to_string());
        }
        let group = (byte & 0x7f) as u64;
        if shift == 63 && group >> 1 != 0 {
            return Err("varint overflows 64 bits".to_string());
        }
        acc |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(acc);
        }
        shift += 7;
    }
}

/// Signed scheme: `(|x| << 1) | sign` through the unsigned coder.
/// `i64::MIN` has no 63-bit magnitude and is rejected by assertion.
pub fn encode_i64(out: &mut Vec<u8>, x: i64) {
    assert!(x != i64::MIN, "magnitude of i64::MIN does not fit the signed varint scheme");
    encode_u64(out, (x.unsigned_abs() << 1) | (x < 0) as u64);
}

pub fn decode_i64(src: &[u8], cursor: &mut usize) -> Result<i64, String> {
    let coded = decode_u64(src, cursor)?;
    let magnitude = (coded >> 1) as i64;
    Ok(if coded & 1 != 0 { -magnitude } else { magnitude })
}

/// Driver-literal list: first literal plain, every following one as a
/// direction-flagged delta from its predecessor.
pub fn encode_literal_deltas(out: &mut Vec<u8>, lits: &[u32]) {
    let mut iter = lits.iter();
    let Some(&first) = iter.next() else {
        return;
    };
    encode_u32(out, first);
    let mut prev = first;
    for &lit in iter {
        let (magnitude, down) = if lit >= prev { (lit - prev, 0u64) } else { (prev - lit, 1u64) };
        encode_u64(out, ((magnitude as u64) << 1) | down);
        prev = lit;
    }
}

pub fn decode_literal_deltas(
    src: &[u8],
    cursor: &mut usize,
    count: usize,
) -> Result<Vec<u32>, String> {
    let mut lits = Vec::with_capacity(count);
    if count == 0 {
        return Ok(lits);
    }
    let first = decode_u32(src, cursor)?;
    lits.push(first);
    let mut prev = first as u64;
    for _ in 1..count {
        let coded = decode_u64(src, cursor)?;
        let magnitude = coded >> 1;
        let lit = if coded & 1 != 0 {
            prev.checked_sub(magnitude)
                .ok_or_else(|| "literal delta drops below zero".to_string())?
        } else {
            prev + magnitude
        };
        if lit > u32::MAX as u64 {
            return Err("literal delta exceeds the 32-bit literal range".to_string());
        }
        lits.push(lit as u32);
        prev = lit;
    }
    Ok(lits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn expected_len(x: u64) -> usize {
        let bits = 64 - x.leading_zeros() as usize;
        bits.div_ceil(7).max(1)
    }

    #[test_case(0; "zero")]
    #[test_case(1; "one")]
    #[test_case(127; "seven bit max")]
    #[test_case(128; "first two byte value")]
    #[test_case(0xffff_ffff; "u32 max")]
    fn u32_round_trip(x: u32) {
        let mut buf = Vec::new();
        encode_u32(&mut buf, x);
        assert_eq!(buf.len(), expected_len(x as u64));
        let mut cursor = 0;
        assert_eq!(decode_u32(&buf, &mut cursor), Ok(x));
        assert_eq!(cursor, buf.len());
    }

    #[test_case(0)]
    #[test_case(u32::MAX as u64 + 1)]
    #[test_case(u64::MAX; "u64 max takes ten bytes")]
    fn u64_round_trip(x: u64) {
        let mut buf = Vec::new();
        encode_u64(&mut buf, x);
        assert_eq!(buf.len(), expected_len(x));
        let mut cursor = 0;
        assert_eq!(decode_u64(&buf, &mut cursor), Ok(x));
    }

    #[test]
    fn zero_is_a_single_zero_byte() {
        let mut buf = Vec::new();
        encode_u32(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);
    }

    #[test]
    fn decode_rejects_truncation() {
        // Continuation bit set on the last available byte.
        let mut cursor = 0;
        assert!(decode_u32(&[0x80], &mut cursor).is_err());
        let mut cursor = 0;
        assert!(decode_u64(&[0xff, 0xff], &mut cursor).is_err());
    }

    #[test]
    fn decode_rejects_overlong_u32() {
        // Six groups for a 32-bit target.
        let mut cursor = 0;
        let overlong = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(decode_u32(&overlong, &mut cursor).is_err());
        // Five groups whose final payload spills past bit 31.
        let mut cursor = 0;
        let spill = [0x80, 0x80, 0x80, 0x80, 0x10];
        assert!(decode_u32(&spill, &mut cursor).is_err());
    }

    #[test]
    fn decode_rejects_overlong_u64() {
        let mut cursor = 0;
        let mut overlong = vec![0x80u8; 10];
        overlong.push(0x01);
        assert!(decode_u64(&overlong, &mut cursor).is_err());
        let mut cursor = 0;
        let mut spill = vec![0x80u8; 9];
        spill.push(0x02);
        assert!(decode_u64(&spill, &mut cursor).is_err());
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(-1; "minus one")]
    #[test_case(i32::MIN as i64)]
    #[test_case(i32::MAX as i64)]
    fn signed_round_trip(x: i64) {
        let mut buf = Vec::new();
        encode_i64(&mut buf, x);
        let mut cursor = 0;
        assert_eq!(decode_i64(&buf, &mut cursor), Ok(x));
    }

    #[test]
    fn signed_low_bit_is_sign_not_zigzag() {
        let mut buf = Vec::new();
        encode_i64(&mut buf, -1);
        // Zig-zag would give 1; sign-magnitude gives (1 << 1) | 1 = 3.
        assert_eq!(buf, vec![0x03]);
    }

    #[test_case(&[0]; "single zero")]
    #[test_case(&[5]; "single literal")]
    #[test_case(&[4, 6, 6, 2, 100000, 3]; "repeats and jumps both ways")]
    #[test_case(&[u32::MAX, 0, u32::MAX]; "extreme swings")]
    fn literal_delta_round_trip(lits: &[u32]) {
        let mut buf = Vec::new();
        encode_literal_deltas(&mut buf, lits);
        let mut cursor = 0;
        let decoded = decode_literal_deltas(&buf, &mut cursor, lits.len()).unwrap();
        assert_eq!(decoded, lits);
        assert_eq!(cursor, buf.len());
    }

    #[test]
    fn literal_delta_empty() {
        let mut buf = Vec::new();
        encode_literal_deltas(&mut buf, &[]);
        assert!(buf.is_empty());
        let mut cursor = 0;
        assert_eq!(decode_literal_deltas(&buf, &mut cursor, 0), Ok(vec![]));
    }

    #[test]
    fn literal_delta_direction_bit() {
        // 10 then 4: delta of -6 encodes as (6 << 1) | 1 = 13.
        let mut buf = Vec::new();
        encode_literal_deltas(&mut buf, &[10, 4]);
        assert_eq!(buf, vec![10, 13]);
    }

    #[test]
    fn literal_delta_underflow_rejected() {
        // First literal 1, then a downward delta of 5.
        let stream = [0x01, 0x0b];
        let mut cursor = 0;
        assert!(decode_literal_deltas(&stream, &mut cursor, 2).is_err());
    }
}
