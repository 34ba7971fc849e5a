//! Unsigned LEB128 varints, as used by multiformats and CAR framing.

/// Maximum encoded length of a u64 varint.
pub const MAX_LEN: usize = 10;

/// Append `value` to `out` as an unsigned varint.
pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint from the front of `input`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input is truncated or overflows a u64.
pub fn decode(input: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, byte) in input.iter().enumerate().take(MAX_LEN) {
        let bits = u64::from(byte & 0x7f);
        if i == MAX_LEN - 1 && bits > 1 {
            return None;
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
