/// Decode an unsigned LEB128 value, returning it with the number of bytes consumed.
///
/// Dex uleb128 values are 32-bit, so valid encodings are at most 5 bytes.
/// Returns `None` for a truncated sequence or one that continues past 5 bytes.
pub(crate) fn decode_uleb128(encoded: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;

    for (count, &byte) in encoded.iter().enumerate().take(5) {
        let low = (byte & 0x7F) as u32;
        value |= low.wrapping_shl(shift);

        if (byte & 0x80) == 0 {
            return Some((value, count + 1));
        }
        shift += 7;
    }

    None
}

#[cfg(test)]
pub(crate) fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;

        if remaining != 0 {
            byte |= 0x80;
        }

        result.push(byte);

        if remaining == 0 {
            break;
        }
    }

    result
}
