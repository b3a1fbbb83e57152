use bytes::{BufMut, BytesMut};

use crate::error::{LinkError, Result};

/// Out-of-band reset marker. Never appears unescaped inside a frame.
pub const RESET: u8 = 0x1B;

/// Escape marker. The next byte is a nibble-swapped literal.
pub const ESCAPE: u8 = 0x5C;

/// Swap the high and low nibbles of a byte.
pub const fn swap_nibbles(byte: u8) -> u8 {
    ((byte & 0x0F) << 4) | ((byte >> 4) & 0x0F)
}

/// Returns true if `byte` must be escaped on the wire.
pub const fn is_reserved(byte: u8) -> bool {
    byte == RESET || byte == ESCAPE
}

/// Escape a payload into the wire format.
///
/// ```text
/// 0x1B  ->  0x5C 0xB1
/// 0x5C  ->  0x5C 0xC5
/// other ->  unchanged
/// ```
pub fn escape(payload: &[u8], dst: &mut BytesMut) {
    let reserved = payload.iter().filter(|b| is_reserved(**b)).count();
    dst.reserve(payload.len() + reserved);
    for &byte in payload {
        if is_reserved(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(swap_nibbles(byte));
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Escape a payload into a freshly allocated vector.
pub fn escape_to_vec(payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    escape(payload, &mut buf);
    buf.to_vec()
}

/// Decode the byte following an ESCAPE marker.
///
/// Only the encodings of the two reserved values are accepted; a RESET in
/// continuation position is reported as a reset, not as data.
pub(crate) fn decode_continuation(byte: u8) -> Result<u8> {
    if byte == RESET {
        return Err(LinkError::UnexpectedReset);
    }
    let literal = swap_nibbles(byte);
    if is_reserved(literal) {
        Ok(literal)
    } else {
        Err(LinkError::MalformedEscape(byte))
    }
}

/// Decode a complete wire buffer back into payload bytes.
pub fn unescape(wire: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(wire.len());
    let mut bytes = wire.iter().copied();
    while let Some(byte) = bytes.next() {
        match byte {
            RESET => return Err(LinkError::UnexpectedReset),
            ESCAPE => {
                let next = bytes.next().ok_or(LinkError::IncompleteEscape)?;
                out.push(decode_continuation(next)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bytes_use_swapped_encoding() {
        assert_eq!(escape_to_vec(&[RESET]), vec![0x5C, 0xB1]);
        assert_eq!(escape_to_vec(&[ESCAPE]), vec![0x5C, 0xC5]);
    }

    #[test]
    fn plain_bytes_pass_through() {
        let payload: Vec<u8> = (0u8..=255).filter(|b| !is_reserved(*b)).collect();
        assert_eq!(escape_to_vec(&payload), payload);
    }

    #[test]
    fn roundtrip_every_byte_value() {
        let payload: Vec<u8> = (0u8..=255).chain((0u8..=255).rev()).collect();
        let wire = escape_to_vec(&payload);
        assert_eq!(wire.len(), payload.len() + 4);
        assert_eq!(unescape(&wire).unwrap(), payload);
    }

    #[test]
    fn roundtrip_runs_of_reserved_bytes() {
        let payload = [RESET, RESET, ESCAPE, ESCAPE, RESET, 0x00, ESCAPE];
        let wire = escape_to_vec(&payload);
        assert!(!wire.contains(&RESET));
        assert_eq!(unescape(&wire).unwrap(), payload);
    }

    #[test]
    fn only_two_continuations_decode() {
        for byte in 0u8..=255 {
            let decoded = decode_continuation(byte);
            match byte {
                0xB1 => assert_eq!(decoded.unwrap(), RESET),
                0xC5 => assert_eq!(decoded.unwrap(), ESCAPE),
                RESET => assert!(matches!(decoded, Err(LinkError::UnexpectedReset))),
                _ => assert!(matches!(decoded, Err(LinkError::MalformedEscape(b)) if b == byte)),
            }
        }
    }

    #[test]
    fn bare_reset_in_wire_is_rejected() {
        let err = unescape(&[0x01, RESET, 0x02]).unwrap_err();
        assert!(matches!(err, LinkError::UnexpectedReset));
    }

    #[test]
    fn trailing_escape_is_incomplete() {
        let err = unescape(&[0x01, ESCAPE]).unwrap_err();
        assert!(matches!(err, LinkError::IncompleteEscape));
    }

    #[test]
    fn swap_is_an_involution() {
        for byte in 0u8..=255 {
            assert_eq!(swap_nibbles(swap_nibbles(byte)), byte);
        }
        assert_eq!(swap_nibbles(0x1B), 0xB1);
    }
}
