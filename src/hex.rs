use core::{fmt, num::ParseIntError};
use heapless::Vec;

/// Decodes a hex string such as `"62178202"` into at most `N` bytes.
pub fn decode_hex<const N: usize>(s: &str) -> Result<Vec<u8, N>, DecodeHexError> {
    if s.len() % 2 != 0 {
        return Err(DecodeHexError::OddLength);
    }

    let mut out = Vec::new();
    for i in (0..s.len()).step_by(2) {
        let digits = s.get(i..i + 2).ok_or(DecodeHexError::NotAscii)?;
        let byte = u8::from_str_radix(digits, 16).map_err(DecodeHexError::ParseInt)?;
        out.push(byte).map_err(|_| DecodeHexError::Overflow)?;
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeHexError {
    OddLength,
    NotAscii,
    Overflow,
    ParseInt(ParseIntError),
}

impl fmt::Display for DecodeHexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeHexError::OddLength => "input string has an odd number of bytes".fmt(f),
            DecodeHexError::NotAscii => "input string is not ascii".fmt(f),
            DecodeHexError::Overflow => "decoded bytes do not fit the buffer".fmt(f),
            DecodeHexError::ParseInt(e) => e.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        let bytes: Vec<u8, 4> = decode_hex("2F05ff").unwrap();
        assert_eq!(&bytes[..], &[0x2f, 0x05, 0xff]);

        assert_eq!(decode_hex::<4>("2F0"), Err(DecodeHexError::OddLength));
        assert_eq!(decode_hex::<2>("2F05FF"), Err(DecodeHexError::Overflow));
        assert!(matches!(
            decode_hex::<4>("2G"),
            Err(DecodeHexError::ParseInt(_))
        ));
    }
}
