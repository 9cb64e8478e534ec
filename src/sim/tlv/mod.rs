//! Tag-length-value codecs used by SIM elementary files and card responses.
//!
//! Three flavours are supported:
//! - Simple-TLV (ISO/IEC 7816-4 5.2.1), see [`SimpleTlvIter`]
//! - Comprehension-TLV (ETSI TS 101.220 7.1.1), see [`ComprehensionTlvIter`]
//!   and [`ComprehensionBuilder`]
//! - BER-TLV (ISO/IEC 7816-4 5.2.2), see [`BerTlvIter`] and [`BerBuilder`]
//!
//! Iterators borrow the buffer they walk and hand out borrowed value slices.
//! A malformed element ends iteration for good: the iterator never yields
//! anything that reaches past the buffer.

mod ber;
mod builder;
mod comprehension;
mod simple;

pub use ber::{BerTlv, BerTlvIter};
pub use builder::{BerBuilder, ComprehensionBuilder};
pub use comprehension::{ComprehensionTlv, ComprehensionTlvIter};
pub use simple::{SimpleTlv, SimpleTlvIter};

/// Size reserved in front of every BER element while it is being built.
pub(crate) const MAX_BER_HEADER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The buffer cannot even hold an empty element.
    BufferTooSmall,
    /// The element would not fit into the remaining buffer.
    Overflow,
    /// No element has been started yet.
    NoElement,
    /// Tag number outside of what the encoding can carry.
    InvalidTag,
    /// Too many nested builders.
    NestingTooDeep,
    /// Operation does not apply to the innermost builder.
    WrongBuilder,
}

/// BER tag class, bits 8-7 of the first tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Class {
    Universal = 0,
    Application = 1,
    ContextSpecific = 2,
    Private = 3,
}

impl Class {
    pub(crate) const fn from_bits(b: u8) -> Self {
        match (b >> 6) & 0x03 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::ContextSpecific,
            _ => Self::Private,
        }
    }
}

/// BER primitive/constructed flag, bit 6 of the first tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encoding {
    Primitive = 0,
    Constructed = 1,
}

impl Encoding {
    pub(crate) const fn from_bits(b: u8) -> Self {
        if b & 0x20 != 0 {
            Self::Constructed
        } else {
            Self::Primitive
        }
    }
}

/// Number of bytes needed to encode `len` as a BER/Comprehension length.
pub(crate) const fn length_field_size(len: usize) -> usize {
    if len <= 0x7f {
        1
    } else if len <= 0xff {
        2
    } else if len <= 0xffff {
        3
    } else if len <= 0xff_ffff {
        4
    } else {
        5
    }
}

/// Writes `len` in its shortest definite form, returns the bytes used.
pub(crate) fn write_length(out: &mut [u8], len: usize) -> usize {
    let size = length_field_size(len);
    if size == 1 {
        out[0] = len as u8;
    } else {
        out[0] = 0x80 + (size - 1) as u8;
        for (i, b) in out[1..size].iter_mut().enumerate() {
            *b = (len >> ((size - 2 - i) * 8)) as u8;
        }
    }
    size
}

/// Reads `n` big-endian length bytes. The leading byte must be non-zero so
/// that every length has exactly one extended encoding.
pub(crate) fn read_extended_length(data: &[u8], n: usize) -> Option<usize> {
    let bytes = data.get(..n)?;
    if bytes[0] == 0 {
        return None;
    }
    Some(bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

/// Checks a TLV with one byte of tag and one byte of length whose value is
/// UTF-8 without embedded NULs, optionally terminated by a single NUL.
pub fn validate_utf8_tlv(tlv: &[u8]) -> bool {
    let Some(&len) = tlv.get(1) else {
        return false;
    };
    let mut len = len as usize;
    if len == 0 {
        return false;
    }

    let Some(value) = tlv.get(2..2 + len) else {
        return false;
    };
    if value[len - 1] == 0 {
        len -= 1;
    }

    // Embedded NULs are rejected even though they are valid UTF-8
    let value = &value[..len];
    !value.contains(&0) && core::str::from_utf8(value).is_ok()
}
