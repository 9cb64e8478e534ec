//! Dialling numbers as stored in EF ADN, EF FDN, EF MSISDN and friends
//! (3GPP TS 31.102 4.4.2.3).

use heapless::String;

use super::text::{sim_string_to_utf8, utf8_to_sim_string};

/// Extended BCD digits; `c` is the DTMF separator, `?` the wild value and
/// `e` the former shift operator. `F` ends the number.
const BCD_DIGITS: &[u8; 15] = b"0123456789*#c?e";

/// Mandatory part of an ADN-like record, following the alpha identifier.
const ADN_FIXED_LEN: usize = 14;
const ADN_MAX_BCD: usize = 10;

pub const MAX_NUMBER_LEN: usize = 2 * ADN_MAX_BCD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub number: String<MAX_NUMBER_LEN>,
    /// Type of number and numbering plan identification, 0x81 or 0x91
    pub ton_npi: u8,
}

/// Maps a digit character to its semi-octet value.
pub(crate) fn to_semi_oct(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        '*' => Some(10),
        '#' => Some(11),
        'c' | 'C' => Some(12),
        '?' => Some(13),
        'e' | 'E' => Some(14),
        _ => None,
    }
}

/// Extracts BCD digits, low nibble first, up to the first `F` end mark.
pub fn extract_bcd_number<const N: usize>(bcd: &[u8]) -> Option<String<N>> {
    let mut out = String::new();

    let nibbles = bcd.iter().flat_map(|oct| [oct & 0x0f, oct >> 4]);
    for nibble in nibbles {
        let Some(digit) = BCD_DIGITS.get(nibble as usize) else {
            break;
        };
        out.push(*digit as char).ok()?;
    }

    Some(out)
}

/// Packs `number` into `out`, padding an odd final digit with `F`. Returns
/// the bytes written.
pub fn encode_bcd_number(number: &str, out: &mut [u8]) -> Option<usize> {
    let needed = number.chars().count().div_ceil(2);
    let out = out.get_mut(..needed)?;

    let mut digits = number.chars();
    for byte in out.iter_mut() {
        let low = to_semi_oct(digits.next()?)?;
        let high = match digits.next() {
            Some(c) => to_semi_oct(c)?,
            None => 0x0f,
        };
        *byte = high << 4 | low;
    }

    Some(needed)
}

/// Parses an ADN record: an optional alpha identifier followed by the 14
/// byte number part. Fails on records too short, numbers longer than 20
/// digits and unused records.
pub fn parse_adn<const N: usize>(record: &[u8]) -> Option<(PhoneNumber, Option<String<N>>)> {
    let alpha_len = record.len().checked_sub(ADN_FIXED_LEN)?;
    let (alpha, fixed) = record.split_at(alpha_len);

    let number_len = fixed[0] as usize;
    let ton_npi = fixed[1];
    if number_len > ADN_MAX_BCD + 1 || ton_npi == 0xff {
        return None;
    }

    // The length covers the TON/NPI byte
    let digits = &fixed[2..2 + number_len.saturating_sub(1)];
    let number = PhoneNumber {
        number: extract_bcd_number(digits)?,
        ton_npi,
    };

    let identifier = if alpha.is_empty() {
        None
    } else {
        sim_string_to_utf8(alpha)
    };

    Some((number, identifier))
}

/// Fills an ADN record of `record.len()` bytes. Capability and extension
/// record identifiers are left unused.
pub fn build_adn(record: &mut [u8], number: &PhoneNumber, identifier: Option<&str>) -> Option<()> {
    let alpha_len = record.len().checked_sub(ADN_FIXED_LEN)?;
    let (alpha, fixed) = record.split_at_mut(alpha_len);

    fixed.fill(0xff);
    let used = encode_bcd_number(&number.number, &mut fixed[2..2 + ADN_MAX_BCD])?;
    fixed[0] = used as u8 + 1;
    fixed[1] = number.ton_npi;

    utf8_to_sim_string(identifier.unwrap_or(""), alpha);

    Some(())
}
