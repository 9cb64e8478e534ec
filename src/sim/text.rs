//! Text codings found on SIM cards: the GSM 7 bit default alphabet (3GPP
//! TS 23.038), UCS-2 and the SIM "alpha" forms of TS 102.221 Annex A.

use heapless::{String, Vec};

const ESCAPE: u8 = 0x1b;

#[rustfmt::skip]
const DEFAULT_ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{a0}', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

/// Characters reached through the escape code.
const EXTENSION_TABLE: [(u8, char); 10] = [
    (0x0a, '\u{0c}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2f, '\\'),
    (0x3c, '['),
    (0x3d, '~'),
    (0x3e, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

fn default_char(code: u8) -> char {
    DEFAULT_ALPHABET[(code & 0x7f) as usize]
}

fn extension_char(code: u8) -> char {
    EXTENSION_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, ch)| *ch)
        .unwrap_or_else(|| default_char(code))
}

/// Unpacks at most `max_chars` septets from GSM 7 bit packed octets.
pub fn unpack_7bit<const N: usize>(packed: &[u8], max_chars: usize) -> Option<Vec<u8, N>> {
    let mut out = Vec::new();
    let mut carry = 0u16;
    let mut bits = 0;

    for &octet in packed {
        if out.len() >= max_chars {
            break;
        }

        let septet = (((octet as u16) << bits) | carry) & 0x7f;
        out.push(septet as u8).ok()?;
        carry = (octet as u16) >> (7 - bits);
        bits += 1;

        if bits == 7 {
            if out.len() < max_chars {
                out.push(carry as u8).ok()?;
            }
            carry = 0;
            bits = 0;
        }
    }

    Some(out)
}

/// Decodes unpacked GSM default alphabet codes, stopping at `terminator`.
pub fn gsm_to_utf8<const N: usize>(codes: &[u8], terminator: Option<u8>) -> Option<String<N>> {
    let mut out = String::new();
    let mut iter = codes.iter().copied();

    while let Some(code) = iter.next() {
        if Some(code) == terminator {
            break;
        }

        let ch = if code == ESCAPE {
            match iter.next() {
                Some(next) if Some(next) != terminator => extension_char(next),
                _ => break,
            }
        } else {
            default_char(code)
        };

        out.push(ch).ok()?;
    }

    Some(out)
}

/// Decodes big-endian UCS-2, stopping at a `0xFFFF` filler.
pub fn ucs2_to_utf8<const N: usize>(bytes: &[u8]) -> Option<String<N>> {
    if bytes.len() % 2 != 0 {
        return None;
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0xffff);

    let mut out = String::new();
    for ch in char::decode_utf16(units) {
        out.push(ch.ok()?).ok()?;
    }
    Some(out)
}

/// Decodes an alpha identifier (EF ADN names, application labels, ...).
pub fn sim_string_to_utf8<const N: usize>(buf: &[u8]) -> Option<String<N>> {
    let (&coding, rest) = buf.split_first()?;

    let (count, base, chars) = match coding {
        0x80 => {
            // Odd trailing byte must be filler
            let rest = match rest.len() % 2 {
                0 => rest,
                _ if rest.last() == Some(&0xff) => &rest[..rest.len() - 1],
                _ => return None,
            };
            return ucs2_to_utf8(rest);
        }
        0x81 => {
            let (&count, rest) = rest.split_first()?;
            let (&base, chars) = rest.split_first()?;
            (count as usize, (base as u16) << 7, chars)
        }
        0x82 => {
            let (&count, rest) = rest.split_first()?;
            let base = rest.get(..2)?;
            (
                count as usize,
                u16::from_be_bytes([base[0], base[1]]),
                &rest[2..],
            )
        }
        _ if buf.iter().all(|b| *b == 0xff) => return Some(String::new()),
        _ => return gsm_to_utf8(buf, Some(0xff)),
    };

    let chars = chars.get(..count)?;
    let mut out = String::new();
    let mut iter = chars.iter().copied();

    while let Some(c) = iter.next() {
        let ch = if c & 0x80 != 0 {
            char::from_u32(u32::from(base.checked_add(u16::from(c & 0x7f))?))?
        } else if c == ESCAPE {
            match iter.next() {
                Some(next) => extension_char(next),
                None => break,
            }
        } else {
            default_char(c)
        };
        out.push(ch).ok()?;
    }

    Some(out)
}

fn gsm_code(ch: char) -> Option<(u8, Option<u8>)> {
    if let Some(code) = DEFAULT_ALPHABET.iter().position(|c| *c == ch) {
        if code as u8 != ESCAPE {
            return Some((code as u8, None));
        }
    }

    EXTENSION_TABLE
        .iter()
        .find(|(_, c)| *c == ch)
        .map(|(code, _)| (ESCAPE, Some(*code)))
}

/// Encodes `text` as an alpha identifier filling `out`, using the GSM
/// default alphabet when possible and the `0x80` UCS-2 form otherwise.
/// Unused bytes are set to `0xFF`. Returns the number of bytes used, text
/// that does not fit is cut at a character boundary.
pub fn utf8_to_sim_string(text: &str, out: &mut [u8]) -> usize {
    out.fill(0xff);

    if text.chars().all(|ch| gsm_code(ch).is_some()) {
        let mut used = 0;
        for (first, second) in text.chars().filter_map(gsm_code) {
            let size = if second.is_some() { 2 } else { 1 };
            if used + size > out.len() {
                break;
            }
            out[used] = first;
            if let Some(second) = second {
                out[used + 1] = second;
            }
            used += size;
        }
        return used;
    }

    let Some((coding, rest)) = out.split_first_mut() else {
        return 0;
    };
    *coding = 0x80;

    let mut used = 0;
    let mut units = [0u16; 2];
    for ch in text.chars() {
        let encoded = ch.encode_utf16(&mut units);
        if used + 2 * encoded.len() > rest.len() {
            break;
        }
        for unit in encoded.iter() {
            rest[used..used + 2].copy_from_slice(&unit.to_be_bytes());
            used += 2;
        }
    }

    1 + used
}
