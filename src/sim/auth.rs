//! AUTHENTICATE command and response layouts (3GPP TS 31.102 7.1.2).

pub const RAND_LEN: usize = 16;
pub const AUTN_LEN: usize = 16;

/// Encoded size of a GSM context AUTHENTICATE command.
pub const GSM_AUTHENTICATE_LEN: usize = 23;
/// Encoded size of a 3G context AUTHENTICATE command.
pub const UMTS_AUTHENTICATE_LEN: usize = 40;

const KC_LEN: usize = 8;
const SRES_LEN: usize = 4;

/// Decoded AUTHENTICATE response. All fields borrow the response buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResponse<'a> {
    /// Successful 3G authentication, tag `0xDB`.
    Umts {
        res: &'a [u8],
        ck: &'a [u8],
        ik: &'a [u8],
        kc: Option<&'a [u8]>,
    },
    /// Synchronisation failure, tag `0xDC`.
    SyncFailure { auts: &'a [u8] },
    /// GSM security context, tag `0x04`.
    Gsm { sres: &'a [u8], kc: &'a [u8] },
}

fn build(out: &mut [u8], rand: &[u8; RAND_LEN], autn: Option<&[u8; AUTN_LEN]>) -> usize {
    let (p2, lc) = match autn {
        Some(_) => (0x81, 0x22),
        None => (0x80, 0x11),
    };
    out[..6].copy_from_slice(&[0x00, 0x88, 0x00, p2, lc, RAND_LEN as u8]);
    out[6..6 + RAND_LEN].copy_from_slice(rand);

    let mut pos = 6 + RAND_LEN;
    if let Some(autn) = autn {
        out[pos] = AUTN_LEN as u8;
        out[pos + 1..pos + 1 + AUTN_LEN].copy_from_slice(autn);
        pos += 1 + AUTN_LEN;
    }

    out[pos] = 0x00;
    pos + 1
}

/// Writes a GSM context AUTHENTICATE APDU, returns its length.
pub fn build_gsm_authenticate(out: &mut [u8], rand: &[u8; RAND_LEN]) -> Option<usize> {
    if out.len() < GSM_AUTHENTICATE_LEN {
        return None;
    }
    Some(build(out, rand, None))
}

/// Writes a 3G context AUTHENTICATE APDU, returns its length.
pub fn build_umts_authenticate(
    out: &mut [u8],
    rand: &[u8; RAND_LEN],
    autn: &[u8; AUTN_LEN],
) -> Option<usize> {
    if out.len() < UMTS_AUTHENTICATE_LEN {
        return None;
    }
    Some(build(out, rand, Some(autn)))
}

/// Splits a length prefixed field off `data`.
fn take_lv(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = data.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

/// Parses the response to an AUTHENTICATE command. Every layout must
/// consume the buffer exactly.
pub fn parse_umts_authenticate(response: &[u8]) -> Option<AuthResponse<'_>> {
    if response.len() < 2 {
        return None;
    }

    let (&tag, rest) = response.split_first()?;
    match tag {
        0xdb => {
            let (res, rest) = take_lv(rest)?;
            if rest.is_empty() {
                return None;
            }
            let (ck, rest) = take_lv(rest)?;
            if rest.is_empty() {
                return None;
            }
            let (ik, rest) = take_lv(rest)?;

            let kc = if rest.is_empty() {
                None
            } else {
                let (kc, rest) = take_lv(rest)?;
                if kc.len() != KC_LEN || !rest.is_empty() {
                    return None;
                }
                Some(kc)
            };

            Some(AuthResponse::Umts { res, ck, ik, kc })
        }
        0xdc => {
            let (auts, rest) = take_lv(rest)?;
            rest.is_empty().then_some(AuthResponse::SyncFailure { auts })
        }
        0x04 => {
            let sres = rest.get(..SRES_LEN)?;
            let (kc, rest) = take_lv(&rest[SRES_LEN..])?;
            (kc.len() == KC_LEN && rest.is_empty()).then_some(AuthResponse::Gsm { sres, kc })
        }
        _ => None,
    }
}

/// Parses the fixed layout answer of a GSM context RUN GSM ALGORITHM style
/// AUTHENTICATE: `04 SRES(4) 08 Kc(8)`.
pub fn parse_gsm_authenticate(response: &[u8]) -> Option<(&[u8], &[u8])> {
    if response.len() < 14 || response[0] != 0x04 || response[5] != 0x08 {
        return None;
    }
    Some((&response[1..5], &response[6..14]))
}
