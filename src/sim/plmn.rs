//! PLMN identities in their 3 byte BCD form (3GPP TS 24.008 10.5.1.3) and
//! the service provider display list of EF SPDI.

use heapless::{String, Vec};

use super::number::to_semi_oct;
use super::tlv::BerTlvIter;

pub type Mcc = String<3>;
pub type Mnc = String<3>;

/// `b` marks a wildcard digit; `F` ends a two digit MNC.
const PLMN_DIGITS: &[u8; 15] = b"0123456789*#abd";

fn push_digit(out: &mut String<3>, nibble: u8) -> bool {
    match PLMN_DIGITS.get(nibble as usize) {
        Some(digit) => out.push(*digit as char).is_ok(),
        None => false,
    }
}

/// Decodes MCC and MNC from `bcd[..3]`.
pub fn parse_mcc_mnc(bcd: &[u8]) -> Option<(Mcc, Mnc)> {
    let bcd = bcd.get(..3)?;

    let mut mcc = Mcc::new();
    let _ = push_digit(&mut mcc, bcd[0] & 0x0f)
        && push_digit(&mut mcc, bcd[0] >> 4)
        && push_digit(&mut mcc, bcd[1] & 0x0f);

    let mut mnc = Mnc::new();
    let _ = push_digit(&mut mnc, bcd[2] & 0x0f)
        && push_digit(&mut mnc, bcd[2] >> 4)
        && push_digit(&mut mnc, bcd[1] >> 4);

    Some((mcc, mnc))
}

/// Encodes MCC and a two or three digit MNC.
pub fn encode_mcc_mnc(mcc: &str, mnc: &str) -> Option<[u8; 3]> {
    let semi = |s: &str, i: usize| -> Option<u8> {
        match s.chars().nth(i) {
            Some(c) => to_semi_oct(c),
            None => Some(0x0f),
        }
    };

    if mcc.len() < 2 || mcc.len() > 3 || mnc.len() < 2 || mnc.len() > 3 {
        return None;
    }

    Some([
        semi(mcc, 1)? << 4 | semi(mcc, 0)?,
        semi(mnc, 2)? << 4 | semi(mcc, 2)?,
        semi(mnc, 1)? << 4 | semi(mnc, 0)?,
    ])
}

/// Service provider display PLMN list, sorted for lookup.
#[derive(Debug, Clone, Default)]
pub struct Spdi<const N: usize> {
    operators: Vec<(Mcc, Mnc), N>,
}

impl<const N: usize> Spdi<N> {
    /// Parses EF SPDI: a `0xA3` display information object holding a `0x80`
    /// PLMN list. Unused `FFFFFF` entries are skipped, entries beyond `N`
    /// are dropped.
    pub fn new(efspdi: &[u8]) -> Option<Self> {
        if efspdi.len() < 7 {
            return None;
        }

        let info = BerTlvIter::find_by_tag(efspdi, 0xa3)?;
        let list = BerTlvIter::find_by_tag(info, 0x80)?;

        let mut operators: Vec<(Mcc, Mnc), N> = Vec::new();
        for plmn in list.chunks_exact(3) {
            if plmn[0] & plmn[1] & plmn[2] == 0xff {
                continue;
            }

            let Some(operator) = parse_mcc_mnc(plmn) else {
                continue;
            };
            let at = operators
                .binary_search(&operator)
                .unwrap_or_else(|at| at);
            if operators.insert(at, operator).is_err() {
                break;
            }
        }

        Some(Self { operators })
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn lookup(&self, mcc: &str, mnc: &str) -> bool {
        self.operators
            .binary_search_by(|(m, n)| (m.as_str(), n.as_str()).cmp(&(mcc, mnc)))
            .is_ok()
    }
}
