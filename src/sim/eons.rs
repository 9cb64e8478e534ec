//! Enhanced operator name service: EF PNN names selected through EF OPL
//! (3GPP TS 31.102 4.2.58 and 4.2.59).

use heapless::{Deque, String, Vec};

use super::plmn::{parse_mcc_mnc, Mcc, Mnc};
use super::text::{gsm_to_utf8, sim_string_to_utf8, ucs2_to_utf8, unpack_7bit};
use super::tlv::BerTlvIter;

pub const MAX_NAME_LEN: usize = 64;

pub type OperatorName = String<MAX_NAME_LEN>;

/// One EF PNN record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorInfo {
    pub long_name: Option<OperatorName>,
    /// Country initials should be appended to the long name.
    pub long_ci: bool,
    pub short_name: Option<OperatorName>,
    pub short_ci: bool,
    pub info: Option<OperatorName>,
}

#[derive(Debug, Clone)]
struct OplEntry {
    mcc: Mcc,
    mnc: Mnc,
    lac_low: u16,
    lac_high: u16,
    /// 1-based PNN record, 0 for "no name"
    id: u8,
}

impl OplEntry {
    fn parse(record: &[u8]) -> Option<Self> {
        let record = record.get(..8)?;
        let (mcc, mnc) = parse_mcc_mnc(record)?;

        Some(Self {
            mcc,
            mnc,
            lac_low: u16::from_be_bytes([record[3], record[4]]),
            lac_high: u16::from_be_bytes([record[5], record[6]]),
            id: record[7],
        })
    }

    fn covers_all_areas(&self) -> bool {
        self.lac_low == 0 && self.lac_high == 0xfffe
    }

    fn matches(&self, mcc: &str, mnc: &str, lac: Option<u16>) -> bool {
        if !digits_match(&self.mcc, mcc) || !digits_match(&self.mnc, mnc) {
            return false;
        }

        if self.covers_all_areas() {
            return true;
        }

        lac.is_some_and(|lac| (self.lac_low..=self.lac_high).contains(&lac))
    }
}

/// Compares PLMN digits, `b` in the pattern matches any digit but not an
/// absent one.
fn digits_match(pattern: &str, value: &str) -> bool {
    let (pattern, value) = (pattern.as_bytes(), value.as_bytes());
    (0..3).all(|i| match (pattern.get(i), value.get(i)) {
        (Some(b'b'), Some(_)) => true,
        (p, v) => p == v,
    })
}

/// Decodes a network name element (3GPP TS 24.008 10.5.3.5a): a coding
/// octet followed by the text. Returns the name and the "add country
/// initials" flag.
fn parse_network_name(buf: &[u8]) -> Option<(OperatorName, bool)> {
    if buf.len() < 2 {
        return None;
    }

    let (&dcs, text) = buf.split_first()?;
    let ci = dcs & 0x08 != 0;

    let name = match dcs & 0x70 {
        0x00 => {
            let spare_bits = (dcs & 0x07) as usize;
            let chars = (text.len() * 8).checked_sub(spare_bits)? / 7;
            let codes: Vec<u8, MAX_NAME_LEN> = unpack_7bit(text, chars)?;
            gsm_to_utf8(&codes, None)?
        }
        0x10 => {
            let text = match text.len() % 2 {
                0 => text,
                _ if text.last() == Some(&0xff) => &text[..text.len() - 1],
                _ => return None,
            };
            ucs2_to_utf8(text)?
        }
        _ => return None,
    };

    Some((name, ci))
}

/// PNN table of at most `P` records and an OPL list of at most `O`
/// entries.
///
/// OPL records are prepended while loading; call [`Eons::optimize`] once
/// all of them are in so lookups walk them in file order.
#[derive(Debug, Clone)]
pub struct Eons<const P: usize, const O: usize> {
    pnn: Vec<OperatorInfo, P>,
    opl: Deque<OplEntry, O>,
    pnn_valid: bool,
}

impl<const P: usize, const O: usize> Eons<P, O> {
    /// Creates a resolver for a PNN file of `pnn_records` records, capped
    /// at `P`.
    pub fn new(pnn_records: usize) -> Self {
        let mut pnn = Vec::new();
        pnn.resize_default(pnn_records.min(P)).ok();

        Self {
            pnn,
            opl: Deque::new(),
            pnn_valid: false,
        }
    }

    /// True until a PNN record with a long name has been added.
    pub fn pnn_is_empty(&self) -> bool {
        !self.pnn_valid
    }

    /// Stores PNN record number `record` (1-based). Records without a long
    /// name leave the slot empty.
    pub fn add_pnn_record(&mut self, record: usize, tlv: &[u8]) {
        let Some(slot) = record.checked_sub(1).and_then(|i| self.pnn.get_mut(i)) else {
            return;
        };
        *slot = OperatorInfo::default();

        let Some(long) = BerTlvIter::find_by_tag(tlv, 0x43).filter(|n| !n.is_empty()) else {
            return;
        };
        if let Some((name, ci)) = parse_network_name(long) {
            slot.long_name = Some(name);
            slot.long_ci = ci;
        }

        if let Some(short) = BerTlvIter::find_by_tag(tlv, 0x45).filter(|n| !n.is_empty()) {
            if let Some((name, ci)) = parse_network_name(short) {
                slot.short_name = Some(name);
                slot.short_ci = ci;
            }
        }

        if let Some(info) = BerTlvIter::find_by_tag(tlv, 0x80).filter(|n| !n.is_empty()) {
            slot.info = sim_string_to_utf8(info);
        }

        self.pnn_valid = true;
    }

    /// Adds an 8 byte OPL record. Records pointing past the PNN table, or
    /// arriving once the list is full, are discarded and `false` returned.
    pub fn add_opl_record(&mut self, record: &[u8]) -> bool {
        let Some(entry) = OplEntry::parse(record) else {
            return false;
        };

        if entry.id as usize > self.pnn.len() {
            return false;
        }

        self.opl.push_front(entry).is_ok()
    }

    /// Puts the OPL list back into file order after loading.
    pub fn optimize(&mut self) {
        let mut reversed = Deque::new();
        while let Some(entry) = self.opl.pop_front() {
            // Both deques hold `O` entries and `reversed` only receives what
            // `self.opl` gives up, so it never fills
            reversed.push_front(entry).ok();
        }
        self.opl = reversed;
    }

    fn lookup_common(&self, mcc: &str, mnc: &str, lac: Option<u16>) -> Option<&OperatorInfo> {
        let entry = self.opl.iter().find(|opl| opl.matches(mcc, mnc, lac))?;

        match entry.id {
            0 => None,
            id => self.pnn.get(id as usize - 1),
        }
    }

    /// Resolves the name of a PLMN regardless of location. Only OPL entries
    /// covering every location area apply.
    pub fn lookup(&self, mcc: &str, mnc: &str) -> Option<&OperatorInfo> {
        self.lookup_common(mcc, mnc, None)
    }

    pub fn lookup_with_lac(&self, mcc: &str, mnc: &str, lac: u16) -> Option<&OperatorInfo> {
        self.lookup_common(mcc, mnc, Some(lac))
    }
}
