//! Application templates of EF DIR (ETSI TS 102.221 13.1).

use heapless::{String, Vec};

use super::text::sim_string_to_utf8;
use super::tlv::BerTlvIter;

pub const MAX_AID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppType {
    Usim,
    Isim,
    Unknown(u16),
}

impl From<u16> for AppType {
    fn from(code: u16) -> Self {
        match code {
            0x1002 => Self::Usim,
            0x1004 => Self::Isim,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord<const L: usize> {
    pub aid: Vec<u8, MAX_AID_LEN>,
    pub label: Option<String<L>>,
    pub app_type: AppType,
}

/// Parses the `0x61` application templates of EF DIR, in file order. A
/// template without a valid AID, or whose label cannot be decoded, fails
/// the whole parse. Templates beyond `N` are dropped.
pub fn parse_app_template_entries<const N: usize, const L: usize>(
    efdir: &[u8],
) -> Option<Vec<AppRecord<L>, N>> {
    let mut apps = Vec::new();

    for template in BerTlvIter::new(efdir).filter(|tlv| tlv.short_tag() == 0x61) {
        let aid = BerTlvIter::find_by_tag(template.data, 0x4f)?;
        if aid.is_empty() || aid.len() > MAX_AID_LEN {
            return None;
        }

        let label = match BerTlvIter::find_by_tag(template.data, 0x50) {
            Some(label) => Some(sim_string_to_utf8(label)?),
            None => None,
        };

        // Application provider identifier (5 bytes), then the application code
        let app_type = match aid.get(5..7) {
            Some(code) => AppType::from(u16::from_be_bytes([code[0], code[1]])),
            None => AppType::Unknown(0),
        };

        let record = AppRecord {
            aid: Vec::from_slice(aid).ok()?,
            label,
            app_type,
        };
        if apps.push(record).is_err() {
            break;
        }
    }

    Some(apps)
}
