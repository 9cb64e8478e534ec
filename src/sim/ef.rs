//! Elementary file database and SELECT / GET RESPONSE decoding.

use heapless::Vec;

use super::tlv::BerTlvIter;

/// Master file, root of every path.
pub const ROOT_MF: u16 = 0x3f00;
/// Longest path the database produces, in bytes.
pub const EF_PATH_LEN: usize = 6;

pub type EfPath = Vec<u8, EF_PATH_LEN>;

pub const EFPNN_FILEID: u16 = 0x6fc5;
pub const EFOPL_FILEID: u16 = 0x6fc6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FileKind {
    Master,
    Dedicated,
    Elementary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Structure {
    Transparent = 0,
    LinearFixed = 1,
    Cyclic = 3,
}

impl Structure {
    fn from_2g(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Transparent),
            0x01 => Some(Self::LinearFixed),
            0x03 => Some(Self::Cyclic),
            _ => None,
        }
    }
}

/// Access condition levels, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    Always = 0,
    Pin = 1,
    Pin2 = 2,
    Admin = 4,
    Never = 15,
}

impl Access {
    /// Decodes an access condition nibble. Reserved and administrative
    /// values 3..=14 all require the administrative key.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0f {
            0 => Self::Always,
            1 => Self::Pin,
            2 => Self::Pin2,
            15 => Self::Never,
            _ => Self::Admin,
        }
    }

    /// Whether the condition is met once `unlocked` has been verified.
    pub fn allows(self, unlocked: Access) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            _ => unlocked != Self::Never && unlocked >= self,
        }
    }
}

/// The three access condition bytes of a 2G response (3GPP TS 51.011 9.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccessConditions(pub [u8; 3]);

impl AccessConditions {
    pub fn read(&self) -> Access {
        Access::from_nibble(self.0[0] >> 4)
    }

    pub fn update(&self) -> Access {
        Access::from_nibble(self.0[0])
    }

    pub fn increase(&self) -> Access {
        Access::from_nibble(self.0[1] >> 4)
    }

    pub fn rehabilitate(&self) -> Access {
        Access::from_nibble(self.0[2] >> 4)
    }

    pub fn invalidate(&self) -> Access {
        Access::from_nibble(self.0[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfInfo {
    pub id: u16,
    pub parent_2g: u16,
    pub parent_3g: u16,
    pub kind: FileKind,
    pub structure: Structure,
    /// Fixed size of the file, 0 when it varies between cards.
    pub size: u8,
    pub read: Access,
    pub update: Access,
}

const fn ef(
    id: u16,
    parent_2g: u16,
    parent_3g: u16,
    structure: Structure,
    size: u8,
    read: Access,
    update: Access,
) -> EfInfo {
    EfInfo {
        id,
        parent_2g,
        parent_3g,
        kind: FileKind::Elementary,
        structure,
        size,
        read,
        update,
    }
}

const fn df(id: u16, parent_2g: u16, parent_3g: u16, read: Access, update: Access) -> EfInfo {
    EfInfo {
        id,
        parent_2g,
        parent_3g,
        kind: FileKind::Dedicated,
        structure: Structure::Transparent,
        size: 0,
        read,
        update,
    }
}

use Access::{Admin as ADM, Always as ALW, Never as NEV, Pin as PIN, Pin2 as PIN2};
use Structure::{LinearFixed as RECORD, Transparent as BINARY};

/// Sorted by id. A parent of 0 means the file does not exist in that mode.
#[rustfmt::skip]
static EF_DB: [EfInfo; 40] = [
    ef(0x2f05, ROOT_MF, ROOT_MF, BINARY, 0, ALW, PIN),
    ef(0x2fe2, ROOT_MF, ROOT_MF, BINARY, 10, ALW, NEV),
    ef(0x4f20, 0x5f50, 0x5f50, BINARY, 0, PIN, ADM),
    df(0x5f50, 0x7f10, 0x7f10, PIN, ADM),
    ef(0x6f05, 0x7f20, 0x7fff, BINARY, 0, ALW, PIN),
    ef(0x6f07, 0x7f20, 0x7fff, BINARY, 9, PIN, ADM),
    ef(0x6f11, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN),
    ef(0x6f13, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN),
    ef(0x6f14, 0x7f20, 0x7fff, BINARY, 0, PIN, ADM),
    ef(0x6f15, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN),
    ef(0x6f16, 0x7f20, 0x7fff, BINARY, 0, PIN, ADM),
    ef(0x6f17, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6f18, 0x7f20, 0x7fff, BINARY, 10, PIN, ADM),
    ef(0x6f19, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6f38, 0x7f20, 0x7fff, BINARY, 0, PIN, ADM),
    ef(0x6f3a, 0x7f10, 0x7f10, RECORD, 0, PIN, PIN),
    ef(0x6f3b, 0x7f10, 0x7fff, RECORD, 0, PIN, PIN2),
    ef(0x6f40, 0x7f10, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6f45, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN),
    ef(0x6f46, 0x7f20, 0x7fff, BINARY, 17, ALW, ADM),
    ef(0x6f48, 0x7f20, 0x7fff, BINARY, 0, PIN, ADM),
    ef(0x6f49, 0x7f10, 0x7fff, RECORD, 0, PIN, ADM),
    ef(0x6f4d, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN2),
    ef(0x6f50, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN),
    ef(0x6f56, 0x0000, 0x7fff, BINARY, 0, PIN, PIN2),
    ef(0x6f57, 0x7f20, 0x7fff, BINARY, 0, PIN, PIN2),
    ef(0x6fad, 0x7f20, 0x7fff, BINARY, 0, ALW, ADM),
    ef(0x6fae, 0x7f20, 0x0000, BINARY, 1, ALW, ADM),
    ef(0x6fb7, 0x7f20, 0x7fff, BINARY, 0, ALW, ADM),
    ef(0x6fc5, 0x7f20, 0x7fff, RECORD, 0, ALW, ADM),
    ef(0x6fc6, 0x7f20, 0x7fff, RECORD, 0, ALW, ADM),
    ef(0x6fc7, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6fc9, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6fca, 0x7f20, 0x7fff, RECORD, 0, PIN, PIN),
    ef(0x6fcb, 0x7f20, 0x7fff, RECORD, 16, PIN, PIN),
    ef(0x6fcd, 0x7f20, 0x7fff, BINARY, 0, PIN, ADM),
    ef(0x6fde, 0x7f20, 0x7fff, BINARY, 0, ALW, ADM),
    df(0x7f10, ROOT_MF, ROOT_MF, ALW, ALW),
    df(0x7f20, ROOT_MF, ROOT_MF, ALW, ALW),
    df(0x7fff, 0x0000, ROOT_MF, ALW, ALW),
];

/// Looks up a file by identifier.
pub fn lookup(id: u16) -> Option<&'static EfInfo> {
    EF_DB
        .binary_search_by_key(&id, |info| info.id)
        .ok()
        .map(|i| &EF_DB[i])
}

pub fn is_known(id: u16) -> bool {
    lookup(id).is_some()
}

fn path(id: u16, parent: impl Fn(&EfInfo) -> u16) -> Option<EfPath> {
    let mut parents: Vec<u16, { EF_PATH_LEN / 2 }> = Vec::new();

    let mut info = lookup(id)?;
    loop {
        let up = parent(info);
        parents.push(up).ok()?;
        if up == ROOT_MF {
            break;
        }
        info = lookup(up)?;
    }

    let mut out = EfPath::new();
    for id in parents.iter().rev() {
        out.extend_from_slice(&id.to_be_bytes()).ok()?;
    }
    Some(out)
}

/// Path from the MF to the directory holding `id` on a 2G SIM.
pub fn path_2g(id: u16) -> Option<EfPath> {
    path(id, |info| info.parent_2g)
}

/// Path from the MF to the directory holding `id` on a UICC.
pub fn path_3g(id: u16) -> Option<EfPath> {
    path(id, |info| info.parent_3g)
}

/// File characteristics decoded from a SELECT or GET RESPONSE answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub file_len: usize,
    /// Record length, 0 for transparent files.
    pub record_len: usize,
    pub structure: Structure,
    pub access: AccessConditions,
    /// File identifier, only carried by the 3G answer.
    pub file_id: Option<u16>,
    /// File status byte, only carried by the 2G answer.
    pub status: Option<u8>,
}

/// Decodes a UICC FCP template (ETSI TS 102.221 11.1.1.3).
///
/// The answer references EF ARR instead of carrying the security
/// attributes, so read/update conditions are taken from the file database,
/// with PIN/PIN assumed for files it does not know.
pub fn parse_3g_get_response(response: &[u8]) -> Option<FileInfo> {
    let fcp = BerTlvIter::find_by_tag(response, 0x62)?;

    let size = BerTlvIter::find_by_tag(fcp, 0x80).filter(|tlv| tlv.len() >= 2)?;
    let file_len = size.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);

    let id = BerTlvIter::find_by_tag(fcp, 0x83).filter(|tlv| tlv.len() == 2)?;
    let file_id = u16::from_be_bytes([id[0], id[1]]);

    let descriptor =
        BerTlvIter::find_by_tag(fcp, 0x82).filter(|tlv| tlv.len() == 2 || tlv.len() == 5)?;
    if descriptor[1] != 0x21 {
        return None;
    }

    let structure = match descriptor[0] & 0x07 {
        1 => Structure::Transparent,
        2 => Structure::LinearFixed,
        6 => Structure::Cyclic,
        _ => return None,
    };

    // Record based files carry record length and count
    let record_len = match structure {
        Structure::Transparent => 0,
        _ if descriptor.len() != 5 => return None,
        _ => descriptor[3] as usize,
    };

    let read_update = match lookup(file_id) {
        Some(info) => (info.read as u8) << 4 | info.update as u8,
        None => 0x11,
    };
    let increase = match structure {
        Structure::Cyclic => 0x1f,
        _ => 0xff,
    };

    Some(FileInfo {
        file_len,
        record_len,
        structure,
        access: AccessConditions([read_update, increase, 0x44]),
        file_id: Some(file_id),
        status: None,
    })
}

/// Decodes a 2G GET RESPONSE answer for an EF (3GPP TS 51.011 9.2.1).
pub fn parse_2g_get_response(response: &[u8]) -> Option<FileInfo> {
    if response.len() < 14 || response[6] != 0x04 {
        return None;
    }

    let structure = Structure::from_2g(response[13])?;
    let record_len = match structure {
        Structure::Transparent => 0,
        _ => *response.get(14)? as usize,
    };

    Some(FileInfo {
        file_len: u16::from_be_bytes([response[2], response[3]]) as usize,
        record_len,
        structure,
        access: AccessConditions([response[8], response[9], response[10]]),
        file_id: None,
        status: Some(response[11]),
    })
}
