//! Unsolicited responses for Packet Switched Data Services Commands
use super::types::ContextId;
use crate::command::result::ResultIter;

/// 10.1.19 Packet domain event reporting +CGEV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketSwitchedEvent {
    /// `NW DEACT <PDP_type>,<PDP_addr>[,<cid>]`
    NetworkDeactivated(Option<ContextId>),
    /// `ME DEACT <PDP_type>,<PDP_addr>[,<cid>]`
    MobileDeactivated(Option<ContextId>),
    NetworkPdnDeactivated(ContextId),
    MobilePdnDeactivated(ContextId),
    NetworkDetach,
    MobileDetach,
    NetworkPdnActivated(ContextId),
    MobilePdnActivated(ContextId),
    /// Dedicated bearer set up by the network: `NW ACT <p_cid>,<cid>,<event_type>`
    NetworkActivated { primary: ContextId, cid: ContextId },
}

fn cid_after(event: &str, prefix: &str) -> Option<ContextId> {
    let rest = event.strip_prefix(prefix)?;
    rest.split_ascii_whitespace()
        .next()?
        .parse()
        .ok()
        .map(ContextId)
}

fn next_cid(iter: &mut ResultIter<'_>) -> Option<ContextId> {
    iter.next_number()
        .and_then(|cid| u8::try_from(cid).ok())
        .map(ContextId)
}

impl PacketSwitchedEvent {
    pub fn parse(line: &str) -> Option<Self> {
        let mut iter = ResultIter::new(line);
        if !iter.next("+CGEV:") {
            return None;
        }
        let event = iter.next_unquoted_string()?;

        let parsed = match event {
            "NW DETACH" => Self::NetworkDetach,
            "ME DETACH" => Self::MobileDetach,
            _ if event.starts_with("NW PDN DEACT") => {
                Self::NetworkPdnDeactivated(cid_after(event, "NW PDN DEACT")?)
            }
            _ if event.starts_with("ME PDN DEACT") => {
                Self::MobilePdnDeactivated(cid_after(event, "ME PDN DEACT")?)
            }
            _ if event.starts_with("NW PDN ACT") => {
                Self::NetworkPdnActivated(cid_after(event, "NW PDN ACT")?)
            }
            _ if event.starts_with("ME PDN ACT") => {
                Self::MobilePdnActivated(cid_after(event, "ME PDN ACT")?)
            }
            _ if event.starts_with("NW ACT") => Self::NetworkActivated {
                primary: cid_after(event, "NW ACT")?,
                cid: next_cid(&mut iter)?,
            },
            _ if event.starts_with("NW DEACT") => {
                let cid = if iter.skip_next() { next_cid(&mut iter) } else { None };
                Self::NetworkDeactivated(cid)
            }
            _ if event.starts_with("ME DEACT") => {
                let cid = if iter.skip_next() { next_cid(&mut iter) } else { None };
                Self::MobileDeactivated(cid)
            }
            _ => return None,
        };

        Some(parsed)
    }

    /// Context torn down by the network, if any.
    pub fn network_deactivated_cid(&self) -> Option<ContextId> {
        match self {
            Self::NetworkDeactivated(cid) => *cid,
            Self::NetworkPdnDeactivated(cid) => Some(*cid),
            _ => None,
        }
    }
}

/// Data transfer status +XDATASTAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataStatus {
    Suspended,
    Resumed,
}

impl DataStatus {
    /// Lines whose status is missing or unknown are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let mut iter = ResultIter::new(line);
        if !iter.next("+XDATASTAT:") {
            return None;
        }

        match iter.next_number()? {
            0 => Some(Self::Suspended),
            1 => Some(Self::Resumed),
            _ => None,
        }
    }
}
