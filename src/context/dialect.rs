//! Vendor dialects of the context activation sequence.
//!
//! Every supported modem family is one entry of a static table, looked up
//! by name when the modem driver is probed. A dialect only selects the
//! wire encoding; the state machine in [`super::ContextEngine`] is shared.

use crate::command::psn::types::PdpType;

use super::transport::TransportKind;

/// How the data session is started on PPP dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DialMode {
    /// `ATD*99***<cid>#`
    Atd,
    /// `AT+CGDATA="PPP",<cid>`
    Cgdata,
}

/// How the IP configuration is read on raw-IP dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsQuery {
    /// `+CGPADDR` followed by `+XDNS?`
    AddressAndDns,
    /// `+CGCONTRDP`
    DynamicParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Family {
    /// Define, dial, then let PPP bring the context up
    Ppp { dial: DialMode, apn_auth_prefix: bool },
    /// Define, authenticate, activate, read settings, then enter raw IP
    RawIp { settings: SettingsQuery },
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dialect {
    pub name: &'static str,
    pub family: Family,
}

pub static ATMODEM: Dialect = Dialect {
    name: "atmodem",
    family: Family::Ppp {
        dial: DialMode::Atd,
        apn_auth_prefix: false,
    },
};

pub static UBLOX: Dialect = Dialect {
    name: "ublox",
    family: Family::Ppp {
        dial: DialMode::Atd,
        apn_auth_prefix: true,
    },
};

pub static IFXMODEM: Dialect = Dialect {
    name: "ifxmodem",
    family: Family::RawIp {
        settings: SettingsQuery::AddressAndDns,
    },
};

pub static XMM7MODEM: Dialect = Dialect {
    name: "xmm7modem",
    family: Family::RawIp {
        settings: SettingsQuery::DynamicParams,
    },
};

static DIALECTS: [&Dialect; 4] = [&ATMODEM, &UBLOX, &IFXMODEM, &XMM7MODEM];

impl Dialect {
    pub fn from_name(name: &str) -> Option<&'static Dialect> {
        DIALECTS.iter().copied().find(|d| d.name == name)
    }

    pub fn all() -> impl Iterator<Item = &'static Dialect> {
        DIALECTS.iter().copied()
    }

    pub fn transport(&self) -> TransportKind {
        match self.family {
            Family::Ppp { .. } => TransportKind::Ppp,
            Family::RawIp { .. } => TransportKind::RawIp,
        }
    }

    /// PPP links only carry IPv4.
    pub fn supports(&self, pdp_type: PdpType) -> bool {
        match self.family {
            Family::Ppp { .. } => pdp_type == PdpType::Ipv4,
            Family::RawIp { .. } => true,
        }
    }

    /// Whether the context has to be deactivated with `+CGACT=0` once
    /// its transport is down.
    pub fn needs_explicit_deactivation(&self) -> bool {
        matches!(self.family, Family::RawIp { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry() {
        assert_eq!(Dialect::from_name("ublox"), Some(&UBLOX));
        assert_eq!(Dialect::from_name("xmm7modem"), Some(&XMM7MODEM));
        assert_eq!(Dialect::from_name("qmimodem"), None);
        assert_eq!(Dialect::all().count(), 4);
    }

    #[test]
    fn families() {
        assert_eq!(ATMODEM.transport(), TransportKind::Ppp);
        assert!(ATMODEM.supports(PdpType::Ipv4));
        assert!(!ATMODEM.supports(PdpType::Ipv6));
        assert!(!UBLOX.supports(PdpType::Ipv4v6));
        assert!(!UBLOX.needs_explicit_deactivation());

        assert_eq!(IFXMODEM.transport(), TransportKind::RawIp);
        assert!(IFXMODEM.supports(PdpType::Ipv4v6));
        assert!(XMM7MODEM.needs_explicit_deactivation());
    }
}
