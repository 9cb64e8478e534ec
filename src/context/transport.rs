//! The data link nested inside an enabled context.

use heapless::String;
use no_std_net::Ipv4Addr;

use crate::command::psn::types::{AuthMethod, MAX_CREDENTIAL_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportKind {
    /// PPP on the data channel, addresses negotiated by IPCP
    Ppp,
    /// Raw IP frames on the data channel, addresses read from the modem
    RawIp,
}

/// Authentication protocol PPP should negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PppAuth {
    Chap,
    Pap,
}

impl From<AuthMethod> for PppAuth {
    fn from(method: AuthMethod) -> Self {
        match method {
            AuthMethod::Pap => Self::Pap,
            AuthMethod::Any | AuthMethod::Chap | AuthMethod::None => Self::Chap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportAuth {
    pub method: PppAuth,
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
}

/// Reported by the transport once the link is up.
///
/// A raw-IP link only knows its interface; the remaining fields are
/// filled in by PPP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConnected<'a> {
    pub interface: &'a str,
    pub local: Option<Ipv4Addr>,
    pub remote: Option<Ipv4Addr>,
    pub dns: [Option<Ipv4Addr>; 2],
}

impl<'a> TransportConnected<'a> {
    pub fn raw_ip(interface: &'a str) -> Self {
        Self {
            interface,
            local: None,
            remote: None,
            dns: [None, None],
        }
    }
}

/// Why the transport went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisconnectReason {
    Unknown,
    AuthFailed,
    IpcpFailed,
    NetworkFailed,
    PeerClosed,
    LinkDead,
    LocalClosed,
}
