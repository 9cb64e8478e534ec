use atat::atat_derive::{AtatEnum, AtatLen};
use serde::{Deserialize, Serialize};

/// Longest APN accepted for a context.
pub const MAX_APN_LEN: usize = 100;
/// APN field of `+CGDCONT`, room for a vendor auth prefix.
pub const APN_FIELD_LEN: usize = MAX_APN_LEN + 5;
pub const MAX_CREDENTIAL_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AtatLen)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PDPContextStatus {
    Deactivated = 0,
    Activated = 1,
}

/// Packet data protocol of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdpType {
    Ipv4,
    Ipv6,
    Ipv4v6,
}

impl PdpType {
    /// `<PDP_type>` string of `+CGDCONT`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ipv4 => "IP",
            Self::Ipv6 => "IPV6",
            Self::Ipv4v6 => "IPV4V6",
        }
    }
}

/// Authentication requested for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthMethod {
    #[default]
    Any,
    Chap,
    Pap,
    None,
}

/// `<auth_type>` of `+XGAUTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XgauthType {
    None = 0,
    Pap = 1,
    Chap = 2,
}

/// `<onoff>` of `+XDNS`: which DNS servers to request during activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DnsRequest {
    Disabled = 0,
    Ipv4 = 1,
    Ipv6 = 2,
    Ipv4v6 = 3,
}

impl From<PdpType> for DnsRequest {
    fn from(pdp_type: PdpType) -> Self {
        match pdp_type {
            PdpType::Ipv4 => Self::Ipv4,
            PdpType::Ipv6 => Self::Ipv6,
            PdpType::Ipv4v6 => Self::Ipv4v6,
        }
    }
}

/// Layer 2 protocol of `+CGDATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum L2Protocol {
    Ppp,
    RawIp,
}

impl L2Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ppp => "PPP",
            Self::RawIp => "M-RAW_IP",
        }
    }
}
