//! ### Packet Domain commands (3GPP TS 27.007 section 10)
//!
//! Commands used to define a PDP context, activate it, and move the
//! channel into online data state for PPP or raw IP. The `+XGAUTH`,
//! `+XDNS` and `+CGDATA="M-RAW_IP"` forms are the Intel/XMM vendor
//! extensions.

pub mod types;
pub mod urc;

use atat::atat_derive::AtatCmd;
use heapless::String;
use types::{
    ContextId, DnsRequest, PDPContextStatus, XgauthType, APN_FIELD_LEN, MAX_CREDENTIAL_LEN,
};

use super::NoResponse;

/// 10.1.1 Define PDP context +CGDCONT
///
/// Specifies the PDP context parameters for the context identified by
/// `<cid>`. The APN may carry a vendor specific authentication prefix
/// (`CHAP:` or `PAP:` on u-blox modules).
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetPDPContextDefinition {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'static str,
    #[at_arg(position = 2)]
    pub apn: String<APN_FIELD_LEN>,
}

/// PDP context authentication parameters +XGAUTH
///
/// Stores the user name and password used while activating `<cid>`.
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+XGAUTH", NoResponse)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetXgauth {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    pub auth: XgauthType,
    #[at_arg(position = 2)]
    pub username: String<MAX_CREDENTIAL_LEN>,
    #[at_arg(position = 3)]
    pub password: String<MAX_CREDENTIAL_LEN>,
}

/// Dynamic DNS request +XDNS
///
/// Requests DNS server addresses from the network during activation of
/// `<cid>`.
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+XDNS", NoResponse)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetXdns {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    pub request: DnsRequest,
}

/// 10.1.10 PDP context activate or deactivate +CGACT
///
/// If the MT is not attached when activation is requested, it first
/// performs an attach. Activation may take up to 150 s.
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd(
    "+CGACT",
    NoResponse,
    attempts = 1,
    timeout_ms = 150000,
    abortable = true
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetPDPContextState {
    #[at_arg(position = 0)]
    pub status: PDPContextStatus,
    #[at_arg(position = 1)]
    pub cid: Option<ContextId>,
}

/// 10.2.1.1 Request packet domain service 'D'
///
/// `ATD*99***<cid>#` performs the actions needed to reach the external
/// network and starts PPP on the channel once `CONNECT` is returned.
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd(
    "D*99***",
    NoResponse,
    value_sep = false,
    timeout_ms = 180000,
    abortable = true,
    termination = "#\r\n"
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnterPPP {
    #[at_arg(position = 0)]
    pub cid: ContextId,
}

/// 10.1.12 Enter data state +CGDATA
///
/// Switches the channel to online data state using layer 2 protocol
/// `<L2P>`, `"PPP"` or the vendor `"M-RAW_IP"`.
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+CGDATA", NoResponse, attempts = 1, timeout_ms = 180000)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnterDataState {
    #[at_arg(position = 0, len = 8)]
    pub l2p: &'static str,
    #[at_arg(position = 1)]
    pub cid: ContextId,
}

/// 10.1.14 Show PDP address +CGPADDR
///
/// The address lines are decoded by
/// [`parse_cgpaddr`](crate::context::settings::parse_cgpaddr).
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+CGPADDR", NoResponse)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetPDPAddress {
    #[at_arg(position = 0)]
    pub cid: ContextId,
}

/// Read negotiated DNS servers +XDNS?, decoded by
/// [`parse_xdns`](crate::context::settings::parse_xdns).
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+XDNS?", NoResponse, value_sep = false)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetDnsConfig;

/// 10.1.23 PDP context read dynamic parameters +CGCONTRDP
///
/// Modems leave fields empty (`,,`) in these lines, so they are decoded by
/// [`parse_cgcontrdp`](crate::context::settings::parse_cgcontrdp).
#[derive(Debug, Clone, PartialEq, AtatCmd)]
#[at_cmd("+CGCONTRDP", NoResponse)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetDynamicParams {
    #[at_arg(position = 0)]
    pub cid: ContextId,
}
