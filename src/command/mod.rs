//! AT commands issued by the context engine, and decoding of their
//! results.

pub mod error;
pub mod psn;
pub mod result;

use atat::atat_derive::AtatResp;
use atat::AtatCmd;
use embassy_time::Duration;

use psn::{
    EnterDataState, EnterPPP, GetDnsConfig, GetDynamicParams, GetPDPAddress, SetPDPContextDefinition,
    SetPDPContextState, SetXdns, SetXgauth,
};

#[derive(Debug, Clone, AtatResp)]
pub struct NoResponse;

/// Any command the context engine can hand to its channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    DefineContext(SetPDPContextDefinition),
    Authenticate(SetXgauth),
    RequestDns(SetXdns),
    SetContextState(SetPDPContextState),
    Dial(EnterPPP),
    EnterDataState(EnterDataState),
    GetAddress(GetPDPAddress),
    GetDns(GetDnsConfig),
    GetDynamicParams(GetDynamicParams),
}

impl Command {
    /// Serializes the command line into `buf`, returning its length.
    pub fn write(&self, buf: &mut [u8]) -> usize {
        match self {
            Self::DefineContext(cmd) => cmd.write(buf),
            Self::Authenticate(cmd) => cmd.write(buf),
            Self::RequestDns(cmd) => cmd.write(buf),
            Self::SetContextState(cmd) => cmd.write(buf),
            Self::Dial(cmd) => cmd.write(buf),
            Self::EnterDataState(cmd) => cmd.write(buf),
            Self::GetAddress(cmd) => cmd.write(buf),
            Self::GetDns(cmd) => cmd.write(buf),
            Self::GetDynamicParams(cmd) => cmd.write(buf),
        }
    }

    /// How long the channel should wait for the final result code.
    pub fn timeout(&self) -> Duration {
        let ms = match self {
            Self::DefineContext(_) => SetPDPContextDefinition::MAX_TIMEOUT_MS,
            Self::Authenticate(_) => SetXgauth::MAX_TIMEOUT_MS,
            Self::RequestDns(_) => SetXdns::MAX_TIMEOUT_MS,
            Self::SetContextState(_) => SetPDPContextState::MAX_TIMEOUT_MS,
            Self::Dial(_) => EnterPPP::MAX_TIMEOUT_MS,
            Self::EnterDataState(_) => EnterDataState::MAX_TIMEOUT_MS,
            Self::GetAddress(_) => GetPDPAddress::MAX_TIMEOUT_MS,
            Self::GetDns(_) => GetDnsConfig::MAX_TIMEOUT_MS,
            Self::GetDynamicParams(_) => GetDynamicParams::MAX_TIMEOUT_MS,
        };
        Duration::from_millis(ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::psn::types::{ContextId, PDPContextStatus};
    use super::*;

    #[test]
    fn timeouts() {
        let activate = Command::SetContextState(SetPDPContextState {
            status: PDPContextStatus::Activated,
            cid: Some(ContextId(1)),
        });
        assert_eq!(activate.timeout(), Duration::from_secs(150));

        let dial = Command::Dial(EnterPPP { cid: ContextId(1) });
        assert_eq!(dial.timeout(), Duration::from_secs(180));

        let mut buf = [0u8; 32];
        let len = dial.write(&mut buf);
        assert!(buf[..len].starts_with(b"ATD*99***1#"));
    }
}
