use heapless::String;

use crate::command::psn::types::{
    AuthMethod, ContextId, PdpType, MAX_APN_LEN, MAX_CREDENTIAL_LEN,
};
use crate::context::dialect::{Dialect, DialMode, Family};
use crate::error::{Error, GenericError};

pub const MAX_INTERFACE_LEN: usize = 16;

/// Per modem settings of the context engine.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub dialect: &'static Dialect,
    pub dial_mode: Option<DialMode>,
    pub apn_auth_prefix: Option<bool>,
    pub interface: String<MAX_INTERFACE_LEN>,
}

impl ContextConfig {
    pub fn new(dialect: &'static Dialect) -> Self {
        let mut interface = String::new();
        interface.push_str("wwan0").ok();

        Self {
            dialect,
            dial_mode: None,
            apn_auth_prefix: None,
            interface,
        }
    }

    /// Overrides how PPP dialects start the data session.
    pub fn dial_mode(mut self, mode: DialMode) -> Self {
        self.dial_mode = Some(mode);
        self
    }

    /// Overrides whether the APN carries a `CHAP:`/`PAP:` prefix.
    pub fn apn_auth_prefix(mut self, enabled: bool) -> Self {
        self.apn_auth_prefix = Some(enabled);
        self
    }

    /// Interface reported when the raw-IP transport does not name one.
    pub fn interface(mut self, name: &str) -> Result<Self, Error> {
        self.interface = String::try_from(name).map_err(|_| GenericError::Overflow)?;
        Ok(self)
    }

    pub(crate) fn effective_dial_mode(&self) -> DialMode {
        match (self.dial_mode, self.dialect.family) {
            (Some(mode), _) => mode,
            (None, Family::Ppp { dial, .. }) => dial,
            (None, Family::RawIp { .. }) => DialMode::Cgdata,
        }
    }

    pub(crate) fn uses_apn_auth_prefix(&self) -> bool {
        match (self.apn_auth_prefix, self.dialect.family) {
            (Some(enabled), _) => enabled,
            (None, Family::Ppp { apn_auth_prefix, .. }) => apn_auth_prefix,
            (None, Family::RawIp { .. }) => false,
        }
    }
}

/// A primary context as requested by the layer above.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PrimaryContext {
    pub cid: ContextId,
    pub pdp_type: PdpType,
    pub apn: String<MAX_APN_LEN>,
    pub username: String<MAX_CREDENTIAL_LEN>,
    pub password: String<MAX_CREDENTIAL_LEN>,
    pub auth: AuthMethod,
}

impl PrimaryContext {
    pub fn new(cid: ContextId, apn: &str) -> Result<Self, Error> {
        Ok(Self {
            cid,
            pdp_type: PdpType::Ipv4,
            apn: String::try_from(apn).map_err(|_| GenericError::Overflow)?,
            username: String::new(),
            password: String::new(),
            auth: AuthMethod::default(),
        })
    }

    pub fn pdp_type(mut self, pdp_type: PdpType) -> Self {
        self.pdp_type = pdp_type;
        self
    }

    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Result<Self, Error> {
        self.username = String::try_from(username).map_err(|_| GenericError::Overflow)?;
        self.password = String::try_from(password).map_err(|_| GenericError::Overflow)?;
        Ok(self)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}
