//! ### Packet data context activation
//!
//! [`ContextEngine`] drives one primary PDP context through
//! `Idle -> Enabling -> Active -> Disabling -> Idle`. It issues AT commands
//! through a [`ContextChannel`], is fed their results in issue order, and
//! reports outcomes and the negotiated IP configuration to a
//! [`ContextListener`].
//!
//! The engine never blocks. Every entry point runs to completion and
//! either issues the next command or waits for the next event: a command
//! result, an unsolicited line, or a transport state change.
//!
//! ```text
//! PPP family:     CGDCONT -> ATD*99 / CGDATA="PPP" -> PPP up
//! raw-IP family:  CGDCONT -> XGAUTH -> XDNS -> CGACT=1 -> settings
//!                         -> CGDATA="M-RAW_IP" -> link up
//! ```

pub mod dialect;
pub mod events;
pub mod settings;
pub mod transport;

use heapless::{Deque, String};
use no_std_net::{Ipv4Addr, Ipv6Addr};

use crate::command::psn::types::{
    AuthMethod, ContextId, DnsRequest, L2Protocol, PDPContextStatus, XgauthType, APN_FIELD_LEN,
};
use crate::command::psn::urc::{DataStatus, PacketSwitchedEvent};
use crate::command::psn::{
    EnterDataState, EnterPPP, GetDnsConfig, GetDynamicParams, GetPDPAddress,
    SetPDPContextDefinition, SetPDPContextState, SetXdns, SetXgauth,
};
use crate::command::Command;
use crate::config::{ContextConfig, PrimaryContext};
use crate::error::{Error, GenericError};
use dialect::{DialMode, Family, SettingsQuery};
use settings::{static_netmask, ContextSettings, Ipv4Settings};
use transport::{DisconnectReason, TransportAuth, TransportConnected, TransportKind};

const MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContextState {
    Idle,
    Enabling,
    Active,
    Disabling,
}

/// Caller requested operation whose outcome is reported through
/// [`ContextListener::operation_done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    Activate,
    Deactivate,
    ReadSettings,
}

/// What the engine needs from the modem driver.
pub trait ContextChannel {
    /// Queues `command`. Its result must later be handed to
    /// [`ContextEngine::on_response`], in issue order.
    fn send(&mut self, command: Command) -> Result<(), Error>;

    /// Starts the data link on the channel that just went online.
    fn open_transport(
        &mut self,
        kind: TransportKind,
        auth: Option<&TransportAuth>,
    ) -> Result<(), Error>;

    /// Tears the data link down. Completion is reported through
    /// [`ContextEngine::on_transport_disconnected`].
    fn shutdown_transport(&mut self);
}

/// Receives outcomes and the IP configuration of the context.
///
/// The setters are called right before a successful
/// [`Operation::Activate`] or [`Operation::ReadSettings`] completes.
pub trait ContextListener {
    fn set_interface(&mut self, name: &str);
    fn set_ipv4_address(&mut self, address: Ipv4Addr, is_static: bool);
    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr);
    fn set_ipv4_gateway(&mut self, _gateway: Ipv4Addr) {}
    fn set_ipv4_dns_servers(&mut self, servers: &[Ipv4Addr]);
    fn set_ipv6_address(&mut self, _address: Ipv6Addr) {}
    fn set_ipv6_prefix_length(&mut self, _length: u8) {}
    fn set_ipv6_gateway(&mut self, _gateway: Ipv6Addr) {}
    fn set_ipv6_dns_servers(&mut self, _servers: &[Ipv6Addr]) {}

    fn operation_done(&mut self, operation: Operation, result: Result<(), Error>);

    /// The context went down without being asked to.
    fn deactivated(&mut self, cid: ContextId);

    fn detached(&mut self) {}
    fn data_status(&mut self, _status: DataStatus) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Step {
    Define,
    Authenticate,
    RequestDns,
    Activate,
    ReadAddress,
    ReadDns,
    ReadDynamicParams,
    Dial,
    EnterData,
    Deactivate,
    Cleanup,
}

struct InFlight {
    step: Step,
    generation: u8,
}

pub struct ContextEngine<C, L> {
    config: ContextConfig,
    channel: C,
    listener: L,
    state: ContextState,
    cid: Option<ContextId>,
    context: Option<PrimaryContext>,
    pending: Option<Operation>,
    /// `+CGACT=1` succeeded, or the network activated the context itself
    activated: bool,
    transport_open: bool,
    settings: ContextSettings,
    in_flight: Deque<InFlight, MAX_IN_FLIGHT>,
    generation: u8,
}

fn deactivate_command(cid: ContextId) -> Command {
    Command::SetContextState(SetPDPContextState {
        status: PDPContextStatus::Deactivated,
        cid: Some(cid),
    })
}

fn settings_query(cid: ContextId, query: SettingsQuery) -> (Step, Command) {
    match query {
        SettingsQuery::AddressAndDns => (
            Step::ReadAddress,
            Command::GetAddress(GetPDPAddress { cid }),
        ),
        SettingsQuery::DynamicParams => (
            Step::ReadDynamicParams,
            Command::GetDynamicParams(GetDynamicParams { cid }),
        ),
    }
}

impl<C, L> ContextEngine<C, L>
where
    C: ContextChannel,
    L: ContextListener,
{
    pub fn new(config: ContextConfig, channel: C, listener: L) -> Self {
        Self {
            config,
            channel,
            listener,
            state: ContextState::Idle,
            cid: None,
            context: None,
            pending: None,
            activated: false,
            transport_open: false,
            settings: ContextSettings::default(),
            in_flight: Deque::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Context currently owned by the engine.
    pub fn cid(&self) -> Option<ContextId> {
        self.cid
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Starts activating `ctx`.
    ///
    /// Returns [`Error::Busy`] if the engine is not idle. Every other
    /// outcome, including an unsupported PDP type, is reported through
    /// [`ContextListener::operation_done`].
    pub fn activate(&mut self, ctx: PrimaryContext) -> Result<(), Error> {
        if self.state != ContextState::Idle {
            return Err(Error::Busy);
        }

        if !self.config.dialect.supports(ctx.pdp_type) {
            warn!(
                "{:?} contexts are not supported by {}",
                ctx.pdp_type,
                self.config.dialect.name
            );
            self.listener
                .operation_done(Operation::Activate, Err(GenericError::Unsupported.into()));
            return Ok(());
        }

        let define = match self.define_command(&ctx) {
            Ok(define) => define,
            Err(e) => {
                self.listener.operation_done(Operation::Activate, Err(e));
                return Ok(());
            }
        };

        self.cid = Some(ctx.cid);
        self.context = Some(ctx);
        self.pending = Some(Operation::Activate);
        self.set_state(ContextState::Enabling);
        self.issue(Step::Define, Command::DefineContext(define));
        Ok(())
    }

    /// Picks up a context the network already activated and reads its
    /// configuration. Only raw-IP dialects can do this.
    pub fn read_settings(&mut self, cid: ContextId) -> Result<(), Error> {
        if self.state != ContextState::Idle {
            return Err(Error::Busy);
        }

        let Family::RawIp { settings } = self.config.dialect.family else {
            self.listener.operation_done(
                Operation::ReadSettings,
                Err(GenericError::Unsupported.into()),
            );
            return Ok(());
        };

        self.cid = Some(cid);
        self.activated = true;
        self.pending = Some(Operation::ReadSettings);
        self.set_state(ContextState::Enabling);
        let (step, command) = settings_query(cid, settings);
        self.issue(step, command);
        Ok(())
    }

    /// Deactivates `cid`. An activation still in flight completes with
    /// [`Error::Canceled`] first.
    pub fn deactivate(&mut self, cid: ContextId) -> Result<(), Error> {
        self.teardown(cid, Some(Operation::Deactivate))
    }

    /// Same as [`Self::deactivate`] without completion notification, for
    /// modem shutdown.
    pub fn detach_shutdown(&mut self, cid: ContextId) {
        if let Err(e) = self.teardown(cid, None) {
            warn!("cannot shut down context {}: {:?}", cid.0, e);
        }
    }

    /// Final result of the oldest command in flight. `info` is the
    /// information text preceding `OK`.
    pub fn on_response(&mut self, response: Result<&[u8], Error>) {
        let Some(entry) = self.in_flight.pop_front() else {
            warn!("response without a command in flight");
            return;
        };

        if entry.generation != self.generation {
            trace!("discarding result of superseded {:?}", entry.step);
            if matches!(entry.step, Step::Dial | Step::EnterData) && response.is_ok() {
                // The channel went online for an abandoned activation
                warn!("hanging up data state of superseded {:?}", entry.step);
                self.channel.shutdown_transport();
            }
            return;
        }

        match (entry.step, response) {
            (Step::Cleanup, Ok(_)) => {}
            (Step::Cleanup, Err(e)) => warn!("context cleanup failed: {:?}", e),
            (Step::Deactivate, result) => {
                if let Err(e) = result {
                    warn!("context deactivation failed: {:?}", e);
                }
                self.reset();
                self.complete(Ok(()));
            }
            (step, Err(e)) => {
                warn!("{:?} failed: {:?}", step, e);
                self.fail(e);
            }
            (step, Ok(info)) => self.advance(step, info),
        }
    }

    /// Unsolicited result line from the modem.
    pub fn on_notification(&mut self, line: &str) {
        if let Some(event) = PacketSwitchedEvent::parse(line) {
            self.handle_event(event);
        } else if let Some(status) = DataStatus::parse(line) {
            debug!("data status {:?}", status);
            self.listener.data_status(status);
        }
    }

    pub fn on_transport_connected(&mut self, info: &TransportConnected<'_>) {
        if self.state != ContextState::Enabling || !self.transport_open {
            warn!("unexpected transport connect in {:?}", self.state);
            return;
        }

        if self.config.dialect.transport() == TransportKind::Ppp {
            let Some(local) = info.local else {
                error!("PPP came up without a local address");
                self.fail(Error::InvalidResponse);
                return;
            };

            let mut ipv4 = Ipv4Settings::new(local);
            for server in info.dns.iter().flatten() {
                ipv4.dns.push(*server).ok();
            }
            self.settings = ContextSettings {
                ipv4: Some(ipv4),
                ipv6: None,
            };
        }

        let interface = if info.interface.is_empty() {
            self.config.interface.as_str()
        } else {
            info.interface
        };
        report_settings(&mut self.listener, interface, &self.settings);

        self.set_state(ContextState::Active);
        self.complete(Ok(()));
    }

    pub fn on_transport_disconnected(&mut self, reason: DisconnectReason) {
        if !self.transport_open {
            trace!("ignoring transport disconnect ({:?})", reason);
            return;
        }
        self.transport_open = false;
        info!("transport down: {:?}", reason);

        match self.state {
            ContextState::Enabling => self.fail(Error::TransportFailed),
            ContextState::Disabling => self.release(),
            ContextState::Active => {
                let Some(cid) = self.cid else {
                    return;
                };
                let activated = self.activated;
                self.reset();
                if activated && self.config.dialect.needs_explicit_deactivation() {
                    self.cleanup(cid);
                }
                self.listener.deactivated(cid);
            }
            ContextState::Idle => {}
        }
    }

    fn handle_event(&mut self, event: PacketSwitchedEvent) {
        match event {
            PacketSwitchedEvent::NetworkDetach | PacketSwitchedEvent::MobileDetach => {
                info!("packet domain detached");
                self.listener.detached();
                return;
            }
            _ => {}
        }

        let Some(cid) = event.network_deactivated_cid() else {
            trace!("ignoring {:?}", event);
            return;
        };
        if self.state == ContextState::Idle || self.cid != Some(cid) {
            return;
        }

        info!("context {} deactivated by the network", cid.0);
        if self.transport_open {
            self.transport_open = false;
            self.channel.shutdown_transport();
        }

        let state = self.state;
        self.reset();
        match state {
            ContextState::Active => self.listener.deactivated(cid),
            ContextState::Enabling => self.complete(Err(Error::Canceled)),
            ContextState::Disabling => self.complete(Ok(())),
            ContextState::Idle => {}
        }
    }

    fn teardown(&mut self, cid: ContextId, notify: Option<Operation>) -> Result<(), Error> {
        match self.state {
            ContextState::Idle => {
                if let Some(operation) = notify {
                    self.listener.operation_done(operation, Ok(()));
                }
                return Ok(());
            }
            ContextState::Disabling => return Err(Error::Busy),
            _ if self.cid != Some(cid) => return Err(Error::Busy),
            ContextState::Enabling => {
                // results of the abandoned sequence are stale from here on
                self.generation = self.generation.wrapping_add(1);
                self.complete(Err(Error::Canceled));
            }
            ContextState::Active => {}
        }

        self.pending = notify;
        self.set_state(ContextState::Disabling);
        if self.transport_open {
            self.channel.shutdown_transport();
        } else {
            self.release();
        }
        Ok(())
    }

    /// Transport is down while disabling. Deactivates the context on
    /// the modem if the link did not do so.
    fn release(&mut self) {
        match self.cid {
            Some(cid) if self.config.dialect.needs_explicit_deactivation() => {
                if let Err(e) = self.send(Step::Deactivate, deactivate_command(cid)) {
                    warn!("cannot deactivate context {}: {:?}", cid.0, e);
                    self.reset();
                    self.complete(Ok(()));
                }
            }
            _ => {
                self.reset();
                self.complete(Ok(()));
            }
        }
    }

    fn advance(&mut self, step: Step, info: &[u8]) {
        let Some(cid) = self.cid else {
            return;
        };

        let (next, command) = match step {
            Step::Define => match self.config.dialect.family {
                Family::Ppp { .. } => self.dial_command(cid),
                Family::RawIp { .. } => (Step::Authenticate, self.auth_command(cid)),
            },
            Step::Authenticate => {
                let request = self
                    .context
                    .as_ref()
                    .map_or(DnsRequest::Ipv4, |ctx| ctx.pdp_type.into());
                (
                    Step::RequestDns,
                    Command::RequestDns(SetXdns { cid, request }),
                )
            }
            Step::RequestDns => (
                Step::Activate,
                Command::SetContextState(SetPDPContextState {
                    status: PDPContextStatus::Activated,
                    cid: Some(cid),
                }),
            ),
            Step::Activate => {
                self.activated = true;
                let Family::RawIp { settings } = self.config.dialect.family else {
                    self.fail(GenericError::Unsupported.into());
                    return;
                };
                settings_query(cid, settings)
            }
            Step::ReadAddress => {
                let parsed = core::str::from_utf8(info)
                    .ok()
                    .and_then(|response| settings::parse_cgpaddr(response, cid));
                let Some(parsed) = parsed else {
                    self.fail(Error::InvalidResponse);
                    return;
                };
                self.settings = parsed;
                (Step::ReadDns, Command::GetDns(GetDnsConfig))
            }
            Step::ReadDns => {
                let found = core::str::from_utf8(info)
                    .map(|response| settings::parse_xdns(response, cid, &mut self.settings))
                    .unwrap_or(false);
                if !found {
                    self.fail(Error::InvalidResponse);
                    return;
                }
                self.raw_ip_data_command(cid)
            }
            Step::ReadDynamicParams => {
                let parsed = core::str::from_utf8(info)
                    .ok()
                    .and_then(settings::parse_cgcontrdp);
                let Some(parsed) = parsed else {
                    self.fail(Error::InvalidResponse);
                    return;
                };
                self.settings = parsed;
                self.raw_ip_data_command(cid)
            }
            Step::Dial | Step::EnterData => {
                self.open_transport();
                return;
            }
            Step::Deactivate | Step::Cleanup => return,
        };

        self.issue(next, command);
    }

    fn define_command(&self, ctx: &PrimaryContext) -> Result<SetPDPContextDefinition, Error> {
        let mut apn: String<APN_FIELD_LEN> = String::new();
        if self.config.uses_apn_auth_prefix() {
            let prefix = match ctx.auth {
                AuthMethod::Any | AuthMethod::Chap => "CHAP:",
                AuthMethod::Pap => "PAP:",
                AuthMethod::None => "",
            };
            apn.push_str(prefix)
                .map_err(|_| GenericError::Overflow)?;
        }
        apn.push_str(&ctx.apn)
            .map_err(|_| GenericError::Overflow)?;

        Ok(SetPDPContextDefinition {
            cid: ctx.cid,
            pdp_type: ctx.pdp_type.as_str(),
            apn,
        })
    }

    fn dial_command(&self, cid: ContextId) -> (Step, Command) {
        let command = match self.config.effective_dial_mode() {
            DialMode::Atd => Command::Dial(EnterPPP { cid }),
            DialMode::Cgdata => Command::EnterDataState(EnterDataState {
                l2p: L2Protocol::Ppp.as_str(),
                cid,
            }),
        };
        (Step::Dial, command)
    }

    fn auth_command(&self, cid: ContextId) -> Command {
        let (auth, username, password) = match &self.context {
            Some(ctx) if ctx.has_credentials() => {
                let auth = match ctx.auth {
                    AuthMethod::None => XgauthType::None,
                    AuthMethod::Chap => XgauthType::Chap,
                    AuthMethod::Any | AuthMethod::Pap => XgauthType::Pap,
                };
                (auth, ctx.username.clone(), ctx.password.clone())
            }
            _ => (XgauthType::None, String::new(), String::new()),
        };

        Command::Authenticate(SetXgauth {
            cid,
            auth,
            username,
            password,
        })
    }

    fn raw_ip_data_command(&self, cid: ContextId) -> (Step, Command) {
        (
            Step::EnterData,
            Command::EnterDataState(EnterDataState {
                l2p: L2Protocol::RawIp.as_str(),
                cid,
            }),
        )
    }

    fn open_transport(&mut self) {
        let kind = self.config.dialect.transport();
        let auth = match kind {
            TransportKind::Ppp => self.context.as_ref().map(|ctx| TransportAuth {
                method: ctx.auth.into(),
                username: ctx.username.clone(),
                password: ctx.password.clone(),
            }),
            TransportKind::RawIp => None,
        };

        match self.channel.open_transport(kind, auth.as_ref()) {
            Ok(()) => {
                debug!("opening {:?} transport", kind);
                self.transport_open = true;
            }
            Err(e) => {
                error!("cannot open {:?} transport: {:?}", kind, e);
                self.fail(e);
            }
        }
    }

    fn issue(&mut self, step: Step, command: Command) {
        if let Err(e) = self.send(step, command) {
            self.fail(e);
        }
    }

    fn send(&mut self, step: Step, command: Command) -> Result<(), Error> {
        if self.in_flight.is_full() {
            return Err(GenericError::Overflow.into());
        }

        debug!("issuing {:?}", command);
        self.channel.send(command)?;
        self.in_flight
            .push_back(InFlight {
                step,
                generation: self.generation,
            })
            .ok();
        Ok(())
    }

    /// Aborts the sequence in flight, undoing what already succeeded,
    /// and reports `error` to the pending operation.
    fn fail(&mut self, error: Error) {
        if self.transport_open {
            self.channel.shutdown_transport();
        }

        let cid = self.cid;
        let activated = self.activated;
        self.reset();
        if let (Some(cid), true) = (cid, activated) {
            self.cleanup(cid);
        }
        self.complete(Err(error));
    }

    /// `+CGACT=0` whose result is only logged.
    fn cleanup(&mut self, cid: ContextId) {
        if let Err(e) = self.send(Step::Cleanup, deactivate_command(cid)) {
            warn!("cannot clean up context {}: {:?}", cid.0, e);
        }
    }

    fn complete(&mut self, result: Result<(), Error>) {
        if let Some(operation) = self.pending.take() {
            self.listener.operation_done(operation, result);
        }
    }

    fn reset(&mut self) {
        self.set_state(ContextState::Idle);
        self.cid = None;
        self.context = None;
        self.activated = false;
        self.transport_open = false;
        self.settings = ContextSettings::default();
        self.generation = self.generation.wrapping_add(1);
    }

    fn set_state(&mut self, state: ContextState) {
        if self.state != state {
            info!(
                "context {:?}: {:?} -> {:?}",
                self.cid.map(|cid| cid.0),
                self.state,
                state
            );
            self.state = state;
        }
    }
}

fn report_settings<L: ContextListener>(listener: &mut L, interface: &str, settings: &ContextSettings) {
    listener.set_interface(interface);

    if let Some(ipv4) = &settings.ipv4 {
        listener.set_ipv4_address(ipv4.address, true);
        listener.set_ipv4_netmask(ipv4.netmask.unwrap_or_else(static_netmask));
        if let Some(gateway) = ipv4.gateway {
            listener.set_ipv4_gateway(gateway);
        }
        if !ipv4.dns.is_empty() {
            listener.set_ipv4_dns_servers(&ipv4.dns);
        }
    }

    if let Some(ipv6) = &settings.ipv6 {
        listener.set_ipv6_address(ipv6.address);
        listener.set_ipv6_prefix_length(ipv6.prefix_len);
        if let Some(gateway) = ipv6.gateway {
            listener.set_ipv6_gateway(gateway);
        }
        if !ipv6.dns.is_empty() {
            listener.set_ipv6_dns_servers(&ipv6.dns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::dialect::{Dialect, ATMODEM, IFXMODEM, UBLOX, XMM7MODEM};
    use super::transport::PppAuth;
    use super::*;
    use crate::command::error::{CmeError, ModemError};
    use crate::command::psn::types::PdpType;
    use crate::test_helpers::{MockChannel, RecordingListener};

    type Engine = ContextEngine<MockChannel, RecordingListener>;

    fn new_engine(dialect: &'static Dialect) -> Engine {
        ContextEngine::new(
            ContextConfig::new(dialect),
            MockChannel::default(),
            RecordingListener::default(),
        )
    }

    fn ok(engine: &mut Engine) {
        engine.on_response(Ok(b""));
    }

    fn respond(engine: &mut Engine, info: &str) {
        engine.on_response(Ok(info.as_bytes()));
    }

    fn not_subscribed() -> Error {
        Error::Modem(ModemError::Cme(CmeError::ServiceOptionNotSubscribed))
    }

    fn last_line(engine: &Engine) -> std::string::String {
        engine.channel().lines().pop().unwrap()
    }

    fn ppp_up(engine: &mut Engine) {
        engine.on_transport_connected(&TransportConnected {
            interface: "ppp0",
            local: Some(Ipv4Addr::new(10, 0, 0, 1)),
            remote: Some(Ipv4Addr::new(10, 0, 0, 2)),
            dns: [Some(Ipv4Addr::new(8, 8, 8, 8)), Some(Ipv4Addr::new(8, 8, 4, 4))],
        });
    }

    /// Runs the PPP sequence for cid 3 up to `Active`.
    fn active_ppp_context() -> Engine {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        ok(&mut engine);
        ppp_up(&mut engine);
        assert_eq!(engine.state(), ContextState::Active);
        engine
    }

    /// Runs the ifx sequence for cid 1 up to the `+CGPADDR` query.
    fn ifx_reading_settings() -> Engine {
        let mut engine = new_engine(&IFXMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();
        for _ in 0..4 {
            ok(&mut engine);
        }
        assert_eq!(last_line(&engine), "AT+CGPADDR=1");
        engine
    }

    #[test]
    fn ppp_activation() {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        assert_eq!(engine.state(), ContextState::Enabling);
        assert_eq!(engine.cid(), Some(ContextId(3)));
        assert_eq!(
            engine.channel().lines(),
            ["AT+CGDCONT=3,\"IP\",\"internet\""]
        );

        ok(&mut engine);
        assert_eq!(last_line(&engine), "ATD*99***3#");
        assert!(engine.channel().opened.is_empty());

        ok(&mut engine);
        assert_eq!(engine.channel().opened.len(), 1);
        let (kind, auth) = &engine.channel().opened[0];
        assert_eq!(*kind, TransportKind::Ppp);
        assert_eq!(auth.as_ref().map(|auth| auth.method), Some(PppAuth::Chap));
        assert_eq!(engine.state(), ContextState::Enabling);
        assert!(engine.listener().done.is_empty());

        ppp_up(&mut engine);
        assert_eq!(engine.state(), ContextState::Active);

        let listener = engine.listener();
        assert_eq!(listener.done, [(Operation::Activate, Ok(()))]);
        assert_eq!(listener.interface.as_deref(), Some("ppp0"));
        assert_eq!(listener.ipv4_address, Some((Ipv4Addr::new(10, 0, 0, 1), true)));
        assert_eq!(listener.ipv4_netmask, Some(Ipv4Addr::new(255, 255, 255, 255)));
        assert_eq!(
            listener.ipv4_dns,
            [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]
        );
        assert_eq!(listener.ipv4_gateway, None);
        assert_eq!(engine.channel().commands.len(), 2);
    }

    #[test]
    fn activation_failure_mid_sequence() {
        let mut engine = new_engine(&IFXMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        assert!(last_line(&engine).starts_with("AT+XGAUTH=1,0"));
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+XDNS=1,1");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+CGACT=1,1");

        engine.on_response(Err(not_subscribed()));

        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(engine.cid(), None);
        assert_eq!(engine.channel().commands.len(), 4);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(not_subscribed()))]
        );
        assert!(!engine.listener().has_ip_settings());
    }

    #[test]
    fn failure_after_activation_cleans_up() {
        let mut engine = ifx_reading_settings();
        respond(&mut engine, "+CGPADDR: 1,\"10.0.0.5\"\r\n");
        assert_eq!(last_line(&engine), "AT+XDNS?");

        engine.on_response(Err(not_subscribed()));
        assert_eq!(last_line(&engine), "AT+CGACT=0,1");
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(not_subscribed()))]
        );

        // the cleanup result is not reported
        engine.on_response(Err(not_subscribed()));
        assert_eq!(engine.listener().done.len(), 1);
        assert_eq!(engine.channel().commands.len(), 7);
    }

    #[test]
    fn undecodable_settings_clean_up() {
        let mut engine = ifx_reading_settings();
        respond(&mut engine, "+CGPADDR: 2,\"10.0.0.5\"\r\n");

        assert_eq!(last_line(&engine), "AT+CGACT=0,1");
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::InvalidResponse))]
        );
    }

    #[test]
    fn ifx_activation_and_deactivation() {
        let mut engine = ifx_reading_settings();
        respond(&mut engine, "+CGPADDR: 1,\"10.0.0.5\"\r\n");
        respond(
            &mut engine,
            "+XDNS: 1, \"10.11.12.13\", \"10.11.12.14\"\r\n+XDNS: 2, \"0.0.0.0\", \"0.0.0.0\"\r\n",
        );
        assert_eq!(last_line(&engine), "AT+CGDATA=\"M-RAW_IP\",1");

        ok(&mut engine);
        assert_eq!(engine.channel().opened.len(), 1);
        assert_eq!(engine.channel().opened[0].0, TransportKind::RawIp);
        assert!(engine.channel().opened[0].1.is_none());

        engine.on_transport_connected(&TransportConnected::raw_ip(""));
        assert_eq!(engine.state(), ContextState::Active);

        let listener = engine.listener();
        assert_eq!(listener.done, [(Operation::Activate, Ok(()))]);
        assert_eq!(listener.interface.as_deref(), Some("wwan0"));
        assert_eq!(listener.ipv4_address, Some((Ipv4Addr::new(10, 0, 0, 5), true)));
        assert_eq!(listener.ipv4_netmask, Some(Ipv4Addr::new(255, 255, 255, 255)));
        assert_eq!(
            listener.ipv4_dns,
            [Ipv4Addr::new(10, 11, 12, 13), Ipv4Addr::new(10, 11, 12, 14)]
        );

        engine.deactivate(ContextId(1)).unwrap();
        assert_eq!(engine.state(), ContextState::Disabling);
        assert_eq!(engine.channel().shutdowns, 1);
        assert_eq!(engine.channel().commands.len(), 7);

        engine.on_transport_disconnected(DisconnectReason::LocalClosed);
        assert_eq!(last_line(&engine), "AT+CGACT=0,1");
        assert_eq!(engine.state(), ContextState::Disabling);

        // a failed deactivation still completes the request
        engine.on_response(Err(not_subscribed()));
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Ok(())), (Operation::Deactivate, Ok(()))]
        );
        assert!(engine.listener().deactivated.is_empty());
    }

    #[test]
    fn xmm_dual_stack_activation() {
        let mut engine = new_engine(&XMM7MODEM);
        let ctx = PrimaryContext::new(ContextId(2), "ims")
            .unwrap()
            .pdp_type(PdpType::Ipv4v6)
            .auth(AuthMethod::Chap)
            .credentials("user", "secret")
            .unwrap();
        engine.activate(ctx).unwrap();
        assert_eq!(last_line(&engine), "AT+CGDCONT=2,\"IPV4V6\",\"ims\"");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+XGAUTH=2,2,\"user\",\"secret\"");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+XDNS=2,3");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+CGACT=1,2");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+CGCONTRDP=2");

        respond(
            &mut engine,
            concat!(
                "+CGCONTRDP: 2,5,\"ims\",\"10.0.0.2.255.255.255.0\",\"10.0.0.1\",\"8.8.8.8\",\"\"\r\n",
                "+CGCONTRDP: 2,5,\"ims\",\"32.1.13.184.0.0.0.0.0.0.0.0.0.0.0.2\",\"\",\"\",\"\"\r\n"
            ),
        );
        assert_eq!(last_line(&engine), "AT+CGDATA=\"M-RAW_IP\",2");
        ok(&mut engine);
        engine.on_transport_connected(&TransportConnected::raw_ip("inm0"));

        let listener = engine.listener();
        assert_eq!(listener.done, [(Operation::Activate, Ok(()))]);
        assert_eq!(listener.interface.as_deref(), Some("inm0"));
        assert_eq!(listener.ipv4_address, Some((Ipv4Addr::new(10, 0, 0, 2), true)));
        assert_eq!(listener.ipv4_netmask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(listener.ipv4_gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(listener.ipv4_dns, [Ipv4Addr::new(8, 8, 8, 8)]);
        assert_eq!(listener.ipv6_address, Some("2001:db8::2".parse().unwrap()));
        assert_eq!(listener.ipv6_prefix_len, Some(64));
        assert_eq!(listener.ipv6_gateway, None);
        assert!(listener.ipv6_dns.is_empty());
    }

    #[test]
    fn network_deactivation_while_active() {
        let mut engine = active_ppp_context();

        engine.on_notification("+CGEV: NW DEACT \"IP\",\"10.0.0.9\",4");
        assert_eq!(engine.state(), ContextState::Active);

        engine.on_notification("+CGEV: NW DEACT \"IP\",\"10.0.0.1\",3");
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(engine.channel().shutdowns, 1);
        assert_eq!(engine.listener().deactivated, [ContextId(3)]);
        assert_eq!(engine.listener().done.len(), 1);

        // the link going down afterwards is expected
        engine.on_transport_disconnected(DisconnectReason::PeerClosed);
        assert_eq!(engine.listener().deactivated.len(), 1);
        assert_eq!(engine.listener().done.len(), 1);
    }

    #[test]
    fn network_deactivation_while_enabling() {
        let mut engine = ifx_reading_settings();

        engine.on_notification("+CGEV: NW PDN DEACT 1");
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::Canceled))]
        );
        assert!(engine.listener().deactivated.is_empty());

        // the address query is stale now and nothing is cleaned up
        respond(&mut engine, "+CGPADDR: 1,\"10.0.0.5\"\r\n");
        assert_eq!(engine.channel().commands.len(), 5);
        assert_eq!(engine.listener().done.len(), 1);
    }

    #[test]
    fn peer_teardown_while_active() {
        let mut engine = active_ppp_context();
        engine.on_transport_disconnected(DisconnectReason::PeerClosed);

        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(engine.listener().deactivated, [ContextId(3)]);
        assert_eq!(engine.listener().done.len(), 1);
        assert_eq!(engine.channel().commands.len(), 2);
    }

    #[test]
    fn transport_failure_while_enabling() {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        ok(&mut engine);

        engine.on_transport_disconnected(DisconnectReason::AuthFailed);
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::TransportFailed))]
        );
        assert_eq!(engine.channel().shutdowns, 0);
        assert!(!engine.listener().has_ip_settings());
    }

    #[test]
    fn deactivate_cancels_activation() {
        let mut engine = new_engine(&IFXMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();
        ok(&mut engine);

        engine.deactivate(ContextId(1)).unwrap();
        assert_eq!(engine.state(), ContextState::Disabling);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::Canceled))]
        );
        assert_eq!(last_line(&engine), "AT+CGACT=0,1");

        // result of the abandoned +XGAUTH
        ok(&mut engine);
        assert_eq!(engine.state(), ContextState::Disabling);
        assert_eq!(engine.channel().commands.len(), 3);

        ok(&mut engine);
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [
                (Operation::Activate, Err(Error::Canceled)),
                (Operation::Deactivate, Ok(()))
            ]
        );
    }

    #[test]
    fn deactivate_while_ppp_connects() {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        ok(&mut engine);

        engine.deactivate(ContextId(3)).unwrap();
        assert_eq!(engine.channel().shutdowns, 1);
        assert_eq!(engine.state(), ContextState::Disabling);

        engine.on_transport_disconnected(DisconnectReason::LocalClosed);
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [
                (Operation::Activate, Err(Error::Canceled)),
                (Operation::Deactivate, Ok(()))
            ]
        );
        assert_eq!(engine.channel().commands.len(), 2);
    }

    #[test]
    fn deactivate_while_dialing() {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        assert_eq!(last_line(&engine), "ATD*99***3#");

        engine.deactivate(ContextId(3)).unwrap();
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [
                (Operation::Activate, Err(Error::Canceled)),
                (Operation::Deactivate, Ok(()))
            ]
        );
        assert_eq!(engine.channel().shutdowns, 0);

        // CONNECT for the abandoned dial puts the channel online
        ok(&mut engine);
        assert_eq!(engine.channel().shutdowns, 1);
        assert!(engine.channel().opened.is_empty());
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(engine.listener().done.len(), 2);

        engine.on_transport_disconnected(DisconnectReason::LocalClosed);
        assert_eq!(engine.listener().done.len(), 2);
    }

    #[test]
    fn failed_dial_after_deactivate() {
        let mut engine = new_engine(&ATMODEM);
        engine
            .activate(PrimaryContext::new(ContextId(3), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        engine.deactivate(ContextId(3)).unwrap();

        engine.on_response(Err(Error::Modem(ModemError::Generic)));
        assert_eq!(engine.channel().shutdowns, 0);
        assert_eq!(engine.state(), ContextState::Idle);
    }

    #[test]
    fn detach_shutdown_is_silent() {
        let mut engine = active_ppp_context();
        engine.detach_shutdown(ContextId(3));
        assert_eq!(engine.channel().shutdowns, 1);

        engine.on_transport_disconnected(DisconnectReason::LocalClosed);
        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(engine.listener().done, [(Operation::Activate, Ok(()))]);
        assert!(engine.listener().deactivated.is_empty());
    }

    #[test]
    fn deactivate_when_idle_or_busy() {
        let mut engine = new_engine(&ATMODEM);
        engine.deactivate(ContextId(1)).unwrap();
        assert_eq!(engine.listener().done, [(Operation::Deactivate, Ok(()))]);

        let mut engine = active_ppp_context();
        assert_eq!(engine.deactivate(ContextId(4)), Err(Error::Busy));
        assert_eq!(
            engine.activate(PrimaryContext::new(ContextId(4), "internet").unwrap()),
            Err(Error::Busy)
        );
        engine.deactivate(ContextId(3)).unwrap();
        assert_eq!(engine.deactivate(ContextId(3)), Err(Error::Busy));
    }

    #[test]
    fn unsupported_pdp_type() {
        let mut engine = new_engine(&ATMODEM);
        let ctx = PrimaryContext::new(ContextId(1), "internet")
            .unwrap()
            .pdp_type(PdpType::Ipv6);
        engine.activate(ctx).unwrap();

        assert_eq!(engine.state(), ContextState::Idle);
        assert!(engine.channel().commands.is_empty());
        assert_eq!(
            engine.listener().done,
            [(
                Operation::Activate,
                Err(Error::Generic(GenericError::Unsupported))
            )]
        );
    }

    #[test]
    fn refused_command() {
        let mut engine = new_engine(&ATMODEM);
        engine.channel_mut().refuse_commands = true;
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();

        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::Atat(atat::Error::Write)))]
        );
    }

    #[test]
    fn refused_transport() {
        let mut engine = new_engine(&ATMODEM);
        engine.channel_mut().refuse_transport = true;
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        ok(&mut engine);

        assert_eq!(engine.state(), ContextState::Idle);
        assert_eq!(
            engine.listener().done,
            [(Operation::Activate, Err(Error::TransportFailed))]
        );
    }

    #[test]
    fn ublox_apn_prefix() {
        let mut engine = new_engine(&UBLOX);
        let ctx = PrimaryContext::new(ContextId(1), "internet")
            .unwrap()
            .auth(AuthMethod::Pap);
        engine.activate(ctx).unwrap();
        assert_eq!(last_line(&engine), "AT+CGDCONT=1,\"IP\",\"PAP:internet\"");
        ok(&mut engine);
        assert_eq!(last_line(&engine), "ATD*99***1#");
        ok(&mut engine);
        let auth = engine.channel().opened[0].1.as_ref().map(|auth| auth.method);
        assert_eq!(auth, Some(PppAuth::Pap));

        let mut engine = new_engine(&UBLOX);
        engine
            .activate(PrimaryContext::new(ContextId(1), "internet").unwrap())
            .unwrap();
        assert_eq!(last_line(&engine), "AT+CGDCONT=1,\"IP\",\"CHAP:internet\"");
    }

    #[test]
    fn cgdata_dial_mode() {
        let config = ContextConfig::new(&ATMODEM).dial_mode(DialMode::Cgdata);
        let mut engine = ContextEngine::new(
            config,
            MockChannel::default(),
            RecordingListener::default(),
        );
        engine
            .activate(PrimaryContext::new(ContextId(2), "internet").unwrap())
            .unwrap();
        ok(&mut engine);
        assert_eq!(last_line(&engine), "AT+CGDATA=\"PPP\",2");
    }

    #[test]
    fn read_settings_of_network_context() {
        let mut engine = new_engine(&XMM7MODEM);
        engine.read_settings(ContextId(5)).unwrap();
        assert_eq!(last_line(&engine), "AT+CGCONTRDP=5");

        respond(
            &mut engine,
            "+CGCONTRDP: 5,5,\"internet\",\"10.0.0.2\",\"\",\"\",\"\"\r\n",
        );
        assert_eq!(last_line(&engine), "AT+CGDATA=\"M-RAW_IP\",5");
        ok(&mut engine);
        engine.on_transport_connected(&TransportConnected::raw_ip("inm1"));

        assert_eq!(engine.state(), ContextState::Active);
        assert_eq!(engine.listener().done, [(Operation::ReadSettings, Ok(()))]);
        assert_eq!(
            engine.listener().ipv4_address,
            Some((Ipv4Addr::new(10, 0, 0, 2), true))
        );

        let mut engine = new_engine(&ATMODEM);
        engine.read_settings(ContextId(5)).unwrap();
        assert_eq!(
            engine.listener().done,
            [(
                Operation::ReadSettings,
                Err(Error::Generic(GenericError::Unsupported))
            )]
        );
    }

    #[test]
    fn notifications() {
        let mut engine = new_engine(&IFXMODEM);
        engine.on_notification("+XDATASTAT: 1");
        engine.on_notification("+XDATASTAT: 7");
        engine.on_notification("+CGEV: NW DETACH");
        engine.on_notification("+CGEV: ME PDN ACT 1");
        engine.on_notification("+CREG: 1");

        assert_eq!(engine.listener().data_status, [DataStatus::Resumed]);
        assert_eq!(engine.listener().detached, 1);
        assert_eq!(engine.state(), ContextState::Idle);
    }

    #[test]
    fn unexpected_events_are_ignored() {
        let mut engine = new_engine(&ATMODEM);
        ok(&mut engine);
        ppp_up(&mut engine);
        engine.on_transport_disconnected(DisconnectReason::Unknown);

        assert_eq!(engine.state(), ContextState::Idle);
        assert!(engine.listener().done.is_empty());
        assert!(!engine.listener().has_ip_settings());
    }
}
