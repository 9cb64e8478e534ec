//! Forwards engine outcomes to async tasks through an `embassy-sync`
//! channel.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;
use heapless::String;
use no_std_net::{Ipv4Addr, Ipv6Addr};

use super::settings::{ContextSettings, Ipv4Settings, Ipv6Settings};
use super::{ContextListener, Operation};
use crate::command::psn::types::ContextId;
use crate::command::psn::urc::DataStatus;
use crate::config::MAX_INTERFACE_LEN;
use crate::error::Error;

#[derive(Debug, PartialEq)]
pub enum ContextEvent {
    /// The context is up with the given configuration
    Activated {
        interface: String<MAX_INTERFACE_LEN>,
        settings: ContextSettings,
    },
    /// Activation or settings read failed
    ActivationFailed(Error),
    Deactivated,
    DeactivationFailed(Error),
    /// Torn down by the network or the link
    DeactivatedByPeer(ContextId),
    Detached,
    DataStatus(DataStatus),
}

/// A [`ContextListener`] that gathers the IP configuration and posts one
/// [`ContextEvent`] per outcome. Events are dropped when the channel is
/// full.
pub struct ContextEvents<'a, M: RawMutex, const N: usize> {
    sender: Sender<'a, M, ContextEvent, N>,
    interface: String<MAX_INTERFACE_LEN>,
    settings: ContextSettings,
}

impl<'a, M: RawMutex, const N: usize> ContextEvents<'a, M, N> {
    pub fn new(sender: Sender<'a, M, ContextEvent, N>) -> Self {
        Self {
            sender,
            interface: String::new(),
            settings: ContextSettings::default(),
        }
    }

    fn post(&mut self, event: ContextEvent) {
        if self.sender.try_send(event).is_err() {
            warn!("context event queue full");
        }
    }
}

impl<M: RawMutex, const N: usize> ContextListener for ContextEvents<'_, M, N> {
    fn set_interface(&mut self, name: &str) {
        self.interface.clear();
        if self.interface.push_str(name).is_err() {
            warn!("interface name {} truncated", name);
            for c in name.chars() {
                if self.interface.push(c).is_err() {
                    break;
                }
            }
        }
    }

    fn set_ipv4_address(&mut self, address: Ipv4Addr, _is_static: bool) {
        self.settings.ipv4 = Some(Ipv4Settings::new(address));
    }

    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr) {
        if let Some(ipv4) = self.settings.ipv4.as_mut() {
            ipv4.netmask = Some(netmask);
        }
    }

    fn set_ipv4_gateway(&mut self, gateway: Ipv4Addr) {
        if let Some(ipv4) = self.settings.ipv4.as_mut() {
            ipv4.gateway = Some(gateway);
        }
    }

    fn set_ipv4_dns_servers(&mut self, servers: &[Ipv4Addr]) {
        if let Some(ipv4) = self.settings.ipv4.as_mut() {
            ipv4.dns.clear();
            for server in servers {
                ipv4.dns.push(*server).ok();
            }
        }
    }

    fn set_ipv6_address(&mut self, address: Ipv6Addr) {
        self.settings.ipv6 = Some(Ipv6Settings::new(address));
    }

    fn set_ipv6_prefix_length(&mut self, length: u8) {
        if let Some(ipv6) = self.settings.ipv6.as_mut() {
            ipv6.prefix_len = length;
        }
    }

    fn set_ipv6_gateway(&mut self, gateway: Ipv6Addr) {
        if let Some(ipv6) = self.settings.ipv6.as_mut() {
            ipv6.gateway = Some(gateway);
        }
    }

    fn set_ipv6_dns_servers(&mut self, servers: &[Ipv6Addr]) {
        if let Some(ipv6) = self.settings.ipv6.as_mut() {
            ipv6.dns.clear();
            for server in servers {
                ipv6.dns.push(*server).ok();
            }
        }
    }

    fn operation_done(&mut self, operation: Operation, result: Result<(), Error>) {
        let interface = core::mem::take(&mut self.interface);
        let settings = core::mem::take(&mut self.settings);

        let event = match (operation, result) {
            (Operation::Activate | Operation::ReadSettings, Ok(())) => {
                ContextEvent::Activated {
                    interface,
                    settings,
                }
            }
            (Operation::Activate | Operation::ReadSettings, Err(e)) => {
                ContextEvent::ActivationFailed(e)
            }
            (Operation::Deactivate, Ok(())) => ContextEvent::Deactivated,
            (Operation::Deactivate, Err(e)) => ContextEvent::DeactivationFailed(e),
        };
        self.post(event);
    }

    fn deactivated(&mut self, cid: ContextId) {
        self.post(ContextEvent::DeactivatedByPeer(cid));
    }

    fn detached(&mut self) {
        self.post(ContextEvent::Detached);
    }

    fn data_status(&mut self, status: DataStatus) {
        self.post(ContextEvent::DataStatus(status));
    }
}
