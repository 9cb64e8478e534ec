extern crate std;

use std::string::String;
use std::vec::Vec;

use no_std_net::{Ipv4Addr, Ipv6Addr};

use crate::command::psn::types::ContextId;
use crate::command::psn::urc::DataStatus;
use crate::command::Command;
use crate::context::transport::{TransportAuth, TransportKind};
use crate::context::{ContextChannel, ContextListener, Operation};
use crate::error::Error;

/// Records everything the engine asks of the modem.
#[derive(Default)]
pub struct MockChannel {
    pub commands: Vec<Command>,
    pub opened: Vec<(TransportKind, Option<TransportAuth>)>,
    pub shutdowns: usize,
    pub refuse_commands: bool,
    pub refuse_transport: bool,
}

impl MockChannel {
    /// Issued command lines without their terminator.
    pub fn lines(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| {
                let mut buf = [0u8; 256];
                let len = command.write(&mut buf);
                String::from_utf8_lossy(&buf[..len])
                    .trim_end_matches("\r\n")
                    .into()
            })
            .collect()
    }
}

impl ContextChannel for MockChannel {
    fn send(&mut self, command: Command) -> Result<(), Error> {
        if self.refuse_commands {
            return Err(Error::Atat(atat::Error::Write));
        }
        self.commands.push(command);
        Ok(())
    }

    fn open_transport(
        &mut self,
        kind: TransportKind,
        auth: Option<&TransportAuth>,
    ) -> Result<(), Error> {
        if self.refuse_transport {
            return Err(Error::TransportFailed);
        }
        self.opened.push((kind, auth.cloned()));
        Ok(())
    }

    fn shutdown_transport(&mut self) {
        self.shutdowns += 1;
    }
}

/// Records every callback and side channel value.
#[derive(Default)]
pub struct RecordingListener {
    pub interface: Option<String>,
    pub ipv4_address: Option<(Ipv4Addr, bool)>,
    pub ipv4_netmask: Option<Ipv4Addr>,
    pub ipv4_gateway: Option<Ipv4Addr>,
    pub ipv4_dns: Vec<Ipv4Addr>,
    pub ipv6_address: Option<Ipv6Addr>,
    pub ipv6_prefix_len: Option<u8>,
    pub ipv6_gateway: Option<Ipv6Addr>,
    pub ipv6_dns: Vec<Ipv6Addr>,
    pub done: Vec<(Operation, Result<(), Error>)>,
    pub deactivated: Vec<ContextId>,
    pub detached: usize,
    pub data_status: Vec<DataStatus>,
}

impl RecordingListener {
    pub fn has_ip_settings(&self) -> bool {
        self.interface.is_some() || self.ipv4_address.is_some() || self.ipv6_address.is_some()
    }
}

impl ContextListener for RecordingListener {
    fn set_interface(&mut self, name: &str) {
        self.interface = Some(name.into());
    }

    fn set_ipv4_address(&mut self, address: Ipv4Addr, is_static: bool) {
        self.ipv4_address = Some((address, is_static));
    }

    fn set_ipv4_netmask(&mut self, netmask: Ipv4Addr) {
        self.ipv4_netmask = Some(netmask);
    }

    fn set_ipv4_gateway(&mut self, gateway: Ipv4Addr) {
        self.ipv4_gateway = Some(gateway);
    }

    fn set_ipv4_dns_servers(&mut self, servers: &[Ipv4Addr]) {
        self.ipv4_dns = servers.to_vec();
    }

    fn set_ipv6_address(&mut self, address: Ipv6Addr) {
        self.ipv6_address = Some(address);
    }

    fn set_ipv6_prefix_length(&mut self, length: u8) {
        self.ipv6_prefix_len = Some(length);
    }

    fn set_ipv6_gateway(&mut self, gateway: Ipv6Addr) {
        self.ipv6_gateway = Some(gateway);
    }

    fn set_ipv6_dns_servers(&mut self, servers: &[Ipv6Addr]) {
        self.ipv6_dns = servers.to_vec();
    }

    fn operation_done(&mut self, operation: Operation, result: Result<(), Error>) {
        self.done.push((operation, result));
    }

    fn deactivated(&mut self, cid: ContextId) {
        self.deactivated.push(cid);
    }

    fn detached(&mut self) {
        self.detached += 1;
    }

    fn data_status(&mut self, status: DataStatus) {
        self.data_status.push(status);
    }
}
