//! IP configuration of an active context, and decoding of the responses
//! that report it.

use core::str::FromStr;

use heapless::Vec;
use no_std_net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::command::psn::types::ContextId;
use crate::command::result::ResultIter;

pub const IPV6_DEFAULT_PREFIX_LEN: u8 = 64;

/// Netmask reported for point to point links.
pub fn static_netmask() -> Ipv4Addr {
    Ipv4Addr::new(255, 255, 255, 255)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Settings {
    pub address: Ipv4Addr,
    pub netmask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub dns: Vec<Ipv4Addr, 2>,
}

impl Ipv4Settings {
    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            address,
            netmask: None,
            gateway: None,
            dns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Settings {
    pub address: Ipv6Addr,
    pub prefix_len: u8,
    pub gateway: Option<Ipv6Addr>,
    pub dns: Vec<Ipv6Addr, 2>,
}

impl Ipv6Settings {
    pub fn new(address: Ipv6Addr) -> Self {
        Self {
            address,
            prefix_len: IPV6_DEFAULT_PREFIX_LEN,
            gateway: None,
            dns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSettings {
    pub ipv4: Option<Ipv4Settings>,
    pub ipv6: Option<Ipv6Settings>,
}

impl ContextSettings {
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }

    fn set_address(&mut self, address: IpAddr) {
        match address {
            IpAddr::V4(addr) => self.ipv4 = Some(Ipv4Settings::new(addr)),
            IpAddr::V6(addr) => self.ipv6 = Some(Ipv6Settings::new(addr)),
        }
    }

    /// Adds a DNS server to the family it belongs to. Servers of a family
    /// without an address, and unspecified addresses, are dropped.
    fn add_dns(&mut self, server: IpAddr) {
        match server {
            IpAddr::V4(addr) if !addr.is_unspecified() => {
                if let Some(ipv4) = self.ipv4.as_mut() {
                    ipv4.dns.push(addr).ok();
                }
            }
            IpAddr::V6(addr) if !addr.is_unspecified() => {
                if let Some(ipv6) = self.ipv6.as_mut() {
                    ipv6.dns.push(addr).ok();
                }
            }
            _ => {}
        }
    }
}

/// An address optionally followed by its subnet mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAndMask {
    V4(Ipv4Addr, Option<Ipv4Addr>),
    V6(Ipv6Addr, Option<Ipv6Addr>),
}

/// Parses the `<local_addr and subnet_mask>` forms of 27.007: dotted
/// decimal with 4, 8, 16 or 32 octets, or colon separated IPv6 with an
/// optional space separated mask.
pub fn parse_address_and_mask(s: &str) -> Option<AddressAndMask> {
    let s = s.trim();

    if s.contains(':') {
        let mut parts = s.split_ascii_whitespace();
        let address = Ipv6Addr::from_str(parts.next()?).ok()?;
        let mask = match parts.next() {
            Some(mask) => Some(Ipv6Addr::from_str(mask).ok()?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }
        return Some(AddressAndMask::V6(address, mask));
    }

    let mut octets: Vec<u8, 32> = Vec::new();
    for part in s.split('.') {
        octets.push(part.parse().ok()?).ok()?;
    }

    let v4 = |o: &[u8]| Ipv4Addr::new(o[0], o[1], o[2], o[3]);
    let v6 = |o: &[u8]| {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(o);
        Ipv6Addr::from(bytes)
    };

    match octets.len() {
        4 => Some(AddressAndMask::V4(v4(&octets), None)),
        8 => Some(AddressAndMask::V4(v4(&octets[..4]), Some(v4(&octets[4..])))),
        16 => Some(AddressAndMask::V6(v6(&octets), None)),
        32 => Some(AddressAndMask::V6(
            v6(&octets[..16]),
            Some(v6(&octets[16..])),
        )),
        _ => None,
    }
}

/// Leading one bits of an IPv6 netmask.
pub fn prefix_length(mask: Ipv6Addr) -> u8 {
    u128::from_be_bytes(mask.octets()).leading_ones() as u8
}

fn parse_ip(s: &str) -> Option<IpAddr> {
    match parse_address_and_mask(s)? {
        AddressAndMask::V4(addr, None) => Some(IpAddr::V4(addr)),
        AddressAndMask::V6(addr, None) => Some(IpAddr::V6(addr)),
        _ => None,
    }
}

fn specified_v4(s: Option<&str>) -> Option<Ipv4Addr> {
    match parse_ip(s?)? {
        IpAddr::V4(addr) if !addr.is_unspecified() => Some(addr),
        _ => None,
    }
}

fn specified_v6(s: Option<&str>) -> Option<Ipv6Addr> {
    match parse_ip(s?)? {
        IpAddr::V6(addr) if !addr.is_unspecified() => Some(addr),
        _ => None,
    }
}

/// Addresses of `cid` from a `+CGPADDR` response.
pub fn parse_cgpaddr(response: &str, cid: ContextId) -> Option<ContextSettings> {
    let mut iter = ResultIter::new(response);
    if !iter.next("+CGPADDR:") || iter.next_number()? != cid.0 as u32 {
        return None;
    }

    let mut settings = ContextSettings::default();
    loop {
        let field = match iter.next_string() {
            Some(field) => field,
            None => match iter.next_unquoted_string() {
                Some(field) => field,
                None => break,
            },
        };
        if !field.is_empty() {
            settings.set_address(parse_ip(field)?);
        }
    }

    (!settings.is_empty()).then_some(settings)
}

/// Adds the DNS servers `+XDNS?` reports for `cid`. Returns `false` if
/// the response is malformed or has no line for `cid`.
pub fn parse_xdns(response: &str, cid: ContextId, settings: &mut ContextSettings) -> bool {
    let mut iter = ResultIter::new(response);
    let mut found = false;

    while iter.next("+XDNS:") {
        let Some(line_cid) = iter.next_number() else {
            return false;
        };
        let (Some(primary), Some(secondary)) = (iter.next_string(), iter.next_string()) else {
            return false;
        };

        if line_cid == cid.0 as u32 {
            found = true;
            for server in [primary, secondary] {
                if let Some(server) = parse_ip(server) {
                    settings.add_dns(server);
                }
            }
        }
    }

    found
}

/// Settings from a `+CGCONTRDP` response, one line per address family.
pub fn parse_cgcontrdp(response: &str) -> Option<ContextSettings> {
    let mut iter = ResultIter::new(response);
    let mut settings = ContextSettings::default();

    while iter.next("+CGCONTRDP:") {
        // cid, bearer id, apn
        if !(iter.skip_next() && iter.skip_next() && iter.skip_next()) {
            break;
        }
        let Some(local) = iter.next_string() else {
            break;
        };
        let gateway = iter.next_string();
        let dns = [iter.next_string(), iter.next_string()];

        match parse_address_and_mask(local)? {
            AddressAndMask::V4(address, netmask) => {
                let mut ipv4 = Ipv4Settings::new(address);
                ipv4.netmask = netmask;
                ipv4.gateway = specified_v4(gateway);
                for server in dns.into_iter().filter_map(specified_v4) {
                    ipv4.dns.push(server).ok();
                }
                settings.ipv4 = Some(ipv4);
            }
            AddressAndMask::V6(address, mask) => {
                let mut ipv6 = Ipv6Settings::new(address);
                ipv6.prefix_len = mask.map_or(IPV6_DEFAULT_PREFIX_LEN, prefix_length);
                ipv6.gateway = specified_v6(gateway);
                for server in dns.into_iter().filter_map(specified_v6) {
                    ipv6.dns.push(server).ok();
                }
                settings.ipv6 = Some(ipv6);
            }
        }
    }

    (!settings.is_empty()).then_some(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v6(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn dotted_addresses() {
        assert_eq!(
            parse_address_and_mask("10.0.0.2.255.255.255.0"),
            Some(AddressAndMask::V4(
                Ipv4Addr::new(10, 0, 0, 2),
                Some(Ipv4Addr::new(255, 255, 255, 0))
            ))
        );
        assert_eq!(
            parse_address_and_mask("10.0.0.2"),
            Some(AddressAndMask::V4(Ipv4Addr::new(10, 0, 0, 2), None))
        );
        assert_eq!(
            parse_address_and_mask("32.1.13.184.0.0.0.0.0.0.0.0.0.0.0.1"),
            Some(AddressAndMask::V6(v6("2001:db8::1"), None))
        );

        let Some(AddressAndMask::V6(address, Some(mask))) = parse_address_and_mask(
            "32.1.13.184.0.0.0.0.0.0.0.0.0.0.0.1.255.255.255.255.255.255.255.255.0.0.0.0.0.0.0.0",
        ) else {
            panic!("expected an IPv6 address and mask");
        };
        assert_eq!(address, v6("2001:db8::1"));
        assert_eq!(prefix_length(mask), 64);

        assert_eq!(parse_address_and_mask("1.2.3"), None);
        assert_eq!(parse_address_and_mask("300.1.1.1"), None);
        assert_eq!(parse_address_and_mask(""), None);
    }

    #[test]
    fn colon_addresses() {
        let Some(AddressAndMask::V6(address, Some(mask))) =
            parse_address_and_mask("2001:db8::1 ffff:ffff:ffff:ff00::")
        else {
            panic!("expected an IPv6 address and mask");
        };
        assert_eq!(address, v6("2001:db8::1"));
        assert_eq!(prefix_length(mask), 56);

        assert_eq!(
            parse_address_and_mask("fe80::1"),
            Some(AddressAndMask::V6(v6("fe80::1"), None))
        );
        assert_eq!(parse_address_and_mask("fe80::1 a b"), None);
    }

    #[test]
    fn cgcontrdp_ipv4() {
        let response = "+CGCONTRDP: 1,5,\"internet\",\"10.0.0.2.255.255.255.0\",\"10.0.0.1\",\"8.8.8.8\",\"8.8.4.4\"\r\n";
        let settings = parse_cgcontrdp(response).unwrap();
        assert!(settings.ipv6.is_none());

        let ipv4 = settings.ipv4.unwrap();
        assert_eq!(ipv4.address, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(ipv4.netmask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(ipv4.gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(
            &ipv4.dns[..],
            &[Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]
        );
    }

    #[test]
    fn cgcontrdp_dual_stack() {
        let response = concat!(
            "+CGCONTRDP: 1,5,\"ims\",\"10.1.1.1\",\"0.0.0.0\",\"1.1.1.1\",\"\"\r\n",
            "+CGCONTRDP: 1,5,\"ims\",\"32.1.13.184.0.0.0.0.0.0.0.0.0.0.0.2\",\"\",",
            "\"32.1.72.96.72.96.0.0.0.0.0.0.0.0.136.136\",\"\"\r\n"
        );
        let settings = parse_cgcontrdp(response).unwrap();

        let ipv4 = settings.ipv4.unwrap();
        assert_eq!(ipv4.address, Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(ipv4.netmask, None);
        assert_eq!(ipv4.gateway, None);
        assert_eq!(&ipv4.dns[..], &[Ipv4Addr::new(1, 1, 1, 1)]);

        let ipv6 = settings.ipv6.unwrap();
        assert_eq!(ipv6.address, v6("2001:db8::2"));
        assert_eq!(ipv6.prefix_len, 64);
        assert_eq!(ipv6.gateway, None);
        assert_eq!(&ipv6.dns[..], &[v6("2001:4860:4860::8888")]);
    }

    #[test]
    fn cgcontrdp_without_address() {
        assert_eq!(parse_cgcontrdp("+CGCONTRDP: 1,5,\"internet\""), None);
        assert_eq!(parse_cgcontrdp("+CGCONTRDP: 1,5,\"internet\",\"bogus\""), None);
        assert_eq!(parse_cgcontrdp(""), None);
    }

    #[test]
    fn cgpaddr_and_xdns() {
        let mut settings = parse_cgpaddr("+CGPADDR: 1,\"10.0.0.5\"\r\n", ContextId(1)).unwrap();
        assert_eq!(settings.ipv4.as_ref().unwrap().address, Ipv4Addr::new(10, 0, 0, 5));
        assert!(settings.ipv6.is_none());

        let xdns = "+XDNS: 1, \"10.11.12.13\", \"0.0.0.0\"\r\n+XDNS: 2, \"1.2.3.4\", \"5.6.7.8\"\r\n";
        assert!(parse_xdns(xdns, ContextId(1), &mut settings));
        assert_eq!(
            &settings.ipv4.as_ref().unwrap().dns[..],
            &[Ipv4Addr::new(10, 11, 12, 13)]
        );

        assert!(!parse_xdns(xdns, ContextId(3), &mut settings));
        assert!(!parse_xdns("+XDNS: 1", ContextId(1), &mut settings));

        assert!(parse_cgpaddr("+CGPADDR: 1,\"10.0.0.5\"", ContextId(2)).is_none());
        assert!(parse_cgpaddr("+CGPADDR: 1", ContextId(1)).is_none());
    }

    #[test]
    fn cgpaddr_dual_stack() {
        let settings = parse_cgpaddr(
            "+CGPADDR: 4,\"10.0.0.5\",\"254.128.0.0.0.0.0.0.0.0.0.0.0.0.0.1\"",
            ContextId(4),
        )
        .unwrap();
        assert_eq!(settings.ipv4.unwrap().address, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(settings.ipv6.unwrap().address, v6("fe80::1"));

        let settings = parse_cgpaddr("+CGPADDR: 4,10.0.0.6", ContextId(4)).unwrap();
        assert_eq!(settings.ipv4.unwrap().address, Ipv4Addr::new(10, 0, 0, 6));
    }
}
