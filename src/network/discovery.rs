// src/network/discovery.rs
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Non-loopback addresses bound to this host at the time of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnAddressSet {
    addrs: BTreeSet<IpAddr>,
}

impl OwnAddressSet {
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.addrs.contains(addr)
    }

    /// Whether `host` is the textual form of one of our addresses.
    /// Hostnames never match; they are not resolved.
    pub fn contains_host(&self, host: &str) -> bool {
        host.trim()
            .parse::<IpAddr>()
            .map_or(false, |addr| self.contains(&addr))
    }
}

impl FromIterator<IpAddr> for OwnAddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        OwnAddressSet {
            addrs: iter.into_iter().filter(|ip| !ip.is_loopback()).collect(),
        }
    }
}

/// Something that can enumerate the addresses bound to local interfaces.
pub trait AddressSource {
    fn interface_addresses(&self) -> Result<Vec<IpAddr>>;
}

/// Queries the operating system's interface table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddresses;

impl AddressSource for SystemAddresses {
    fn interface_addresses(&self) -> Result<Vec<IpAddr>> {
        let interfaces = if_addrs::get_if_addrs().map_err(Error::Discovery)?;
        Ok(interfaces
            .into_iter()
            .filter(|iface| !iface.is_loopback())
            .map(|iface| iface.ip())
            .collect())
    }
}

/// A static address list, for hosts where the interface table is known up front.
#[derive(Debug, Clone, Default)]
pub struct FixedAddresses(pub Vec<IpAddr>);

impl AddressSource for FixedAddresses {
    fn interface_addresses(&self) -> Result<Vec<IpAddr>> {
        Ok(self.0.clone())
    }
}

/// Collects the host's own addresses. A failing query is logged and yields
/// an empty set rather than an error.
pub fn list_local_addresses<S: AddressSource + ?Sized>(source: &S) -> OwnAddressSet {
    match source.interface_addresses() {
        Ok(addrs) => {
            let set: OwnAddressSet = addrs.into_iter().collect();
            log::debug!("Found {} local address(es): {:?}", set.len(), set.addrs);
            set
        }
        Err(e) => {
            log::error!("Can not query local IPs: {}", e);
            OwnAddressSet::default()
        }
    }
}
