// src/network/locality.rs
use crate::config::DbHost;
use crate::network::discovery::OwnAddressSet;

/// Decision when no non-loopback address could be discovered: either the
/// query failed or this is a single-host system, so compaction proceeds.
pub const ASSUME_LOCAL_WHEN_NO_ADDRESSES: bool = true;

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];
const ANY_ADDRESS: &str = "0.0.0.0";

/// Whether the database configured at `host` is served from this machine.
///
/// Anything other than a single host string (absent, null, a cluster
/// member list) is never local.
pub fn is_local(host: &DbHost, own: &OwnAddressSet) -> bool {
    let Some(host) = host.as_single() else {
        return false;
    };
    if LOOPBACK_HOSTS.contains(&host) || host == ANY_ADDRESS {
        return true;
    }
    if own.is_empty() {
        return ASSUME_LOCAL_WHEN_NO_ADDRESSES;
    }
    own.contains_host(host)
}
