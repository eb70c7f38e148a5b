//! Resolve the address advertised in the callback URL.

use std::net::IpAddr;

use crate::errors::EventsError;

/// Address for `name`: a literal IP is used as-is, otherwise the first IPv4
/// address assigned to the network interface called `name`.
pub fn interface_address(name: &str) -> Result<IpAddr, EventsError> {
    if let Ok(ip) = name.parse::<IpAddr>() {
        return Ok(ip);
    }
    lookup_interface(name)
}

fn interface_error(name: &str, reason: impl Into<String>) -> EventsError {
    EventsError::Interface {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(unix)]
fn lookup_interface(name: &str) -> Result<IpAddr, EventsError> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(|e| interface_error(name, e.to_string()))?;
    let mut seen = false;
    for ifaddr in addrs {
        if ifaddr.interface_name != name {
            continue;
        }
        seen = true;
        if let Some(sin) = ifaddr.address.as_ref().and_then(|a| a.as_sockaddr_in()) {
            return Ok(IpAddr::V4(sin.ip()));
        }
    }
    Err(interface_error(
        name,
        if seen {
            "interface has no IPv4 address"
        } else {
            "no such interface"
        },
    ))
}

#[cfg(not(unix))]
fn lookup_interface(name: &str) -> Result<IpAddr, EventsError> {
    Err(interface_error(
        name,
        "interface lookup is not supported on this platform, configure a literal IP",
    ))
}
