//! Link-local interface resolution.
//!
//! A link-local IPv6 address is ambiguous on a multi-interface host: the
//! same `fe80::/10` prefix exists on every segment, so the OS needs a zone
//! (scope id) to know which interface to route through. This module picks
//! the interface to use for reaching the SECC and reports its scope id and
//! its own link-local address (used as the bind-side source address).

use std::fmt;
use std::net::Ipv6Addr;

use if_addrs::IfAddr;

use crate::error::{Error, Result};

/// A local interface usable for link-local IPv6 communication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLocalInterface {
    /// OS interface name, e.g. `eth0`.
    pub name: String,
    /// OS interface index. This is the numeric zone (scope id) that goes
    /// into a [`std::net::SocketAddrV6`].
    pub index: u32,
    /// The interface's own link-local address.
    pub addr: Ipv6Addr,
}

/// Resolve the interface to use for reaching a link-local peer.
///
/// With a hint, the interface of that name is selected if it carries an
/// active link-local IPv6 address; otherwise the call fails with
/// [`Error::InterfaceHintInvalid`]. Without a hint, the first non-loopback
/// interface with a link-local IPv6 address wins (enumeration order is the
/// OS's, which is stable between calls). Fails with
/// [`Error::NoInterfaceFound`] when nothing qualifies.
///
/// This is a read-only system query: safe to call repeatedly and from
/// concurrent tasks.
pub fn resolve(hint: Option<&str>) -> Result<LinkLocalInterface> {
    let interfaces = if_addrs::get_if_addrs().map_err(|source| Error::Enumerate { source })?;

    for iface in interfaces {
        let IfAddr::V6(v6) = &iface.addr else {
            continue;
        };
        if iface.is_loopback() || !v6.ip.is_unicast_link_local() {
            continue;
        }
        // An interface the OS reports without an index cannot be used as a
        // zone, whatever its name says.
        let Some(index) = iface.index.filter(|&i| i != 0) else {
            continue;
        };
        if let Some(name) = hint {
            if iface.name != name {
                continue;
            }
        }
        tracing::debug!(
            v2g.interface = %iface.name,
            v2g.scope_id = index,
            v2g.local_addr = %v6.ip,
            hinted = hint.is_some(),
            "resolved link-local interface"
        );
        return Ok(LinkLocalInterface {
            index,
            addr: v6.ip,
            name: iface.name,
        });
    }

    match hint {
        Some(name) => Err(Error::interface_hint_invalid(name)),
        None => Err(Error::NoInterfaceFound),
    }
}

/// Zoned link-local address in `<address>%<zone>` form, for logs.
///
/// Rust's address parser has no textual zone syntax; sockets take the zone
/// as the numeric `scope_id` of a `SocketAddrV6`. This type exists so log
/// lines still show the conventional form.
pub struct Zoned<'a> {
    pub addr: Ipv6Addr,
    pub zone: &'a str,
}

impl fmt::Display for Zoned<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%{}", self.addr, self.zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_that_matches_nothing_is_invalid() {
        let err = resolve(Some("definitely-not-a-real-interface-0")).unwrap_err();
        assert!(matches!(err, Error::InterfaceHintInvalid { ref hint } if &**hint == "definitely-not-a-real-interface-0"));
    }

    #[test]
    fn resolve_is_repeatable() {
        // Whatever the environment offers, two queries must agree.
        let first = resolve(None);
        let second = resolve(None);
        match (first, second) {
            (Ok(a), Ok(b)) => assert_eq!(a, b),
            (Err(Error::NoInterfaceFound), Err(Error::NoInterfaceFound)) => {}
            (a, b) => panic!("inconsistent resolution: {a:?} vs {b:?}"),
        }
    }

    #[test]
    fn zoned_display_composes_address_and_zone() {
        let zoned = Zoned {
            addr: "fe80::d237:45ff:fe88:b12b".parse().unwrap(),
            zone: "eth1",
        };
        assert_eq!(zoned.to_string(), "fe80::d237:45ff:fe88:b12b%eth1");
    }
}
