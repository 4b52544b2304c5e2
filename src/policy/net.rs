use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

/// Ranges rejected by the default policy in addition to non-global-unicast addresses
pub(crate) const DEFAULT_FORBIDDEN_CIDRS: &[&str] = &[
    "10.0.0.0/8",     // private class A
    "172.16.0.0/12",  // private class B
    "192.168.0.0/16", // private class C
    "192.0.2.0/24",   // test net 1
    "192.88.99.0/24", // 6to4 relay
    "fc00::/7",       // unique local
    "fe80::/10",      // link local
    "2001:db8::/32",  // documentation
    "2001::/32",      // teredo
    "2001:10::/28",   // orchid
    "2002::/16",      // 6to4
];

/// Parse a compiled-in CIDR constant.
///
/// A failure here is a defect in the built-in defaults, so it aborts instead
/// of surfacing as a caller error.
pub(crate) fn must_parse_cidr(cidr: &str) -> IpNet {
    cidr.parse()
        .unwrap_or_else(|err| panic!("built-in CIDR {cidr} must be parsed: {err}"))
}

/// IP address rules: forbidden ranges plus exception ranges that override them
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpPolicy {
    /// Ranges that are never dialed
    pub(crate) forbidden: Vec<IpNet>,
    /// Ranges that are always dialed, even when otherwise forbidden
    pub(crate) allowed: Vec<IpNet>,
}

impl IpPolicy {
    /// Rules with the built-in forbidden ranges and no exceptions
    pub fn with_defaults() -> Self {
        Self {
            forbidden: DEFAULT_FORBIDDEN_CIDRS
                .iter()
                .map(|cidr| must_parse_cidr(cidr))
                .collect(),
            allowed: Vec::new(),
        }
    }

    pub fn forbidden(&self) -> &[IpNet] {
        &self.forbidden
    }

    pub fn allowed(&self) -> &[IpNet] {
        &self.allowed
    }

    /// Check whether an IP address must not be dialed
    ///
    /// Allow ranges are consulted first and always win. Anything that is not
    /// a global unicast address is forbidden next, then the explicit
    /// forbidden ranges apply.
    pub fn is_forbidden(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();

        if self.allowed.iter().any(|net| net.contains(&ip)) {
            return false;
        }

        if !is_global_unicast(ip) {
            return true;
        }

        self.forbidden.iter().any(|net| net.contains(&ip))
    }
}

/// Whether an address is a global unicast address.
///
/// Unspecified, loopback, link-local unicast, multicast (link-local multicast
/// included) and the IPv4 limited broadcast address are not.
pub fn is_global_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_global_unicast_v4(v4),
        IpAddr::V6(v6) => is_global_unicast_v6(v6),
    }
}

fn is_global_unicast_v4(ip: Ipv4Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast())
}

fn is_global_unicast_v6(ip: Ipv6Addr) -> bool {
    !(ip.is_unspecified() || ip.is_loopback() || ip.is_unicast_link_local() || ip.is_multicast())
}
