//! Turning an untrusted `host:port` into one policy-approved socket address.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};

use crate::{error::ParanoidError, policy::AddressPolicy};

use super::{parser::split_host_port, resolver::DnsResolver};

/// Address families a dial is willing to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
    Any,
}

impl IpFamily {
    pub fn admits(self, ip: IpAddr) -> bool {
        match self {
            Self::V4 => ip.is_ipv4(),
            Self::V6 => ip.is_ipv6(),
            Self::Any => true,
        }
    }
}

/// The single address a dial is allowed to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedAddress(SocketAddr);

impl ValidatedAddress {
    fn new(ip: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(ip, port))
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for ValidatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validate a `host:port` string against the policy
///
/// Literal IP hosts are checked directly. Symbolic hosts are checked against
/// the hostname rules, resolved, and every candidate of an admitted family is
/// checked. If any of them is forbidden the whole answer is rejected, even
/// when other candidates would pass. The first remaining candidate, in the
/// resolver's order, is returned with the original port.
///
/// # Errors
/// * `InvalidAddress` - `hostport` is not a `host:port` pair
/// * `ForbiddenAddress` - the literal IP, or any resolved candidate, is forbidden
/// * `ForbiddenHost` - the hostname matches a host rule
/// * `ResolutionFailure` - the lookup failed or returned nothing
/// * `NoSafeAddress` - no candidate of an admitted family was found
pub async fn validate<R>(
    hostport: &str,
    family: IpFamily,
    resolver: &R,
    policy: &AddressPolicy,
) -> Result<ValidatedAddress, ParanoidError>
where
    R: DnsResolver + ?Sized,
{
    let (host, port) = split_host_port(hostport)?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        let ip = ip.to_canonical();
        if ip.is_unspecified() || policy.is_ip_forbidden(ip) {
            log::warn!("Refusing to dial forbidden address {ip}");
            return Err(ParanoidError::ForbiddenAddress { ip });
        }
        if !family.admits(ip) {
            return Err(ParanoidError::NoSafeAddress {
                host: host.to_string(),
            });
        }
        return Ok(ValidatedAddress::new(ip, port));
    }

    if let Some(rule) = policy.host_policy().matching_rule(host) {
        log::warn!("Refusing to resolve host {host:?}: matches rule {rule}");
        return Err(ParanoidError::ForbiddenHost {
            host: host.to_string(),
        });
    }

    let candidates = resolver.lookup_ip(host).await?;
    if candidates.is_empty() {
        return Err(ParanoidError::ResolutionFailure {
            host: host.to_string(),
            source: None,
        });
    }

    let mut chosen = None;
    for ip in candidates.into_iter().map(|ip| ip.to_canonical()) {
        if !family.admits(ip) {
            log::debug!("Skipping {ip} for {host}: address family not dialed");
            continue;
        }
        if policy.is_ip_forbidden(ip) {
            log::warn!("Refusing to dial {host}: resolved to forbidden address {ip}");
            return Err(ParanoidError::ForbiddenAddress { ip });
        }
        chosen.get_or_insert(ip);
    }

    let ip = chosen.ok_or_else(|| ParanoidError::NoSafeAddress {
        host: host.to_string(),
    })?;
    log::debug!("Validated {host} as {ip}");

    Ok(ValidatedAddress::new(ip, port))
}
