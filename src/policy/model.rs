// Composition of the IP and hostname rules consulted for every dial
use std::net::IpAddr;

use ipnet::IpNet;

use super::host::{HostPolicy, HostRule};
use super::net::IpPolicy;

/// Immutable rule set consulted for every dial
///
/// A policy is never mutated once built. Customizations go through
/// [`PolicyBuilder`], which produces a new value, so validations already
/// holding a policy keep seeing the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPolicy {
    ip: IpPolicy,
    host: HostPolicy,
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self {
            ip: IpPolicy::with_defaults(),
            host: HostPolicy::with_defaults(),
        }
    }
}

impl AddressPolicy {
    /// Start a builder from the built-in defaults
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Start a builder holding a copy of this policy's rules
    pub fn to_builder(&self) -> PolicyBuilder {
        PolicyBuilder {
            ip: self.ip.clone(),
            host: self.host.clone(),
        }
    }

    pub fn ip_policy(&self) -> &IpPolicy {
        &self.ip
    }

    pub fn host_policy(&self) -> &HostPolicy {
        &self.host
    }

    pub fn is_host_forbidden(&self, host: &str) -> bool {
        self.host.is_forbidden(host)
    }

    pub fn is_ip_forbidden(&self, ip: IpAddr) -> bool {
        self.ip.is_forbidden(ip)
    }
}

/// Builder for [`AddressPolicy`]
///
/// `forbidden_ranges`, `allowed_ranges` and `host_rules` replace a list,
/// while `forbid_range`, `allow_range` and `forbid_host` extend it.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    ip: IpPolicy,
    host: HostPolicy,
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        AddressPolicy::default().to_builder()
    }
}

impl PolicyBuilder {
    /// Start from no explicit rules at all
    ///
    /// Non-global-unicast addresses stay forbidden regardless.
    pub fn empty() -> Self {
        Self {
            ip: IpPolicy::default(),
            host: HostPolicy::default(),
        }
    }

    pub fn forbidden_ranges(mut self, ranges: impl IntoIterator<Item = IpNet>) -> Self {
        self.ip.forbidden = ranges.into_iter().collect();
        self
    }

    pub fn forbid_range(mut self, range: IpNet) -> Self {
        self.ip.forbidden.push(range);
        self
    }

    /// Replace the exception ranges; they take priority over every forbidden rule
    pub fn allowed_ranges(mut self, ranges: impl IntoIterator<Item = IpNet>) -> Self {
        self.ip.allowed = ranges.into_iter().collect();
        self
    }

    pub fn allow_range(mut self, range: IpNet) -> Self {
        self.ip.allowed.push(range);
        self
    }

    pub fn host_rules(mut self, rules: impl IntoIterator<Item = HostRule>) -> Self {
        self.host.rules = rules.into_iter().collect();
        self
    }

    pub fn forbid_host(mut self, rule: HostRule) -> Self {
        self.host.rules.push(rule);
        self
    }

    pub fn build(self) -> AddressPolicy {
        AddressPolicy {
            ip: self.ip,
            host: self.host,
        }
    }
}
