use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::{
    client::{DialerConfig, TransportConfig},
    error::ParanoidError,
    net::StackMode,
    policy::{HostRule, PolicyBuilder},
};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub dialer: DialerSection,
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PolicySection {
    /// Start from the built-in forbidden ranges and host rules
    #[serde(default = "default_true")]
    pub inherit_defaults: bool,
    #[serde(default)]
    pub forbidden_cidrs: Vec<String>,
    /// Exceptions; these win over every forbidden rule
    #[serde(default)]
    pub allowed_cidrs: Vec<String>,
    /// Hostnames rejected by exact, case-insensitive match
    #[serde(default)]
    pub forbidden_hosts: Vec<String>,
    /// Domains rejected together with all of their subdomains
    #[serde(default)]
    pub forbidden_domains: Vec<String>,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            inherit_defaults: true,
            forbidden_cidrs: Vec::new(),
            allowed_cidrs: Vec::new(),
            forbidden_hosts: Vec::new(),
            forbidden_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DialerSection {
    pub connect_timeout_secs: Option<u64>,
    /// `0` disables TCP keep-alive
    pub keep_alive_secs: Option<u64>,
    #[serde(default)]
    pub dual_stack: bool,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ClientSection {
    pub timeout_secs: Option<u64>,
    pub tls_handshake_timeout_secs: Option<u64>,
    pub proxy_from_env: Option<bool>,
    pub max_redirects: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// Parse a CIDR range; a bare IP address becomes a single-host range
pub fn parse_cidr(entry: &str) -> Result<IpNet, ParanoidError> {
    let entry = entry.trim();
    if let Ok(net) = entry.parse::<IpNet>() {
        return Ok(net);
    }
    entry
        .parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|err| ParanoidError::InvalidCidr {
            entry: entry.to_string(),
            reason: err.to_string(),
        })
}

impl ConfigFile {
    /// Load configuration file
    pub fn load(path: &Path) -> Result<Self, ParanoidError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| ParanoidError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })
    }

    /// Build a policy builder from the `[policy]` section
    pub fn to_policy_builder(&self) -> Result<PolicyBuilder, ParanoidError> {
        let section = &self.policy;
        let mut builder = if section.inherit_defaults {
            PolicyBuilder::default()
        } else {
            PolicyBuilder::empty()
        };

        for entry in &section.forbidden_cidrs {
            builder = builder.forbid_range(parse_cidr(entry)?);
        }
        for entry in &section.allowed_cidrs {
            builder = builder.allow_range(parse_cidr(entry)?);
        }
        for host in &section.forbidden_hosts {
            builder = builder.forbid_host(HostRule::exact(host.as_str()));
        }
        for domain in &section.forbidden_domains {
            builder = builder.forbid_host(HostRule::suffix(domain.as_str()));
        }

        Ok(builder)
    }

    pub fn dialer_config(&self) -> DialerConfig {
        let defaults = DialerConfig::default();
        DialerConfig {
            connect_timeout: self
                .dialer
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            keep_alive: match self.dialer.keep_alive_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.keep_alive,
            },
            stack: if self.dialer.dual_stack {
                StackMode::DualStack
            } else {
                StackMode::Ipv4Only
            },
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            tls_handshake_timeout: self
                .client
                .tls_handshake_timeout_secs
                .map_or(defaults.tls_handshake_timeout, Duration::from_secs),
            proxy_from_env: self.client.proxy_from_env.unwrap_or(defaults.proxy_from_env),
            ..defaults
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.client.timeout_secs.map(Duration::from_secs)
    }

    pub fn max_redirects(&self) -> Option<usize> {
        self.client.max_redirects
    }
}
