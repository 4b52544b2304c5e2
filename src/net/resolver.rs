use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::{Resolver, config::LookupIpStrategy};

#[cfg(test)]
use mockall::automock;

use crate::error::ParanoidError;

/// DNS resolver abstraction for testing
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DnsResolver: Send + Sync + 'static {
    /// Resolve a hostname to its candidate addresses, in answer order
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ParanoidError>;
}

/// Production DNS resolver using the system resolver
///
/// A fresh resolver is built from the system configuration for every lookup
/// and its answer cache is disabled, so every dial sees a new answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDnsResolver;

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    /// Resolve a hostname to IPv4 and IPv6 addresses
    ///
    /// # Returns
    /// * `Ok(Vec<IpAddr>)` - Resolved addresses in the order of the answer
    /// * `Err(ParanoidError::ResolutionFailure)` - If reading the system
    ///   configuration or the lookup itself fails
    ///
    /// # Examples
    /// ```no_run
    /// use paranoid::net::{DnsResolver, SystemDnsResolver};
    ///
    /// # async fn example() {
    /// let resolver = SystemDnsResolver;
    /// let addrs = resolver.lookup_ip("example.com").await.unwrap();
    /// # }
    /// ```
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ParanoidError> {
        let mut builder =
            Resolver::builder_tokio().map_err(|source| ParanoidError::ResolutionFailure {
                host: host.to_string(),
                source: Some(source),
            })?;
        builder.options_mut().cache_size = 0;
        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        let resolver = builder.build();

        let response =
            resolver
                .lookup_ip(host)
                .await
                .map_err(|source| ParanoidError::ResolutionFailure {
                    host: host.to_string(),
                    source: Some(source),
                })?;

        Ok(response.iter().collect())
    }
}
