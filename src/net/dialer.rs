use std::{fmt, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

#[cfg(test)]
use mockall::automock;

use crate::{error::ParanoidError, policy::AddressPolicy};

use super::{
    resolver::DnsResolver,
    validator::{IpFamily, validate},
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Which address families the deployment dials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackMode {
    /// Only IPv4 destinations are dialed; IPv6 answers are ignored
    #[default]
    Ipv4Only,
    /// Both IPv4 and IPv6 destinations are dialed
    DualStack,
}

/// Network kinds accepted by [`SafeDialer::dial`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
}

impl Network {
    /// Families a dial over this network may connect to under the given stack
    pub fn family(self, stack: StackMode) -> Result<IpFamily, ParanoidError> {
        match (self, stack) {
            (Self::Tcp, StackMode::Ipv4Only) | (Self::Tcp4, _) => Ok(IpFamily::V4),
            (Self::Tcp, StackMode::DualStack) => Ok(IpFamily::Any),
            (Self::Tcp6, StackMode::DualStack) => Ok(IpFamily::V6),
            (Self::Tcp6, StackMode::Ipv4Only) => Err(unsupported("tcp6", stack)),
        }
    }
}

impl FromStr for Network {
    type Err = ParanoidError;

    /// Parse a network kind; anything but `tcp`, `tcp4` and `tcp6` is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            other => Err(ParanoidError::UnsupportedNetwork {
                network: other.to_string(),
                supported: "tcp, tcp4, tcp6",
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
        })
    }
}

fn unsupported(network: &str, stack: StackMode) -> ParanoidError {
    ParanoidError::UnsupportedNetwork {
        network: network.to_string(),
        supported: match stack {
            StackMode::Ipv4Only => "tcp, tcp4",
            StackMode::DualStack => "tcp, tcp4, tcp6",
        },
    }
}

/// Low-level connector abstraction for testing
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a TCP connection to exactly this socket address
    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream, ParanoidError>;
}

/// Production connector with a connect timeout and TCP keep-alive
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    keep_alive: Option<Duration>,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keep_alive: Some(DEFAULT_KEEP_ALIVE),
        }
    }
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration, keep_alive: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            keep_alive,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        self.keep_alive
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream, ParanoidError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ParanoidError::ConnectTimeout {
                addr,
                timeout: self.connect_timeout,
            })?
            .map_err(|source| ParanoidError::Connect { addr, source })?;

        stream.set_nodelay(true)?;
        if let Some(interval) = self.keep_alive {
            SockRef::from(&stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(interval))?;
        }

        Ok(stream)
    }
}

/// Dialer that only connects to addresses approved by an [`AddressPolicy`]
///
/// Every dial validates (and, for hostnames, resolves) the destination from
/// scratch and then connects to the validated socket address itself. The
/// hostname is never handed to the connector, so a DNS answer that changes
/// between the check and the connect cannot redirect the connection.
#[derive(Clone)]
pub struct SafeDialer {
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn DnsResolver>,
    policy: Arc<AddressPolicy>,
    stack: StackMode,
}

impl fmt::Debug for SafeDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeDialer")
            .field("policy", &self.policy)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl SafeDialer {
    pub fn new(
        connector: Arc<dyn Connector>,
        resolver: Arc<dyn DnsResolver>,
        policy: Arc<AddressPolicy>,
    ) -> Self {
        Self {
            connector,
            resolver,
            policy,
            stack: StackMode::default(),
        }
    }

    pub fn with_stack(mut self, stack: StackMode) -> Self {
        self.stack = stack;
        self
    }

    pub fn policy(&self) -> &Arc<AddressPolicy> {
        &self.policy
    }

    pub fn stack(&self) -> StackMode {
        self.stack
    }

    /// Connect to `hostport` over `network` if the policy allows it
    ///
    /// # Arguments
    /// * `network` - `"tcp"`, `"tcp4"`, or `"tcp6"` (dual stack only)
    /// * `hostport` - destination such as `"example.org:443"` or `"[2001:db8::1]:80"`
    ///
    /// # Returns
    /// * `Ok(TcpStream)` - connected to the validated address
    /// * `Err(ParanoidError)` - unsupported network, validation verdict, or
    ///   connect failure; no connection is attempted when validation fails
    pub async fn dial(&self, network: &str, hostport: &str) -> Result<TcpStream, ParanoidError> {
        let network: Network = network.parse()?;
        let family = network.family(self.stack)?;

        let validated = validate(hostport, family, self.resolver.as_ref(), &self.policy).await?;
        log::debug!("Dialing {network} {validated} for {hostport}");

        self.connector.connect(validated.socket_addr()).await
    }
}
