use thiserror::Error;

use std::{net::IpAddr, net::SocketAddr, path::PathBuf, time::Duration};

use hickory_resolver::ResolveError;

#[derive(Debug, Error)]
pub enum ParanoidError {
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("bad host is detected: {host}")]
    ForbiddenHost { host: String },

    #[error("bad ip is detected: {ip}")]
    ForbiddenAddress { ip: IpAddr },

    #[error("unsupported network '{network}': only {supported} are allowed")]
    UnsupportedNetwork {
        network: String,
        supported: &'static str,
    },

    #[error("failed to resolve host {host}")]
    ResolutionFailure {
        host: String,
        #[source]
        source: Option<ResolveError>,
    },

    #[error("no address of a supported family for host {host}")]
    NoSafeAddress { host: String },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    #[error("connection setup to {uri} timed out after {timeout:?}")]
    HandshakeTimeout { uri: String, timeout: Duration },

    #[error("request timed out after {timeout:?}")]
    RequestTimeout { timeout: Duration },

    #[error("stopped after {max} redirects while fetching {url}")]
    TooManyRedirects { url: String, max: usize },

    #[error("invalid redirect location '{location}': {reason}")]
    InvalidRedirect { location: String, reason: String },

    #[error("failed to read response body: {source}")]
    Body {
        #[source]
        source: hyper::Error,
    },

    #[error("invalid URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("HTTP request failed: {source}")]
    Http {
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("failed to configure TLS: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid CIDR '{entry}': {reason}")]
    InvalidCidr { entry: String, reason: String },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParanoidError {
    /// Find the error raised while dialing, if this failure came from one.
    ///
    /// Client failures wrap the dial error several layers deep (transport,
    /// TLS connector, hyper client); this walks the source chain.
    pub fn dial_error(&self) -> Option<&ParanoidError> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<ParanoidError>()
                && !matches!(found, ParanoidError::Http { .. })
            {
                return Some(found);
            }
            current = err.source();
        }
        None
    }

    /// Whether the failure is a policy verdict rather than a network problem.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self.dial_error(),
            Some(
                ParanoidError::ForbiddenHost { .. }
                    | ParanoidError::ForbiddenAddress { .. }
                    | ParanoidError::UnsupportedNetwork { .. }
                    | ParanoidError::NoSafeAddress { .. }
            )
        )
    }
}
