use std::{
    future::Future,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use http::{HeaderValue, Uri};
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder, MaybeHttpsStream};
use hyper_util::{
    client::{
        legacy::connect::{Connected, Connection, proxy::Tunnel},
        proxy::matcher::Matcher,
    },
    rt::TokioIo,
};
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tower::{Service, ServiceExt};

use crate::{error::ParanoidError, net::SafeDialer};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + Send>>;

/// Connection strategy handed to the HTTP client
///
/// Every connection, including the one to an HTTP proxy, goes through
/// [`SafeDialer::dial`]. Plain `http` destinations intercepted by the proxy
/// settings are forwarded to the proxy in absolute form; `https` ones are
/// reached through a CONNECT tunnel.
#[derive(Clone)]
pub struct SafeConnector {
    dialer: Arc<SafeDialer>,
    proxies: Option<Arc<Matcher>>,
}

impl SafeConnector {
    pub fn new(dialer: Arc<SafeDialer>) -> Self {
        Self {
            dialer,
            proxies: None,
        }
    }

    /// Route destinations through the proxies named by `HTTP_PROXY`,
    /// `HTTPS_PROXY` and `NO_PROXY`
    pub fn with_env_proxies(self) -> Self {
        self.with_proxies(Arc::new(Matcher::from_env()))
    }

    pub fn with_proxies(mut self, proxies: Arc<Matcher>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    pub fn dialer(&self) -> &Arc<SafeDialer> {
        &self.dialer
    }

    fn direct(&self) -> Self {
        Self {
            dialer: Arc::clone(&self.dialer),
            proxies: None,
        }
    }
}

/// Derive the `host:port` to dial from a request URI
pub(crate) fn uri_hostport(uri: &Uri) -> Result<String, ParanoidError> {
    let host = uri.host().ok_or_else(|| ParanoidError::InvalidAddress {
        addr: uri.to_string(),
        reason: "missing host in URI".to_string(),
    })?;
    let port = match (uri.port_u16(), uri.scheme_str()) {
        (Some(port), _) => port,
        (None, Some("https")) => 443,
        (None, Some("http")) => 80,
        (None, _) => {
            return Err(ParanoidError::InvalidAddress {
                addr: uri.to_string(),
                reason: "missing port and unknown scheme".to_string(),
            });
        }
    };
    // IPv6 hosts keep their brackets in `Uri::host`
    Ok(format!("{host}:{port}"))
}

/// `Proxy-Authorization` value for a plain `http` request forwarded to a proxy
pub(crate) fn forwarding_proxy_auth(proxies: &Matcher, uri: &Uri) -> Option<HeaderValue> {
    if uri.scheme_str() != Some("http") {
        return None;
    }
    proxies
        .intercept(uri)
        .and_then(|intercept| intercept.basic_auth().cloned())
}

/// TCP stream produced by [`SafeConnector`]
///
/// A stream to a forwarding proxy reports itself as proxied, which makes the
/// HTTP client write absolute-form request targets.
#[derive(Debug)]
pub struct SafeStream {
    io: TokioIo<TcpStream>,
    proxied: bool,
}

impl SafeStream {
    fn direct(stream: TcpStream) -> Self {
        Self {
            io: TokioIo::new(stream),
            proxied: false,
        }
    }

    fn forwarding(stream: TcpStream) -> Self {
        Self {
            io: TokioIo::new(stream),
            proxied: true,
        }
    }

    pub fn is_proxied(&self) -> bool {
        self.proxied
    }

    pub fn tcp(&self) -> &TcpStream {
        self.io.inner()
    }
}

impl Connection for SafeStream {
    fn connected(&self) -> Connected {
        let connected = self.io.inner().connected();
        if self.proxied {
            connected.proxy(true)
        } else {
            connected
        }
    }
}

impl Read for SafeStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl Write for SafeStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.io.is_write_vectored()
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write_vectored(cx, bufs)
    }
}

impl Service<Uri> for SafeConnector {
    type Response = SafeStream;
    type Error = BoxError;
    type Future = BoxFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let intercept = self.proxies.as_ref().and_then(|proxies| proxies.intercept(&dst));
        let direct = self.direct();

        Box::pin(async move {
            match intercept {
                Some(intercept) if dst.scheme_str() == Some("http") => {
                    log::debug!("Forwarding {dst} to proxy {}", intercept.uri());
                    let hostport = uri_hostport(intercept.uri())?;
                    let stream = direct.dialer.dial("tcp", &hostport).await?;
                    Ok(SafeStream::forwarding(stream))
                }
                Some(intercept) => {
                    log::debug!("Tunneling to {dst} through proxy {}", intercept.uri());
                    let mut tunnel = Tunnel::new(intercept.uri().clone(), direct);
                    if let Some(auth) = intercept.basic_auth() {
                        tunnel = tunnel.with_auth(auth.clone());
                    }
                    tunnel.oneshot(dst).await.map_err(Into::into)
                }
                None => {
                    let hostport = uri_hostport(&dst)?;
                    let stream = direct.dialer.dial("tcp", &hostport).await?;
                    Ok(SafeStream::direct(stream))
                }
            }
        })
    }
}

/// TLS-capable transport over [`SafeConnector`]
///
/// `http` URIs get the raw dialed stream, `https` URIs a rustls session on
/// top of it. Connection setup, dial plus handshake, must finish within
/// `setup_timeout`.
#[derive(Clone)]
pub struct Transport {
    inner: HttpsConnector<SafeConnector>,
    setup_timeout: Duration,
    tls_handshake_timeout: Duration,
}

impl Transport {
    pub fn new(
        connector: SafeConnector,
        connect_timeout: Duration,
        tls_handshake_timeout: Duration,
    ) -> Result<Self, ParanoidError> {
        let inner = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        Ok(Self {
            inner,
            setup_timeout: connect_timeout + tls_handshake_timeout,
            tls_handshake_timeout,
        })
    }

    pub fn tls_handshake_timeout(&self) -> Duration {
        self.tls_handshake_timeout
    }
}

fn tls_config() -> Result<ClientConfig, ParanoidError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(config)
}

impl Service<Uri> for Transport {
    type Response = MaybeHttpsStream<SafeStream>;
    type Error = BoxError;
    type Future = BoxFuture<Self::Response>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let timeout = self.setup_timeout;
        let uri = dst.to_string();
        let connecting = self.inner.call(dst);

        Box::pin(async move {
            match tokio::time::timeout(timeout, connecting).await {
                Ok(result) => result,
                Err(_) => Err(Box::new(ParanoidError::HandshakeTimeout { uri, timeout }) as BoxError),
            }
        })
    }
}
