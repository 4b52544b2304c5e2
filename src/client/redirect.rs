use bytes::Bytes;
use http::{
    HeaderMap, Method, Request, StatusCode, Uri,
    header::{
        AUTHORIZATION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, LOCATION,
        PROXY_AUTHORIZATION, TRANSFER_ENCODING, WWW_AUTHENTICATE,
    },
};
use http_body_util::Full;
use url::Url;

use crate::error::ParanoidError;

pub(crate) const DEFAULT_MAX_REDIRECTS: usize = 10;

/// The replayable parts of a request, kept so a redirect can be re-issued
#[derive(Debug, Clone)]
pub(crate) struct RedirectParts {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Full<Bytes>,
}

impl RedirectParts {
    pub(crate) fn snapshot(request: &Request<Full<Bytes>>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            body: request.body().clone(),
        }
    }

    pub(crate) fn to_request(&self) -> Request<Full<Bytes>> {
        let mut request = Request::new(self.body.clone());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.headers_mut() = self.headers.clone();
        request
    }

    /// The request to send after a response, or `None` when the response is
    /// not a redirect to follow
    ///
    /// 301 and 302 turn a POST into a GET, 303 turns anything but HEAD into a
    /// GET, and all three drop the body. 307 and 308 replay the request
    /// unchanged. Credentials are dropped when the host changes.
    pub(crate) fn follow(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Option<Self>, ParanoidError> {
        let keep_body = match status {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER => false,
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => true,
            _ => return Ok(None),
        };
        let Some(location) = headers.get(LOCATION) else {
            return Ok(None);
        };
        let location = location
            .to_str()
            .map_err(|err| ParanoidError::InvalidRedirect {
                location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
                reason: err.to_string(),
            })?;

        let mut next = self.clone();
        next.uri = resolve_location(&self.uri, location)?;
        next.headers.remove(HOST);
        next.headers.remove(PROXY_AUTHORIZATION);

        if !keep_body {
            let to_get = match status {
                StatusCode::SEE_OTHER => next.method != Method::HEAD,
                _ => next.method == Method::POST,
            };
            if to_get {
                next.method = Method::GET;
            }
            next.body = Full::default();
            for name in [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_ENCODING, TRANSFER_ENCODING] {
                next.headers.remove(name);
            }
        }

        let same_host = match (self.uri.host(), next.uri.host()) {
            (Some(from), Some(to)) => from.eq_ignore_ascii_case(to),
            _ => false,
        };
        if !same_host {
            for name in [AUTHORIZATION, WWW_AUTHENTICATE, COOKIE] {
                next.headers.remove(name);
            }
        }

        Ok(Some(next))
    }
}

/// Resolve a `Location` value against the URI that produced it
pub(crate) fn resolve_location(base: &Uri, location: &str) -> Result<Uri, ParanoidError> {
    let invalid = |reason: String| ParanoidError::InvalidRedirect {
        location: location.to_string(),
        reason,
    };

    let base = Url::parse(&base.to_string()).map_err(|err| invalid(err.to_string()))?;
    let mut target = base.join(location).map_err(|err| invalid(err.to_string()))?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", target.scheme())));
    }
    target.set_fragment(None);

    target
        .as_str()
        .parse()
        .map_err(|err: http::uri::InvalidUri| invalid(err.to_string()))
}
