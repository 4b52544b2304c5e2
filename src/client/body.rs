use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use hyper::body::{Body, Frame, Incoming, SizeHint};
use tokio::time::{Instant, Sleep};

use crate::error::ParanoidError;

/// Response body that must be read before the request deadline
///
/// The deadline is the one the request started with, so redirects, response
/// headers and the body share a single budget.
#[derive(Debug)]
pub struct ResponseBody {
    inner: Pin<Box<Incoming>>,
    deadline: Pin<Box<Sleep>>,
    timeout: Duration,
}

impl ResponseBody {
    pub(crate) fn new(inner: Incoming, deadline: Instant, timeout: Duration) -> Self {
        Self {
            inner: Box::pin(inner),
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            timeout,
        }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = ParanoidError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.inner.is_end_stream() {
            return Poll::Ready(None);
        }
        if this.deadline.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Some(Err(ParanoidError::RequestTimeout {
                timeout: this.timeout,
            })));
        }
        this.inner
            .as_mut()
            .poll_frame(cx)
            .map_err(|source| ParanoidError::Body { source })
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
