//! Response caching middleware.
//!
//! Serves a stored response on hit without calling the handler. On miss the
//! handler's response goes straight through to the client; bodies small
//! enough to cache are copied as they stream past and stored once complete.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use axum::{
    body::{Body, BodyDataStream, Bytes, HttpBody},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheProvider, MAX_VALUE_SIZE};
use crate::keys;

/// Header carrying `HIT` or `MISS`.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
/// Header carrying the resolved cache key.
pub const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");

/// Response headers never replayed from the cache.
const UNCACHED_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-authenticate",
    "set-cookie",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "x-cache",
    "x-cache-key",
];

type KeyFn = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// State for [`cache_response`]: the provider, how to derive a key from a
/// request, and the TTL for stored responses.
#[derive(Clone)]
pub struct ResponseCache {
    provider: Arc<CacheProvider>,
    key_fn: KeyFn,
    ttl: Option<Duration>,
}

impl ResponseCache {
    pub fn new<F>(provider: Arc<CacheProvider>, key_fn: F, ttl: Option<Duration>) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        Self {
            provider,
            key_fn: Arc::new(key_fn),
            ttl,
        }
    }

    /// Keys responses by method, path and sorted query string.
    pub fn by_uri(provider: Arc<CacheProvider>, ttl: Option<Duration>) -> Self {
        Self::new(
            provider,
            |req: &Request| keys::response(req.method().as_str(), req.uri().path(), req.uri().query()),
            ttl,
        )
    }
}

/// A response as stored in the cache.
///
/// End-to-end headers are kept. Hop-by-hop headers, `Content-Length` and
/// `Set-Cookie` are dropped, so a replayed response never hands one client's
/// cookies to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        headers.remove(header::CONTENT_TYPE);
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        response
    }
}

fn stored_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !UNCACHED_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn mark(mut response: Response, outcome: &'static str, key: &str) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_CACHE, HeaderValue::from_static(outcome));
    if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert(X_CACHE_KEY, value);
    }
    response
}

// == Capture ==
/// Everything needed to store a response once its body has been seen.
struct CacheWrite {
    provider: Arc<CacheProvider>,
    key: String,
    ttl: Option<Duration>,
    status: u16,
    headers: Vec<(String, String)>,
}

impl CacheWrite {
    /// Stores the completed body from a detached task.
    fn spawn(self, bytes: Vec<u8>) {
        let CacheWrite {
            provider,
            key,
            ttl,
            status,
            headers,
        } = self;

        let body = match String::from_utf8(bytes) {
            Ok(body) => body,
            Err(_) => {
                debug!(key = %key, "response body is not UTF-8, not caching");
                return;
            }
        };

        let cached = CachedResponse {
            status,
            headers,
            body,
        };
        tokio::spawn(async move {
            if let Err(e) = provider.set(&key, &cached, ttl).await {
                warn!(key = %key, error = %e, "failed to cache response");
            }
        });
    }
}

/// Body stream that forwards every chunk untouched and keeps a copy.
///
/// The copy is stored when the body ends cleanly. A body error is passed on
/// to the client as-is and nothing is stored; so is a body that grows past
/// `MAX_VALUE_SIZE`, or one that is dropped before it ends.
struct Capture {
    inner: BodyDataStream,
    buffer: Vec<u8>,
    write: Option<CacheWrite>,
}

impl Capture {
    fn new(body: Body, write: CacheWrite) -> Self {
        Self {
            inner: body.into_data_stream(),
            buffer: Vec::new(),
            write: Some(write),
        }
    }

    fn abandon(&mut self) {
        self.write = None;
        self.buffer = Vec::new();
    }
}

impl Stream for Capture {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(Pin::new(&mut this.inner).poll_next(cx));

        match &item {
            Some(Ok(chunk)) if this.write.is_some() => {
                if this.buffer.len() + chunk.len() > MAX_VALUE_SIZE {
                    debug!("response body grew past the cache limit, not caching");
                    this.abandon();
                } else {
                    this.buffer.extend_from_slice(chunk);
                }
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                if let Some(write) = &this.write {
                    warn!(key = %write.key, error = %e, "response body failed, not caching");
                }
                this.abandon();
            }
            None => {
                if let Some(write) = this.write.take() {
                    write.spawn(std::mem::take(&mut this.buffer));
                }
            }
        }

        Poll::Ready(item)
    }
}

/// Response caching middleware.
///
/// Install with `axum::middleware::from_fn_with_state(cache, cache_response)`.
/// Only 2xx responses whose body length is known up front and within
/// `MAX_VALUE_SIZE` are considered for caching; anything else, streams
/// included, passes through unchanged.
pub async fn cache_response(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    let key = (cache.key_fn)(&request);

    if let Some(cached) = cache.provider.get::<CachedResponse>(&key).await {
        debug!(key = %key, "serving cached response");
        return mark(cached.into_response(), "HIT", &key);
    }

    let response = next.run(request).await;
    if !response.status().is_success() {
        return mark(response, "MISS", &key);
    }

    let (parts, body) = response.into_parts();
    let cacheable = body
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_VALUE_SIZE as u64);
    if !cacheable {
        debug!(key = %key, "response body unbounded or too large, not caching");
        return mark(Response::from_parts(parts, body), "MISS", &key);
    }

    let write = CacheWrite {
        provider: Arc::clone(&cache.provider),
        key: key.clone(),
        ttl: cache.ttl,
        status: parts.status.as_u16(),
        headers: stored_headers(&parts.headers),
    };
    let body = Body::from_stream(Capture::new(body, write));
    mark(Response::from_parts(parts, body), "MISS", &key)
}
