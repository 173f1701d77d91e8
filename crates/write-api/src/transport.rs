//! Network seam of the write API.
//!
//! [`HttpTransport`] talks to a real deployment using `reqwest`. Redirects are
//! not followed so that the session probe can observe them.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use tracing::debug;

use crate::error::ApiError;
use crate::request::{Method, SentCallback, WriteRequest, WriteResponse};

/// Size of the body slices handed to the network when progress is tracked.
const STREAM_SLICE: usize = 256 * 1024;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<WriteResponse, ApiError>> + Send + 'a>>;

/// Sends write requests somewhere.
///
/// Non-success statuses are returned as responses, not errors; the client
/// decides which statuses are failures.
pub trait Transport: Send + Sync {
    fn send(&self, request: WriteRequest) -> TransportFuture<'_>;
}

/// `reqwest`-backed transport rooted at a deployment base URL.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for e.g. `https://drive.example.com`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(&self, request: WriteRequest) -> Result<WriteResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path_and_query());
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.method != Method::Get {
            let len = request.body.len();
            builder = match request.on_sent {
                Some(on_sent) => builder
                    .header(CONTENT_LENGTH, len)
                    .body(progress_body(request.body, on_sent)),
                None => builder.body(request.body),
            };
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?.to_vec();

        debug!(url = %url, status, "write API response");
        Ok(WriteResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: WriteRequest) -> TransportFuture<'_> {
        Box::pin(self.execute(request))
    }
}

/// Wraps `body` in a stream that reports cumulative bytes as slices are polled.
fn progress_body(body: Bytes, on_sent: SentCallback) -> reqwest::Body {
    let len = body.len();
    let mut sent = 0u64;
    let slices = (0..len).step_by(STREAM_SLICE).map(move |start| {
        let slice = body.slice(start..(start + STREAM_SLICE).min(len));
        sent += slice.len() as u64;
        on_sent(sent);
        Ok::<Bytes, std::io::Error>(slice)
    });
    reqwest::Body::wrap_stream(futures_util::stream::iter(slices))
}
