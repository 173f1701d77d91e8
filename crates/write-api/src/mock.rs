//! In-memory transport that records every request.
//!
//! [`MockTransport::object_store`] answers like a minimal write API: multipart
//! initiation returns an upload id, part uploads return `etag-<n>`, every
//! other request succeeds with an empty body.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use flaredrive_protocol::{PART_NUMBER_QUERY, UPLOADS_QUERY};

use crate::error::ApiError;
use crate::request::{Method, WriteRequest, WriteResponse};
use crate::transport::{Transport, TransportFuture};

/// Bodies larger than this are not retained by the recorder.
const MAX_RECORDED_BODY: usize = 64 * 1024;

/// A request as seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    /// Decoded object key, for item routes.
    pub key: Option<String>,
    pub query: Vec<(String, Option<String>)>,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// Empty when the body exceeded the recording limit.
    pub body: Bytes,
}

impl RecordedRequest {
    fn from_request(request: &WriteRequest) -> Self {
        Self {
            method: request.method,
            path: request.path.clone(),
            key: request.key(),
            query: request.query.clone(),
            headers: request.headers.clone(),
            body_len: request.body.len(),
            body: if request.body.len() <= MAX_RECORDED_BODY {
                request.body.clone()
            } else {
                Bytes::new()
            },
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn part_number(&self) -> Option<u32> {
        self.query_value(PART_NUMBER_QUERY)?.parse().ok()
    }

    pub fn is_initiate(&self) -> bool {
        self.method == Method::Post && self.query_value(UPLOADS_QUERY).is_some()
    }
}

type Handler = Box<dyn Fn(&RecordedRequest) -> Result<WriteResponse, ApiError> + Send + Sync>;
type Delay = Box<dyn Fn(&RecordedRequest) -> Duration + Send + Sync>;

/// Recording transport with a pluggable responder.
pub struct MockTransport {
    handler: Handler,
    delay: Option<Delay>,
    log: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Creates a transport that answers every request with `handler`.
    pub fn new(
        handler: impl Fn(&RecordedRequest) -> Result<WriteResponse, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            log: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Creates a transport behaving like a healthy write API.
    pub fn object_store() -> Self {
        Self::new(object_store_reply)
    }

    /// Creates a transport behaving like [`object_store`](Self::object_store)
    /// except that requests matching `fail` get a 500.
    pub fn failing_when(
        fail: impl Fn(&RecordedRequest) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |req| {
            if fail(req) {
                Ok(WriteResponse::new(500).with_body("injected failure"))
            } else {
                object_store_reply(req)
            }
        })
    }

    /// Delays each response by `delay(request)` before answering.
    pub fn with_delay(
        mut self,
        delay: impl Fn(&RecordedRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Wraps the transport in an `Arc` for sharing with a client.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns all requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Returns the highest number of simultaneously outstanding requests.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: WriteRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let recorded = RecordedRequest::from_request(&request);
            self.log.lock().unwrap().push(recorded.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = &self.delay {
                let d = delay(&recorded);
                if !d.is_zero() {
                    tokio::time::sleep(d).await;
                }
            }

            let result = (self.handler)(&recorded);
            if let (Ok(resp), Some(on_sent)) = (&result, &request.on_sent) {
                if resp.is_success() {
                    on_sent(request.body.len() as u64);
                }
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

fn object_store_reply(req: &RecordedRequest) -> Result<WriteResponse, ApiError> {
    if req.is_initiate() {
        return Ok(WriteResponse::new(200).with_body(r#"{"uploadId":"upload-1"}"#));
    }
    if let Some(n) = req.part_number() {
        return Ok(WriteResponse::new(200).with_header("etag", format!("etag-{n}")));
    }
    Ok(WriteResponse::new(200))
}
