//! Write API request builder.
//!
//! Wraps a [`Transport`] and turns each drive operation into the request
//! shape the server expects.

use std::sync::Arc;

use bytes::Bytes;
use flaredrive_protocol::{
    COPY_SOURCE_HEADER, CompletedPart, DEFAULT_CONTENT_TYPE, DIRECTORY_CONTENT_TYPE, ETAG_HEADER,
    InitiateMultipartResponse, PART_NUMBER_QUERY, THUMBNAIL_HEADER, UPLOAD_ID_QUERY, UPLOADS_QUERY,
    WRITE_ROOT_PATH,
};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::request::{Method, SentCallback, WriteRequest, WriteResponse, encode_component, object_key};
use crate::transport::{HttpTransport, Transport};
use crate::validation::validate_folder_name;

/// Maximum number of response body bytes kept in a status error.
const ERROR_BODY_LIMIT: usize = 512;

/// Headers attached to an object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub content_type: String,
    /// Digest of the object's thumbnail, sent as `fd-thumbnail`.
    pub thumbnail: Option<String>,
}

impl ObjectHeaders {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, digest: impl Into<String>) -> Self {
        self.thumbnail = Some(digest.into());
        self
    }

    fn apply(&self, mut request: WriteRequest) -> WriteRequest {
        let content_type = if self.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            self.content_type.as_str()
        };
        request = request.header("content-type", content_type);
        if let Some(digest) = &self.thumbnail {
            request = request.header(THUMBNAIL_HEADER, digest.clone());
        }
        request
    }
}

impl Default for ObjectHeaders {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPE)
    }
}

/// Result of the session probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server redirected; the host should navigate to this location.
    Redirect(String),
    /// No redirect; carries the response status.
    NoRedirect(u16),
}

/// Client for the write API.
#[derive(Clone)]
pub struct WriteApiClient {
    transport: Arc<dyn Transport>,
}

impl WriteApiClient {
    /// Creates a client on top of an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Creates a client that talks HTTP to `base_url`.
    pub fn http(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(HttpTransport::new(base_url)?)))
    }

    /// Sends a request, turning non-success statuses into errors.
    async fn send(&self, request: WriteRequest) -> Result<WriteResponse, ApiError> {
        let path = request.path_and_query();
        let method = request.method;
        let resp = self.transport.send(request).await?;
        if !resp.is_success() {
            let mut body = String::from_utf8_lossy(&resp.body).into_owned();
            body.truncate(floor_char_boundary(&body, ERROR_BODY_LIMIT));
            return Err(ApiError::Status {
                status: resp.status,
                path,
                body,
            });
        }
        debug!(method = method.as_str(), path = %path, status = resp.status, "write ok");
        Ok(resp)
    }

    /// Stores `body` under `key` with a single PUT.
    pub async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        headers: &ObjectHeaders,
        on_sent: Option<SentCallback>,
    ) -> Result<(), ApiError> {
        let request = headers
            .apply(WriteRequest::item(Method::Put, key))
            .body(body)
            .on_sent(on_sent);
        self.send(request).await?;
        Ok(())
    }

    /// Starts a multipart upload and returns its upload id.
    pub async fn initiate_multipart(
        &self,
        key: &str,
        headers: &ObjectHeaders,
    ) -> Result<String, ApiError> {
        let request = headers.apply(WriteRequest::item(Method::Post, key).flag(UPLOADS_QUERY));
        let resp = self.send(request).await?;
        let parsed: InitiateMultipartResponse = serde_json::from_slice(&resp.body)?;
        Ok(parsed.upload_id)
    }

    /// Uploads one part and returns the etag the store assigned to it.
    pub async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        on_sent: Option<SentCallback>,
    ) -> Result<String, ApiError> {
        let request = WriteRequest::item(Method::Put, key)
            .param(PART_NUMBER_QUERY, part_number)
            .param(UPLOAD_ID_QUERY, upload_id)
            .body(body)
            .on_sent(on_sent);
        let resp = self.send(request).await?;
        resp.header(ETAG_HEADER)
            .filter(|etag| !etag.is_empty())
            .map(str::to_string)
            .ok_or(ApiError::MissingEtag { part_number })
    }

    /// Finalizes a multipart upload from its recorded parts.
    pub async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), ApiError> {
        let body = serde_json::to_vec(parts)?;
        let request = WriteRequest::item(Method::Post, key)
            .param(UPLOAD_ID_QUERY, upload_id)
            .header("content-type", "application/json")
            .body(body);
        self.send(request).await?;
        Ok(())
    }

    /// Copies `source` to `target` on the server. No object bytes are
    /// transferred by the client.
    pub async fn copy_object(&self, source: &str, target: &str) -> Result<(), ApiError> {
        let request = WriteRequest::item(Method::Put, target)
            .header(COPY_SOURCE_HEADER, encode_component(source));
        self.send(request).await?;
        Ok(())
    }

    /// Deletes the object stored under `key`.
    pub async fn delete_object(&self, key: &str) -> Result<(), ApiError> {
        self.send(WriteRequest::item(Method::Delete, key)).await?;
        Ok(())
    }

    /// Moves `source` to `target` (server-side copy, then delete).
    pub async fn move_object(&self, source: &str, target: &str) -> Result<(), ApiError> {
        if source == target {
            return Ok(());
        }
        self.copy_object(source, target).await?;
        self.delete_object(source).await
    }

    /// Creates the folder `name` inside `base_directory` and returns its key.
    ///
    /// Invalid names are rejected before any request is sent.
    pub async fn create_folder(
        &self,
        base_directory: &str,
        name: &str,
    ) -> Result<String, ApiError> {
        validate_folder_name(name)?;
        let key = object_key(base_directory, name);
        let request = WriteRequest::item(Method::Put, &key)
            .header("content-type", DIRECTORY_CONTENT_TYPE);
        self.send(request).await?;
        Ok(key)
    }

    /// Probes the write root to detect an expired session.
    pub async fn probe_session(&self) -> Result<ProbeOutcome, ApiError> {
        let resp = self
            .transport
            .send(WriteRequest::raw(Method::Get, WRITE_ROOT_PATH))
            .await?;
        match resp.header("location") {
            Some(location) if resp.is_redirect() => Ok(ProbeOutcome::Redirect(location.to_string())),
            _ => Ok(ProbeOutcome::NoRedirect(resp.status)),
        }
    }

    /// Runs the probe after a failed request.
    ///
    /// Returns the redirect target if the host should navigate; probe failures
    /// are logged and swallowed.
    pub async fn recover_session(&self) -> Option<String> {
        match self.probe_session().await {
            Ok(ProbeOutcome::Redirect(location)) => {
                warn!(location = %location, "write API redirected, session needs recovery");
                Some(location)
            }
            Ok(ProbeOutcome::NoRedirect(status)) => {
                debug!(status, "session probe returned no redirect");
                None
            }
            Err(e) => {
                warn!(error = %e, "session probe failed");
                None
            }
        }
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn client_with(transport: &Arc<MockTransport>) -> WriteApiClient {
        WriteApiClient::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    #[tokio::test]
    async fn put_object_sends_headers() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let headers = ObjectHeaders::new("image/png").with_thumbnail("abc123");
        client
            .put_object("pics/cat.png", Bytes::from_static(b"png"), &headers, None)
            .await
            .unwrap();

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, Method::Put);
        assert_eq!(reqs[0].path, "/api/write/items/pics/cat.png");
        assert_eq!(reqs[0].header("content-type"), Some("image/png"));
        assert_eq!(reqs[0].header("fd-thumbnail"), Some("abc123"));
        assert_eq!(&reqs[0].body[..], b"png");
    }

    #[tokio::test]
    async fn put_object_without_thumbnail_omits_header() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        client
            .put_object("a.bin", Bytes::new(), &ObjectHeaders::default(), None)
            .await
            .unwrap();

        let reqs = transport.requests();
        assert!(reqs[0].header("fd-thumbnail").is_none());
        assert_eq!(reqs[0].header("content-type"), Some(DEFAULT_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn initiate_multipart_parses_upload_id() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let id = client
            .initiate_multipart("big.iso", &ObjectHeaders::default())
            .await
            .unwrap();
        assert_eq!(id, "upload-1");

        let reqs = transport.requests();
        assert!(reqs[0].is_initiate());
        assert_eq!(reqs[0].query_value("uploads"), Some(""));
    }

    #[tokio::test]
    async fn upload_part_returns_etag() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let etag = client
            .upload_part("big.iso", "upload-1", 3, Bytes::from_static(b"xyz"), None)
            .await
            .unwrap();
        assert_eq!(etag, "etag-3");

        let reqs = transport.requests();
        assert_eq!(reqs[0].part_number(), Some(3));
        assert_eq!(reqs[0].query_value("uploadId"), Some("upload-1"));
    }

    #[tokio::test]
    async fn upload_part_without_etag_fails() {
        let transport = MockTransport::new(|_| Ok(WriteResponse::new(200))).shared();
        let client = client_with(&transport);

        let err = client
            .upload_part("big.iso", "u", 1, Bytes::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingEtag { part_number: 1 }));
    }

    #[tokio::test]
    async fn complete_multipart_posts_part_list() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let parts = vec![
            CompletedPart {
                part_number: 1,
                etag: "etag-1".into(),
            },
            CompletedPart {
                part_number: 2,
                etag: "etag-2".into(),
            },
        ];
        client
            .complete_multipart("big.iso", "upload-1", &parts)
            .await
            .unwrap();

        let reqs = transport.requests();
        assert_eq!(reqs[0].method, Method::Post);
        assert_eq!(reqs[0].query_value("uploadId"), Some("upload-1"));
        let sent: Vec<CompletedPart> = serde_json::from_slice(&reqs[0].body).unwrap();
        assert_eq!(sent, parts);
    }

    #[tokio::test]
    async fn copy_sends_single_put_with_encoded_source() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        client.copy_object("a/x.txt", "b/x.txt").await.unwrap();

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, Method::Put);
        assert_eq!(reqs[0].key.as_deref(), Some("b/x.txt"));
        assert_eq!(reqs[0].header("x-amz-copy-source"), Some("a%2Fx.txt"));
        assert_eq!(reqs[0].body_len, 0);
        assert!(reqs.iter().all(|r| r.method != Method::Get));
    }

    #[tokio::test]
    async fn move_copies_then_deletes() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        client.move_object("a/x.txt", "b/x.txt").await.unwrap();

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].method, Method::Put);
        assert_eq!(reqs[1].method, Method::Delete);
        assert_eq!(reqs[1].key.as_deref(), Some("a/x.txt"));
    }

    #[tokio::test]
    async fn move_stops_when_copy_fails() {
        let transport = MockTransport::failing_when(|r| r.method == Method::Put).shared();
        let client = client_with(&transport);

        assert!(client.move_object("a/x.txt", "b/x.txt").await.is_err());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn create_folder_marks_directory() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let key = client.create_folder("docs/", "reports").await.unwrap();
        assert_eq!(key, "docs/reports");

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].header("content-type"), Some("application/x-directory"));
    }

    #[tokio::test]
    async fn create_folder_with_separator_sends_nothing() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let err = client.create_folder("", "a/b").await.unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn status_errors_carry_path() {
        let transport = MockTransport::new(|_| Ok(WriteResponse::new(403).with_body("denied"))).shared();
        let client = client_with(&transport);

        let err = client.delete_object("secret.txt").await.unwrap_err();
        match err {
            ApiError::Status { status, path, body } => {
                assert_eq!(status, 403);
                assert_eq!(path, "/api/write/items/secret.txt");
                assert_eq!(body, "denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn probe_reports_redirect_location() {
        let transport = MockTransport::new(|_| {
            Ok(WriteResponse::new(302).with_header("Location", "/cdn-cgi/access/login"))
        })
        .shared();
        let client = client_with(&transport);

        assert_eq!(
            client.probe_session().await.unwrap(),
            ProbeOutcome::Redirect("/cdn-cgi/access/login".into())
        );
        assert_eq!(
            client.recover_session().await.as_deref(),
            Some("/cdn-cgi/access/login")
        );
        let reqs = transport.requests();
        assert_eq!(reqs[0].method, Method::Get);
        assert_eq!(reqs[0].path, "/api/write/");
    }

    #[tokio::test]
    async fn probe_without_redirect_is_swallowed() {
        let transport = MockTransport::new(|_| Ok(WriteResponse::new(401))).shared();
        let client = client_with(&transport);

        assert_eq!(
            client.probe_session().await.unwrap(),
            ProbeOutcome::NoRedirect(401)
        );
        assert!(client.recover_session().await.is_none());
    }

    #[tokio::test]
    async fn probe_transport_failure_is_swallowed() {
        let transport =
            MockTransport::new(|_| Err(ApiError::Transport("connection reset".into()))).shared();
        let client = client_with(&transport);

        assert!(client.recover_session().await.is_none());
    }

    #[test]
    fn floor_char_boundary_respects_utf8() {
        let s = "ééé";
        assert_eq!(floor_char_boundary(s, 3), 2);
        assert_eq!(floor_char_boundary(s, 100), s.len());
    }
}
