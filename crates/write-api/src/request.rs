use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use flaredrive_protocol::WRITE_ITEMS_PATH;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left as-is by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Path segment characters that need no escaping (RFC 3986 `pchar`).
const KEY_SEGMENT: &AsciiSet = &COMPONENT
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encodes a value the way `encodeURIComponent` does (`/` included).
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Percent-encodes a storage key for use in a URL path, keeping `/`.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins a directory prefix and a name into an object key.
///
/// An empty prefix is the drive root; a missing trailing `/` is tolerated.
pub fn object_key(base_directory: &str, name: &str) -> String {
    if base_directory.is_empty() || base_directory.ends_with('/') {
        format!("{base_directory}{name}")
    } else {
        format!("{base_directory}/{name}")
    }
}

/// Invoked with the cumulative number of body bytes handed to the network.
pub type SentCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// HTTP method of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// A transport-agnostic write request.
#[derive(Clone)]
pub struct WriteRequest {
    pub method: Method,
    /// Encoded path, starting with `/`.
    pub path: String,
    /// Query pairs; `None` renders a bare flag such as `?uploads`.
    pub query: Vec<(String, Option<String>)>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub on_sent: Option<SentCallback>,
}

impl WriteRequest {
    /// Creates a request for `/api/write/items/<key>`.
    pub fn item(method: Method, key: &str) -> Self {
        Self::raw(method, format!("{WRITE_ITEMS_PATH}{}", encode_key(key)))
    }

    /// Creates a request for an already-encoded path.
    pub fn raw(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            on_sent: None,
        }
    }

    pub fn flag(mut self, name: &str) -> Self {
        self.query.push((name.to_string(), None));
        self
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn on_sent(mut self, callback: Option<SentCallback>) -> Self {
        self.on_sent = callback;
        self
    }

    /// Renders the path and query string, e.g. `/api/write/items/a?uploads`.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| match value {
                Some(v) => format!("{}={}", encode_component(name), encode_component(v)),
                None => encode_component(name),
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }

    /// Returns the decoded object key for item routes.
    pub fn key(&self) -> Option<String> {
        let encoded = self.path.strip_prefix(WRITE_ITEMS_PATH)?;
        Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
    }

    /// Returns the value of a query parameter (`Some("")` for a bare flag).
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Returns the first header with the given (case-insensitive) name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteRequest")
            .field("method", &self.method)
            .field("path", &self.path_and_query())
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Status, headers and body of a write API response.
#[derive(Debug, Clone, Default)]
pub struct WriteResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WriteResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_component_escapes_slash() {
        assert_eq!(encode_component("a/x.txt"), "a%2Fx.txt");
        assert_eq!(encode_component("my file (1).txt"), "my%20file%20(1).txt");
    }

    #[test]
    fn encode_key_keeps_separators() {
        assert_eq!(encode_key("a/b c/d#e.txt"), "a/b%20c/d%23e.txt");
        assert_eq!(
            encode_key("_$flaredrive$/thumbnails/ab.png"),
            "_$flaredrive$/thumbnails/ab.png"
        );
    }

    #[test]
    fn object_key_joins_prefix() {
        assert_eq!(object_key("", "a.txt"), "a.txt");
        assert_eq!(object_key("docs/", "a.txt"), "docs/a.txt");
        assert_eq!(object_key("docs", "a.txt"), "docs/a.txt");
    }

    #[test]
    fn item_request_renders_flag_query() {
        let req = WriteRequest::item(Method::Post, "docs/big.iso").flag("uploads");
        assert_eq!(req.path_and_query(), "/api/write/items/docs/big.iso?uploads");
        assert_eq!(req.query_value("uploads"), Some(""));
    }

    #[test]
    fn item_request_renders_params_in_order() {
        let req = WriteRequest::item(Method::Put, "big.iso")
            .param("partNumber", 2)
            .param("uploadId", "a+b/c");
        assert_eq!(
            req.path_and_query(),
            "/api/write/items/big.iso?partNumber=2&uploadId=a%2Bb%2Fc"
        );
        assert_eq!(req.query_value("uploadId"), Some("a+b/c"));
    }

    #[test]
    fn key_roundtrips_through_path() {
        let req = WriteRequest::item(Method::Put, "photos/summer trip/1.jpg");
        assert_eq!(req.key().as_deref(), Some("photos/summer trip/1.jpg"));
        assert!(WriteRequest::raw(Method::Get, "/api/write/").key().is_none());
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = WriteRequest::item(Method::Put, "a").header("Content-Type", "text/plain");
        assert_eq!(req.header_value("content-type"), Some("text/plain"));

        let resp = WriteResponse::new(200).with_header("ETag", "\"abc\"");
        assert_eq!(resp.header("etag"), Some("\"abc\""));
    }

    #[test]
    fn response_status_classes() {
        assert!(WriteResponse::new(204).is_success());
        assert!(WriteResponse::new(302).is_redirect());
        assert!(!WriteResponse::new(500).is_success());
    }
}
