//! HTTP client for the FlareDrive write API.
//!
//! All writes go through `/api/write/items/<key>`; multipart control
//! parameters travel in the query string. The [`Transport`] trait is the seam
//! between request building and the network, so the transfer engine and the
//! queue can be exercised against an in-memory store.

mod client;
mod error;
mod request;
mod transport;
mod validation;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{ObjectHeaders, ProbeOutcome, WriteApiClient};
pub use error::ApiError;
pub use request::{
    Method, SentCallback, WriteRequest, WriteResponse, encode_component, encode_key, object_key,
};
pub use transport::{HttpTransport, Transport, TransportFuture};
pub use validation::validate_folder_name;
