use std::collections::BTreeMap;

use flaredrive_protocol::{CompletedPart, thumbnail_key};

use crate::TransferError;
use crate::hash::digest_bytes;

/// An in-progress multipart upload.
///
/// Parts are keyed by part number, so the order in which they complete has
/// no influence on the completion payload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    key: String,
    upload_id: String,
    part_count: u32,
    parts: BTreeMap<u32, String>,
}

impl UploadSession {
    /// Creates a session expecting `part_count` parts.
    pub fn new(key: impl Into<String>, upload_id: impl Into<String>, part_count: u32) -> Self {
        Self {
            key: key.into(),
            upload_id: upload_id.into(),
            part_count,
            parts: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn part_count(&self) -> u32 {
        self.part_count
    }

    /// Records the etag of a finished part.
    pub fn record_part(&mut self, part_number: u32, etag: String) -> Result<(), TransferError> {
        if part_number == 0 || part_number > self.part_count {
            return Err(TransferError::PartOutOfRange {
                part_number,
                parts: self.part_count,
            });
        }
        if self.parts.contains_key(&part_number) {
            return Err(TransferError::DuplicatePart { part_number });
        }
        self.parts.insert(part_number, etag);
        Ok(())
    }

    /// Number of parts recorded so far.
    pub fn recorded(&self) -> u32 {
        self.parts.len() as u32
    }

    /// Returns `true` once every part 1..=N has an etag.
    pub fn is_complete(&self) -> bool {
        self.recorded() == self.part_count
    }

    pub fn etag(&self, part_number: u32) -> Option<&str> {
        self.parts.get(&part_number).map(String::as_str)
    }

    /// Returns the completion payload, ascending by part number.
    ///
    /// Fails unless every expected part has been recorded.
    pub fn completed_parts(&self) -> Result<Vec<CompletedPart>, TransferError> {
        if !self.is_complete() {
            return Err(TransferError::IncompleteParts {
                expected: self.part_count,
                recorded: self.recorded(),
            });
        }
        Ok(self
            .parts
            .iter()
            .map(|(&part_number, etag)| CompletedPart {
                part_number,
                etag: etag.clone(),
            })
            .collect())
    }
}

/// A rendered thumbnail, identified by the SHA-1 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    pub digest: String,
    pub bytes: Vec<u8>,
}

impl ThumbnailRecord {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            digest: digest_bytes(&bytes),
            bytes,
        }
    }

    /// Storage key of this thumbnail.
    pub fn key(&self) -> String {
        thumbnail_key(&self.digest)
    }
}
