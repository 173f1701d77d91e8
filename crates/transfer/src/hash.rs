use sha1::{Digest, Sha1};

use crate::file::FileHandle;

/// Bytes read per step when hashing a file.
const HASH_READ_SIZE: u64 = 8 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes SHA-1 of `data` and returns the lowercase hex digest (40 chars).
pub fn digest_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-1 of a whole file, reading it in ranges.
pub async fn digest_file(file: &dyn FileHandle) -> std::io::Result<String> {
    let size = file.size();
    let mut hasher = Sha1::new();
    let mut offset = 0;
    while offset < size {
        let end = (offset + HASH_READ_SIZE).min(size);
        let buf = file.read_range(offset, end).await?;
        hasher.update(&buf);
        offset = end;
    }
    Ok(hex::encode(hasher.finalize()))
}
