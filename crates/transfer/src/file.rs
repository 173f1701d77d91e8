//! Readable file sources for uploads.

use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use flaredrive_protocol::detect_content_type;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Boxed future returned by [`FileHandle::read_range`].
pub type ReadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<u8>>> + Send + 'a>>;

/// A file selected for upload.
///
/// Implemented for local files and in-memory buffers; hosts may provide
/// their own (e.g. a browser `File` bridge).
pub trait FileHandle: Send + Sync {
    /// File name without directory.
    fn name(&self) -> &str;

    /// Size in bytes.
    fn size(&self) -> u64;

    /// Declared media type, e.g. `image/png`.
    fn media_type(&self) -> &str;

    /// Reads bytes `[start, end)`.
    fn read_range(&self, start: u64, end: u64) -> ReadFuture<'_>;
}

fn check_range(start: u64, end: u64, size: u64) -> io::Result<()> {
    if start > end || end > size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("range {start}..{end} outside file of {size} bytes"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LocalFile
// ---------------------------------------------------------------------------

/// A file on the local filesystem. Each read opens the file anew so that
/// concurrent part reads do not share a cursor.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
    media_type: String,
}

impl LocalFile {
    /// Opens `path`, taking its size now and guessing the media type from
    /// the extension.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = detect_content_type(&name).to_string();
        Ok(Self {
            path,
            name,
            size: metadata.len(),
            media_type,
        })
    }

    /// Overrides the guessed media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn read_range(&self, start: u64, end: u64) -> ReadFuture<'_> {
        Box::pin(async move {
            check_range(start, end, self.size)?;
            let mut file = tokio::fs::File::open(&self.path).await?;
            file.seek(SeekFrom::Start(start)).await?;
            let mut buf = vec![0u8; (end - start) as usize];
            file.read_exact(&mut buf).await?;
            Ok(buf)
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryFile
// ---------------------------------------------------------------------------

/// An in-memory file, e.g. a rendered thumbnail or test fixture.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    media_type: String,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn read_range(&self, start: u64, end: u64) -> ReadFuture<'_> {
        Box::pin(async move {
            check_range(start, end, self.size())?;
            Ok(self.data[start as usize..end as usize].to_vec())
        })
    }
}
