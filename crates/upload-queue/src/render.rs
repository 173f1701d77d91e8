//! Thumbnail rendering capability.

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;

use flaredrive_protocol::{MediaKind, THUMBNAIL_SIZE};
use flaredrive_transfer::FileHandle;
use image::ImageOutputFormat;
use image::imageops::FilterType;

use crate::error::RenderError;

/// Boxed future returned by [`ThumbnailRenderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, RenderError>> + Send + 'a>>;

/// Produces a small PNG preview of a file.
///
/// Hosts plug in whatever they can decode; the queue treats every failure as
/// "no thumbnail".
pub trait ThumbnailRenderer: Send + Sync {
    fn render<'a>(&'a self, file: &'a dyn FileHandle) -> RenderFuture<'a>;
}

/// Renders raster images to a square PNG of [`THUMBNAIL_SIZE`] pixels.
///
/// Video and PDF sources are reported as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageThumbnailRenderer;

impl ImageThumbnailRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ThumbnailRenderer for ImageThumbnailRenderer {
    fn render<'a>(&'a self, file: &'a dyn FileHandle) -> RenderFuture<'a> {
        Box::pin(async move {
            if MediaKind::classify(file.media_type()) != MediaKind::Image {
                return Err(RenderError::Unsupported(file.media_type().to_string()));
            }
            let source = file.read_range(0, file.size()).await?;

            tokio::task::spawn_blocking(move || render_png(&source))
                .await
                .map_err(|e| RenderError::Decode(e.to_string()))?
        })
    }
}

fn render_png(source: &[u8]) -> Result<Vec<u8>, RenderError> {
    let image = image::load_from_memory(source)?;
    let thumb = image.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    thumb.write_to(&mut out, ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}
