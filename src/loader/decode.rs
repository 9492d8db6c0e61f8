/// Background image decoding
///
/// A `LoadRequest` is produced by the coordinator and run by the host
/// on tokio's blocking pool. The result comes back as a `LoadOutcome`
/// which the coordinator validates before touching any record.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task;

use super::cancel::CancelFlag;
use crate::state::data::DecodedImage;

/// Why an image could not be loaded
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The file disappeared between catalog scan and decode
    #[error("file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Arc<image::ImageError>,
    },
    #[error("load was cancelled")]
    Cancelled,
    #[error("decode task failed: {0}")]
    Join(String),
}

/// Identity of a single load
///
/// `serial` is never reused by a coordinator, `generation` changes on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: usize,
    pub generation: u64,
    pub serial: u64,
}

/// A load the host has to run
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub path: PathBuf,
    /// Longest side of the decoded image, in pixels
    pub max_dimension: u32,
    pub cancel: CancelFlag,
}

/// The result of running a `LoadRequest`
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<DecodedImage, LoadError>,
}

impl LoadRequest {
    /// Decode the image without blocking the caller's thread
    pub async fn run(self) -> LoadOutcome {
        let ticket = self.ticket;

        // Skip the disk entirely if the row scrolled away before we started
        if self.cancel.is_cancelled() {
            return LoadOutcome {
                ticket,
                result: Err(LoadError::Cancelled),
            };
        }

        let result = task::spawn_blocking(move || {
            decode_unless_cancelled(&self.path, self.max_dimension, &self.cancel)
        })
        .await
        .unwrap_or_else(|e| Err(LoadError::Join(e.to_string())));

        LoadOutcome { ticket, result }
    }
}

/// Decode, then drop the pixels if the load was cancelled meanwhile
fn decode_unless_cancelled(
    path: &Path,
    max_dimension: u32,
    cancel: &CancelFlag,
) -> Result<DecodedImage, LoadError> {
    let decoded = decode_blocking(path, max_dimension)?;
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    Ok(decoded)
}

/// Blocking implementation of image decoding
pub fn decode_blocking(path: &Path, max_dimension: u32) -> Result<DecodedImage, LoadError> {
    // Verify file exists
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(source) if source.kind() == io::ErrorKind::NotFound => {
            LoadError::Missing(path.to_path_buf())
        }
        image::ImageError::IoError(source) => LoadError::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        },
        other => LoadError::Decode {
            path: path.to_path_buf(),
            source: Arc::new(other),
        },
    })?;

    // Rows are small, so there is no point keeping full resolution pixels around
    let img = if max_dimension > 0 && img.width().max(img.height()) > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage::from_rgba(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: PathBuf, max_dimension: u32) -> LoadRequest {
        LoadRequest {
            ticket: LoadTicket {
                id: 0,
                generation: 0,
                serial: 1,
            },
            path,
            max_dimension,
            cancel: CancelFlag::new(),
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
            .save(path)
            .unwrap();
    }

    #[tokio::test]
    async fn test_decode_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, 8, 4);

        let outcome = request(path, 512).run().await;
        let image = outcome.result.unwrap();

        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(outcome.ticket.serial, 1);
    }

    #[tokio::test]
    async fn test_large_images_are_downsized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        write_png(&path, 64, 32);

        let image = request(path, 16).run().await.result.unwrap();

        assert_eq!((image.width, image.height), (16, 8));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = request(dir.path().join("gone.png"), 512).run().await;

        assert!(matches!(outcome.result, Err(LoadError::Missing(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let outcome = request(path, 512).run().await;

        assert!(matches!(outcome.result, Err(LoadError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, 2, 2);

        let req = request(path, 512);
        req.cancel.cancel();

        assert!(matches!(req.run().await.result, Err(LoadError::Cancelled)));
    }

    #[test]
    fn test_cancelled_during_decode_drops_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, 2, 2);

        // The flag flips while the decode is running: the image is decoded
        // fine but must not be handed back
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = decode_unless_cancelled(&path, 512, &cancel);
        assert!(matches!(result, Err(LoadError::Cancelled)));

        let result = decode_unless_cancelled(&path, 512, &CancelFlag::new());
        assert_eq!(result.unwrap().width, 2);
    }

    #[tokio::test]
    async fn test_cancel_after_spawn_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, 2, 2);

        let cancel = CancelFlag::new();
        let worker = cancel.clone();
        let result = task::spawn_blocking(move || {
            worker.cancel();
            decode_unless_cancelled(&path, 512, &worker)
        })
        .await
        .unwrap();

        assert!(cancel.is_cancelled());
        assert!(matches!(result, Err(LoadError::Cancelled)));
    }
}
