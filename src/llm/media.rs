use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tempfile::TempPath;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to read image file: {0}")]
    Io(#[from] io::Error),
    #[error("downloaded file is empty")]
    Empty,
    #[error("file is not a supported image: {0}")]
    Decode(#[from] image::ImageError),
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

fn is_inline_image_mime(mime_type: &str) -> bool {
    matches!(mime_type, "image/png" | "image/jpeg" | "image/webp")
}

#[derive(Debug, Clone)]
pub struct ImagePart {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A downloaded asset on local disk. The file is deleted by [`TransientFile::remove`]
/// or, on any other path, when the value is dropped.
#[derive(Debug)]
pub struct TransientFile {
    path: TempPath,
}

impl TransientFile {
    pub fn create_in(dir: &Path, prefix: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let file = tempfile::Builder::new().prefix(prefix).tempfile_in(dir)?;
        Ok(TransientFile {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) {
        let path: PathBuf = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => debug!("Removed transient file {}", path.display()),
            Err(err) => warn!("Failed to remove transient file {}: {err}", path.display()),
        }
    }
}

/// Reads and decodes an image. Formats Gemini accepts inline are passed
/// through untouched, anything else decodable is re-encoded as PNG.
pub async fn load_image(path: &Path) -> Result<ImagePart, MediaError> {
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    let decoded = image::load_from_memory(&bytes)?;
    if let Some(mime_type) = detect_mime_type(&bytes).filter(|mime| is_inline_image_mime(mime)) {
        return Ok(ImagePart { mime_type, bytes });
    }

    let mut encoded = Cursor::new(Vec::new());
    decoded.write_to(&mut encoded, ImageFormat::Png)?;
    Ok(ImagePart {
        mime_type: "image/png".to_string(),
        bytes: encoded.into_inner(),
    })
}

#[cfg(test)]
pub(crate) fn png_fixture() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 120, 40]));
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .expect("encode png fixture");
    encoded.into_inner()
}
