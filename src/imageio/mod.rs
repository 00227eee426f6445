//! Serialization of finished accumulations.
//!
//! PPM and PNG reproduce the pixel values exactly. JPEG is written at a fixed
//! quality of [`ImageEncoder::JPEG_QUALITY`] and is lossy, so JPEG output does not
//! round-trip.

use std::fmt;
use std::io::Write;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder as _};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Error, Result};
use crate::film::{FinalImage, FrameAccumulator};

pub mod ppm;

pub use ppm::{parse_ppm, write_ppm, DecodedPpm};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Ppm,
    Png,
    Jpg,
    /// Recognized, but there is no encoder for it.
    Bmp,
}

impl ImageFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ppm" => Some(ImageFormat::Ppm),
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpg),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }

    pub fn is_lossless(self) -> bool {
        !matches!(self, ImageFormat::Jpg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Ppm => "PPM",
            ImageFormat::Png => "PNG",
            ImageFormat::Jpg => "JPEG",
            ImageFormat::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

/// What to do with a format name that is not recognized at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatFallback {
    /// Write plain-text PPM instead.
    #[default]
    PlainText,
    /// Fail with `Error::UnrecognizedFormat`.
    Reject,
}

pub struct ImageEncoder {
    fallback: FormatFallback,
    provenance: String,
}

impl ImageEncoder {
    pub const JPEG_QUALITY: u8 = 100;

    pub fn new(fallback: FormatFallback) -> Self {
        Self {
            fallback,
            provenance: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    pub fn fallback(&self) -> FormatFallback {
        self.fallback
    }

    pub fn resolve_format(&self, name: &str) -> Result<ImageFormat> {
        match (ImageFormat::from_name(name), self.fallback) {
            (Some(format), _) => Ok(format),
            (None, FormatFallback::PlainText) => {
                tracing::warn!(format = name, "unrecognized image format, writing PPM");
                Ok(ImageFormat::Ppm)
            }
            (None, FormatFallback::Reject) => Err(Error::UnrecognizedFormat(name.to_string())),
        }
    }

    /// Write the accumulated image if it is finished. Returns `Ok(false)` without
    /// touching the file system when the accumulation is still in progress.
    pub fn write(&self, film: &FrameAccumulator, path: impl AsRef<Path>, format: ImageFormat) -> Result<bool> {
        match film.final_image() {
            Some(image) => {
                self.write_image(image, path, format)?;
                Ok(true)
            }
            None => {
                tracing::debug!(
                    samples = film.sample_count(),
                    target = film.target_samples(),
                    "image not ready, skipping write"
                );
                Ok(false)
            }
        }
    }

    /// Encode in memory, then replace `path` atomically. A failure never leaves a
    /// partially written file at `path`.
    pub fn write_image(&self, image: &FinalImage, path: impl AsRef<Path>, format: ImageFormat) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.encode(image, format)?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

        tracing::info!(path = %path.display(), %format, bytes = bytes.len(), "wrote image");
        Ok(())
    }

    pub fn encode(&self, image: &FinalImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match format {
            ImageFormat::Ppm => {
                let footer = format!(
                    "{} | {} spp | {}x{}",
                    self.provenance, image.samples, image.width, image.height
                );
                write_ppm(&mut buf, image, &footer).map_err(|e| Error::io("<memory>", e))?;
            }
            ImageFormat::Png => {
                PngEncoder::new(&mut buf)
                    .write_image(&image.flipped_rows(), image.width, image.height, ColorType::Rgb8)?;
            }
            ImageFormat::Jpg => {
                JpegEncoder::new_with_quality(&mut buf, Self::JPEG_QUALITY)
                    .write_image(&image.flipped_rows(), image.width, image.height, ColorType::Rgb8)?;
            }
            ImageFormat::Bmp => return Err(Error::UnsupportedFormat(format)),
        }
        Ok(buf)
    }
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(FormatFallback::default())
    }
}

/// Read a plain-text PPM written by [`ImageEncoder`], ignoring its comment footer.
pub fn read_ppm(path: impl AsRef<Path>) -> Result<DecodedPpm> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_ppm(&text)
}
