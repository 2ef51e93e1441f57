// SPDX-License-Identifier: GPL-3.0-only

//! Async image encoding for finished cards and stills
//!
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! Encoding and disk writes run on blocking workers.

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// Lossy, smaller files
    #[default]
    Jpeg,
    /// Lossless
    Png,
}

impl EncodingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match ImageFormat::from_path(path).ok()? {
            ImageFormat::Jpeg => Some(EncodingFormat::Jpeg),
            ImageFormat::Png => Some(EncodingFormat::Png),
            _ => None,
        }
    }
}

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingQuality {
    Low,
    Medium,
    #[default]
    High,
    Maximum,
}

impl EncodingQuality {
    /// JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Image encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl ImageEncoder {
    pub fn new(format: EncodingFormat, quality: EncodingQuality) -> Self {
        Self { format, quality }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode on a blocking worker
    pub async fn encode(&self, image: RgbaImage) -> Result<EncodedImage, String> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_blocking(&image))
            .await
            .map_err(|e| format!("Encoding task error: {}", e))?
    }

    pub fn encode_blocking(&self, image: &RgbaImage) -> Result<EncodedImage, String> {
        info!(
            width = image.width(),
            height = image.height(),
            format = ?self.format,
            "Starting encoding"
        );

        let data = match self.format {
            EncodingFormat::Jpeg => encode_jpeg(image, self.quality)?,
            EncodingFormat::Png => encode_png(image)?,
        };
        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            format: self.format,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Save to `output_dir` under a timestamped name starting with `prefix`
    pub async fn save(
        &self,
        encoded: EncodedImage,
        output_dir: PathBuf,
        prefix: &str,
    ) -> Result<PathBuf, String> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}_{}.{}", prefix, timestamp, encoded.format.extension());
        let filepath = output_dir.join(&filename);
        info!(path = %filepath.display(), "Saving image");

        let target = filepath.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&output_dir)
                .map_err(|e| format!("Failed to create {}: {}", output_dir.display(), e))?;
            std::fs::write(&target, &encoded.data)
                .map_err(|e| format!("Failed to save image: {}", e))
        })
        .await
        .map_err(|e| format!("Save task error: {}", e))??;

        info!(path = %filepath.display(), "Image saved");
        Ok(filepath)
    }
}

fn encode_jpeg(image: &RgbaImage, quality: EncodingQuality) -> Result<Vec<u8>, String> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut buffer = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality());
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(buffer)
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::test_pattern;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
        assert_eq!(
            EncodingFormat::from_path(Path::new("card.png")),
            Some(EncodingFormat::Png)
        );
        assert_eq!(EncodingFormat::from_path(Path::new("card.txt")), None);
    }

    #[test]
    fn test_jpeg_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 98);
    }

    #[test]
    fn test_png_is_lossless() {
        let image = test_pattern(16, 9);
        let encoded = ImageEncoder::new(EncodingFormat::Png, EncodingQuality::High)
            .encode_blocking(&image)
            .unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[tokio::test]
    async fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = ImageEncoder::new(EncodingFormat::Jpeg, EncodingQuality::Medium);
        let encoded = encoder.encode(test_pattern(8, 8)).await.unwrap();
        let path = encoder
            .save(encoded, dir.path().to_path_buf(), "CARD")
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("CARD_"));
        assert!(name.ends_with(".jpg"));
        assert!(path.exists());
    }
}
