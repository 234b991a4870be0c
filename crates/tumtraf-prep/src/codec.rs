// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Image codec abstraction.
//!
//! Frame decoding and encoding sit behind the [`ImageCodec`] trait so the
//! region-of-interest pass and the annotation index do not depend on a
//! particular image library.
//!
//! # Implementations
//!
//! - [`FileImageCodec`]: default codec backed by the `image` crate, format
//!   chosen from the file extension.
//!
//! # Custom Codecs
//!
//! ```rust,ignore
//! use image::DynamicImage;
//! use std::path::Path;
//! use tumtraf_prep::{Error, ImageCodec};
//!
//! struct TurboJpeg;
//!
//! impl ImageCodec for TurboJpeg {
//!     fn decode(&self, path: &Path) -> Result<DynamicImage, Error> {
//!         // decode with libjpeg-turbo
//!         todo!()
//!     }
//!
//!     fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), Error> {
//!         todo!()
//!     }
//! }
//! ```

use image::{DynamicImage, ImageFormat};
use log::trace;
use std::path::Path;

use crate::Error;

/// Decode files into pixel arrays and encode them back.
///
/// Implementations must be thread-safe (`Send + Sync`): batch passes may
/// call them from several worker threads.
pub trait ImageCodec: Send + Sync {
    /// Decode the image stored at `path`.
    fn decode(&self, path: &Path) -> Result<DynamicImage, Error>;

    /// Encode `image` to `path`, replacing any existing file.
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), Error>;
}

/// Codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageCodec;

impl FileImageCodec {
    /// Create the default codec.
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for FileImageCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, Error> {
        trace!("Decoding {:?}", path);
        Ok(image::open(path)?)
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), Error> {
        trace!("Encoding {:?}", path);
        let format = ImageFormat::from_path(path)?;

        // JPEG carries no alpha channel
        if format == ImageFormat::Jpeg && image.color().has_alpha() {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.save_with_format(path, format)?;
        } else {
            image.save_with_format(path, format)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_png_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frame.png");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(7, 5, Rgba([1, 2, 3, 255])));

        let codec = FileImageCodec::new();
        codec.encode(&image, &path).unwrap();
        let decoded = codec.decode(&path).unwrap();

        assert_eq!(decoded.dimensions(), (7, 5));
        assert_eq!(decoded.get_pixel(3, 2), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frame.jpg");
        let image = DynamicImage::ImageRgba8(RgbaImage::new(16, 8));

        let codec = FileImageCodec::new();
        codec.encode(&image, &path).unwrap();
        assert_eq!(codec.decode(&path).unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn test_decode_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileImageCodec::new().decode(&temp_dir.path().join("absent.jpg"));
        assert!(result.is_err());
    }
}
