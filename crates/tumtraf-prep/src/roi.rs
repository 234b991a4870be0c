// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Region-of-interest rectification of event-camera frames.
//!
//! The transformed EB frames carry empty borders. After grouping, every EB
//! frame is cropped in place to a fixed rectangle and every `full_bbox` of the
//! matching labels is moved by the rectangle's origin.
//!
//! The rectangle is given in the original, uncropped pixel space as
//! `{x, y, width, height}`, and the crop keeps rows `y..height` and columns
//! `x..width`: the second pair is used as exclusive upper bounds, not as an
//! extent. Bounds past the image edge are clamped.
//!
//! Rectification is destructive and **not idempotent**. Running it twice over
//! the same tree crops twice and shifts the boxes twice; it must run exactly
//! once per dataset copy.

use image::{DynamicImage, GenericImageView};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

use crate::{
    Error,
    codec::ImageCodec,
    frames::is_image_file,
    openlabel::{LabelWriteOptions, read_label_value, shift_full_boxes, write_label_value},
};

/// Default ROI file name looked up next to the dataset.
pub const DEFAULT_ROI_FILE: &str = "roi_eb_transformed.json";

/// Crop rectangle in original EB pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRect {
    /// First kept column.
    pub x: u32,
    /// First kept row.
    pub y: u32,
    /// Exclusive column bound.
    pub width: u32,
    /// Exclusive row bound.
    pub height: u32,
}

impl RoiRect {
    /// Rectangle measured on the TUMTraf `eb_transformed` frames.
    pub const TUMTRAF_EB: RoiRect = RoiRect {
        x: 130,
        y: 9,
        width: 612,
        height: 451,
    };

    /// Create a rectangle, rejecting empty ones.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self, Error> {
        let roi = Self {
            x,
            y,
            width,
            height,
        };
        roi.validate()?;
        Ok(roi)
    }

    /// The kept ranges must not be empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.width <= self.x || self.height <= self.y {
            return Err(Error::InvalidRoi(format!(
                "empty crop: columns {}..{}, rows {}..{}",
                self.x, self.width, self.y, self.height
            )));
        }
        Ok(())
    }

    /// Read `{"x": .., "y": .., "width": .., "height": ..}` from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let roi: RoiRect = serde_json::from_str(&text)?;
        roi.validate()?;
        Ok(roi)
    }

    /// Read a text file holding x, y, width and height on four lines.
    pub fn from_text_file(path: &Path) -> Result<Self, Error> {
        Self::parse_text(&fs::read_to_string(path)?)
    }

    /// Parse x, y, width and height from four non-blank lines.
    pub fn parse_text(text: &str) -> Result<Self, Error> {
        let values = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [x, y, width, height] => Self::new(*x, *y, *width, *height),
            _ => Err(Error::InvalidRoi(format!(
                "expected 4 values, found {}",
                values.len()
            ))),
        }
    }

    /// Parse `x,y,width,height`.
    pub fn parse_csv(text: &str) -> Result<Self, Error> {
        Self::parse_text(&text.replace(',', "\n"))
    }

    /// Crop `image` to the rectangle, clamping to the image bounds.
    ///
    /// Returns `None` when nothing of the image is left.
    pub fn crop(&self, image: &DynamicImage) -> Option<DynamicImage> {
        let (w, h) = image.dimensions();
        let x_end = self.width.min(w);
        let y_end = self.height.min(h);
        if self.x >= x_end || self.y >= y_end {
            return None;
        }
        Some(image.crop_imm(self.x, self.y, x_end - self.x, y_end - self.y))
    }
}

/// Where the rectangle comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiSource {
    /// JSON file with `x`, `y`, `width` and `height` keys.
    Json(PathBuf),
    /// Text file with one value per line.
    Text(PathBuf),
    /// Rectangle given directly.
    Inline(RoiRect),
    /// No rectification.
    Disabled,
}

impl Default for RoiSource {
    fn default() -> Self {
        RoiSource::Json(PathBuf::from(DEFAULT_ROI_FILE))
    }
}

impl RoiSource {
    /// Load the rectangle, `None` when disabled.
    pub fn load(&self) -> Result<Option<RoiRect>, Error> {
        match self {
            RoiSource::Json(path) => RoiRect::from_json_file(path).map(Some),
            RoiSource::Text(path) => RoiRect::from_text_file(path).map(Some),
            RoiSource::Inline(roi) => roi.validate().map(|_| Some(*roi)),
            RoiSource::Disabled => Ok(None),
        }
    }
}

/// Result of rectifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectifyOutcome {
    /// File that was processed.
    pub path: PathBuf,
    /// Whether the rewritten file was stored.
    pub written: bool,
    /// Failure description when not written.
    pub error: Option<String>,
}

impl RectifyOutcome {
    fn ok(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            written: true,
            error: None,
        }
    }

    fn failed(path: &Path, err: impl std::fmt::Display) -> Self {
        warn!("Rectification of {:?} failed: {}", path, err);
        Self {
            path: path.to_path_buf(),
            written: false,
            error: Some(err.to_string()),
        }
    }
}

/// Outcome of a rectification pass.
#[derive(Debug, Clone, Default)]
pub struct RectifyReport {
    /// One entry per frame.
    pub images: Vec<RectifyOutcome>,
    /// One entry per label file.
    pub labels: Vec<RectifyOutcome>,
}

impl RectifyReport {
    /// Frames cropped and stored.
    pub fn images_written(&self) -> usize {
        self.images.iter().filter(|o| o.written).count()
    }

    /// Label files adjusted and stored.
    pub fn labels_written(&self) -> usize {
        self.labels.iter().filter(|o| o.written).count()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RectifyOutcome> {
        self.images
            .iter()
            .chain(self.labels.iter())
            .filter(|o| !o.written)
    }
}

/// Crops grouped EB frames and adjusts their labels.
pub struct RoiRectifier {
    roi: RoiRect,
    codec: Arc<dyn ImageCodec>,
}

impl RoiRectifier {
    /// Create a rectifier for `roi` using `codec` for frame I/O.
    pub fn new(roi: RoiRect, codec: Arc<dyn ImageCodec>) -> Self {
        Self { roi, codec }
    }

    /// The crop rectangle.
    pub fn roi(&self) -> RoiRect {
        self.roi
    }

    /// Rectify a grouped images tree and its grouped labels tree.
    ///
    /// Both roots must be directories. Per-file failures are collected in the
    /// report and never abort the pass.
    pub fn rectify(&self, images_root: &Path, labels_root: &Path) -> Result<RectifyReport, Error> {
        for root in [images_root, labels_root] {
            if !root.is_dir() {
                return Err(Error::InvalidDirectory(root.to_path_buf()));
            }
        }

        let report = RectifyReport {
            images: self.rectify_images(images_root)?,
            labels: self.rectify_labels(labels_root)?,
        };

        info!(
            "Rectified {}/{} frames and {}/{} label files under {:?}",
            report.images_written(),
            report.images.len(),
            report.labels_written(),
            report.labels.len(),
            images_root
        );

        Ok(report)
    }

    /// Crop every frame of every group directory in place.
    pub fn rectify_images(&self, images_root: &Path) -> Result<Vec<RectifyOutcome>, Error> {
        let files = grouped_files(images_root, is_image_file)?;
        Ok(files
            .par_iter()
            .map(|path| self.rectify_image(path))
            .collect())
    }

    /// Shift the `full_bbox` origin of every label file of every group.
    pub fn rectify_labels(&self, labels_root: &Path) -> Result<Vec<RectifyOutcome>, Error> {
        let files = grouped_files(labels_root, |p| {
            p.extension().is_some_and(|e| e == "json")
        })?;
        Ok(files
            .par_iter()
            .map(|path| self.rectify_label(path))
            .collect())
    }

    fn rectify_image(&self, path: &Path) -> RectifyOutcome {
        let image = match self.codec.decode(path) {
            Ok(image) => image,
            Err(err) => return RectifyOutcome::failed(path, err),
        };

        let Some(cropped) = self.roi.crop(&image) else {
            return RectifyOutcome::failed(
                path,
                format!(
                    "crop {:?} leaves nothing of a {:?} image",
                    self.roi,
                    image.dimensions()
                ),
            );
        };

        if let Err(err) = fs::remove_file(path) {
            return RectifyOutcome::failed(path, err);
        }
        match self.codec.encode(&cropped, path) {
            Ok(()) => {
                debug!("Cropped {:?} to {:?}", path, cropped.dimensions());
                RectifyOutcome::ok(path)
            }
            Err(err) => RectifyOutcome::failed(path, err),
        }
    }

    fn rectify_label(&self, path: &Path) -> RectifyOutcome {
        let mut document = match read_label_value(path) {
            Ok(document) => document,
            Err(err) => return RectifyOutcome::failed(path, err),
        };

        let shifted = shift_full_boxes(&mut document, i64::from(self.roi.x), i64::from(self.roi.y));
        trace!("Shifted {} boxes in {:?}", shifted, path);

        match write_label_value(&document, path, &LabelWriteOptions::default()) {
            Ok(()) => RectifyOutcome::ok(path),
            Err(err) => RectifyOutcome::failed(path, err),
        }
    }
}

/// Files one level below the group directories of `root`, in path order.
fn grouped_files(root: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::InvalidDirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
