// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame discovery.

use itertools::Itertools;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{
    Error,
    layout::{Camera, Split},
    timestamp::parse_timestamp_ms,
};

/// Image file extensions recognised as frames.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One stored frame of a split and camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// Camera modality.
    pub camera: Camera,
    /// Split the frame belongs to.
    pub split: Split,
    /// File stem, `YYYYMMDD-HHMMSS.ffffff`.
    pub stem: String,
    /// Milliseconds since the epoch, derived from the stem.
    pub timestamp_ms: i64,
    /// Backing image file.
    pub path: PathBuf,
}

impl FrameHandle {
    /// Build a handle for `path`, parsing the timestamp from its stem.
    pub fn from_path(path: &Path, camera: Camera, split: Split) -> Result<Self, Error> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::MalformedTimestamp(path.to_string_lossy().to_string()))?
            .to_string();
        let timestamp_ms = parse_timestamp_ms(&stem)?;

        Ok(Self {
            camera,
            split,
            stem,
            timestamp_ms,
            path: path.to_path_buf(),
        })
    }

    /// File name of the backing image, e.g. `20240404-140235.137590.jpg`.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Result of listing one frame directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Frames in chronological order.
    pub frames: Vec<FrameHandle>,
    /// Files whose stem did not parse as a timestamp.
    pub skipped: Vec<PathBuf>,
}

/// Whether `path` carries one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List the frames stored directly in `dir`, sorted by timestamp.
///
/// Files with malformed stems are logged and returned in
/// [`Discovery::skipped`] rather than failing the listing. Ties on the
/// timestamp are broken by stem so the order does not depend on the
/// filesystem.
pub fn discover_frames(dir: &Path, camera: Camera, split: &Split) -> Result<Discovery, Error> {
    if !dir.is_dir() {
        return Err(Error::InvalidDirectory(dir.to_path_buf()));
    }

    let mut discovery = Discovery::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_image_file(entry.path()) {
            continue;
        }

        match FrameHandle::from_path(entry.path(), camera, split.clone()) {
            Ok(frame) => discovery.frames.push(frame),
            Err(err) => {
                warn!("Skipping frame {:?}: {}", entry.path(), err);
                discovery.skipped.push(entry.path().to_path_buf());
            }
        }
    }

    discovery.frames = discovery
        .frames
        .into_iter()
        .sorted_by(|a, b| {
            a.timestamp_ms
                .cmp(&b.timestamp_ms)
                .then_with(|| a.stem.cmp(&b.stem))
        })
        .collect();

    debug!(
        "Discovered {} frames in {:?} ({} skipped)",
        discovery.frames.len(),
        dir,
        discovery.skipped.len()
    );

    Ok(discovery)
}
