// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! TUMTraf directory layout.
//!
//! Raw and regrouped trees share the same shape per split:
//!
//! ```text
//! <root>/<split>/images/rgb/<frame>.jpg
//! <root>/<split>/images/eb_transformed/<frame>.jpg
//! <root>/<split>/OPENLabel_labels_rgb/<frame>.json
//! <root>/<split>/OPENLabel_labels_eb/<frame>.json
//! <root>/test/<condition>/OPENLabel_labels_fusion_gt_optimized_{rgb,eb}/...
//! ```
//!
//! Regrouping inserts one `<0000>` level below each leaf directory.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::Error;

/// Splits processed when none are configured.
pub const DEFAULT_SPLITS: &[&str] = &[
    "train",
    "val",
    "test/day",
    "test/night_with_light_off",
    "test/night_with_light_on",
];

/// Camera modality of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Camera {
    /// Conventional RGB camera.
    Rgb,
    /// Event-camera frames, already transformed into the RGB view.
    Eb,
}

impl Camera {
    /// Both modalities, RGB first.
    pub const ALL: [Camera; 2] = [Camera::Rgb, Camera::Eb];

    /// Folder under `<split>/images/` holding this camera's frames.
    pub fn image_folder(&self) -> &'static str {
        match self {
            Camera::Rgb => "rgb",
            Camera::Eb => "eb_transformed",
        }
    }

    /// Label folder for this camera in `split`.
    ///
    /// Hierarchical test splits carry the fusion-optimized ground truth.
    pub fn label_folder(&self, split: &Split) -> &'static str {
        match (self, split.is_hierarchical()) {
            (Camera::Rgb, false) => "OPENLabel_labels_rgb",
            (Camera::Eb, false) => "OPENLabel_labels_eb",
            (Camera::Rgb, true) => "OPENLabel_labels_fusion_gt_optimized_rgb",
            (Camera::Eb, true) => "OPENLabel_labels_fusion_gt_optimized_eb",
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Camera::Rgb => "rgb",
            Camera::Eb => "eb",
        };
        write!(f, "{}", value)
    }
}

impl FromStr for Camera {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb" => Ok(Camera::Rgb),
            "eb" | "eb_transformed" | "event" => Ok(Camera::Eb),
            _ => Err(Error::InvalidParameters(format!("unknown camera: {}", s))),
        }
    }
}

/// Which cameras a batch pass touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSelection {
    /// RGB frames only.
    Rgb,
    /// Event frames only.
    Eb,
    /// Both modalities.
    #[default]
    Both,
}

impl CameraSelection {
    /// Resolve the `--rgb`, `--eb` and `--all` command line flags.
    ///
    /// No flag, or `--all`, selects both cameras.
    pub fn from_flags(rgb: bool, eb: bool, all: bool) -> Self {
        match (rgb, eb, all) {
            (true, false, false) => CameraSelection::Rgb,
            (false, true, false) => CameraSelection::Eb,
            _ => CameraSelection::Both,
        }
    }

    /// The selected cameras in processing order.
    pub fn cameras(&self) -> Vec<Camera> {
        match self {
            CameraSelection::Rgb => vec![Camera::Rgb],
            CameraSelection::Eb => vec![Camera::Eb],
            CameraSelection::Both => Camera::ALL.to_vec(),
        }
    }
}

impl FromStr for CameraSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rgb" => Ok(CameraSelection::Rgb),
            "eb" => Ok(CameraSelection::Eb),
            "both" | "all" => Ok(CameraSelection::Both),
            _ => Err(Error::InvalidParameters(format!(
                "unknown camera selection: {}",
                s
            ))),
        }
    }
}

/// A dataset split such as `train` or `test/night_with_light_on`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Split(String);

impl Split {
    /// Create a split from its identifier. Empty segments are dropped.
    pub fn new(name: &str) -> Self {
        let segments: Vec<&str> = name
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        Split(segments.join("/"))
    }

    /// Parse a comma separated split list, ignoring blank entries.
    pub fn parse_list(list: &str) -> Vec<Split> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Split::new)
            .collect()
    }

    /// The default split list.
    pub fn defaults() -> Vec<Split> {
        DEFAULT_SPLITS.iter().map(|s| Split::new(s)).collect()
    }

    /// The split identifier.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether the split has more than one segment (`test/day`).
    pub fn is_hierarchical(&self) -> bool {
        self.0.contains('/')
    }

    /// Resolve the split directory under `root`.
    pub fn path_under(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Split {
    fn from(s: &str) -> Self {
        Split::new(s)
    }
}

impl From<String> for Split {
    fn from(s: String) -> Self {
        Split::new(&s)
    }
}

impl From<Split> for String {
    fn from(split: Split) -> Self {
        split.0
    }
}

/// Directories of one split and camera under a dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitLayout {
    /// Dataset root.
    pub root: PathBuf,
    /// Split inside the root.
    pub split: Split,
    /// Camera modality.
    pub camera: Camera,
}

impl SplitLayout {
    /// Describe `camera` of `split` under `root`.
    pub fn new(root: impl Into<PathBuf>, split: Split, camera: Camera) -> Self {
        Self {
            root: root.into(),
            split,
            camera,
        }
    }

    /// `<root>/<split>`.
    pub fn split_dir(&self) -> PathBuf {
        self.split.path_under(&self.root)
    }

    /// `<root>/<split>/images/<camera folder>`.
    pub fn images_dir(&self) -> PathBuf {
        self.split_dir()
            .join("images")
            .join(self.camera.image_folder())
    }

    /// `<root>/<split>/<label folder>`.
    pub fn labels_dir(&self) -> PathBuf {
        self.split_dir().join(self.camera.label_folder(&self.split))
    }
}

impl fmt::Display for SplitLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.split, self.camera)
    }
}
