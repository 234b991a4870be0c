// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # TUMTraf Dataset Preparation Library
//!
//! Offline preparation of and random access to the TUMTraf event-camera
//! dataset: RGB and EB (event-based) frames with per-frame OPENLabel
//! annotations.
//!
//! ## Features
//!
//! - **Timestamp parsing**: `YYYYMMDD-HHMMSS.ffffff` frame stems to epoch
//!   milliseconds
//! - **Temporal grouping**: fixed-length, time-bounded frame windows
//! - **Materialization**: grouped copies of the frames and their labels
//! - **ROI rectification**: crop of the EB frames and matching box offsets
//! - **Annotation index**: group-keyed or frame-keyed dataset view over the
//!   raw or grouped layout with a fixed or derived class vocabulary
//! - **Class statistics**: per-class object counts and empty sample rate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tumtraf_prep::{Error, FileImageCodec, PrepareConfig, prepare};
//!
//! fn main() -> Result<(), Error> {
//!     let config = PrepareConfig::load(None)?;
//!     let report = prepare(&config, Arc::new(FileImageCodec::new()))?;
//!     for unit in &report.units {
//!         println!("{}", unit);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Grouping on its own is a pure function over timestamped frames:
//!
//! ```rust
//! use tumtraf_prep::FrameGrouper;
//!
//! let grouper = FrameGrouper::new(2, 200);
//! let groups = grouper.windows([0i64, 150, 1100, 1250, 1400], |ts| *ts);
//! assert_eq!(groups, vec![vec![0, 150], vec![1100, 1250]]);
//! ```

mod codec;
mod config;
mod error;
mod frames;
mod grouper;
mod index;
mod layout;
mod materialize;
pub mod openlabel;
mod pipeline;
mod roi;
mod stats;
mod timestamp;

pub use crate::{
    codec::{FileImageCodec, ImageCodec},
    config::{ENV_PREFIX, PrepareConfig, default_config_path},
    error::Error,
    frames::{Discovery, FrameHandle, IMAGE_EXTENSIONS, discover_frames, is_image_file},
    grouper::{DEFAULT_MAX_TIME_DIFF, DEFAULT_N_FRAMES, FrameGrouper, Group, group_id},
    index::{
        AnnotationIndex, FrameSample, IndexKey, IndexLayout, IndexMode, IndexOptions, IndexedFrame,
        IndexedGroup, Sample, TUMTRAF_CLASSES, derive_classes,
    },
    layout::{Camera, CameraSelection, DEFAULT_SPLITS, Split, SplitLayout},
    materialize::{
        FileFailure, GroupReport, MaterializeOptions, MaterializeReport, materialize_groups,
    },
    openlabel::AnnotationRecord,
    pipeline::{
        PrepareReport, UnitReport, UnitStatus, is_prepared, prepare, prepare_with_progress,
    },
    roi::{DEFAULT_ROI_FILE, RectifyOutcome, RectifyReport, RoiRect, RoiRectifier, RoiSource},
    stats::{ClassStats, scan},
    timestamp::{STEM_LEN, parse_timestamp_ms},
};
