// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Batch preparation of a raw TUMTraf tree.
//!
//! Every configured split and camera is one independent unit:
//!
//! 1. discover and sort the raw frames,
//! 2. cut them into groups,
//! 3. copy the groups and their labels to the output tree,
//! 4. for the EB camera, crop the freshly written unit to the ROI.
//!
//! Units run in parallel. A unit whose output already exists is left alone
//! unless `rewrite` is set, in which case its output is removed first so the
//! ROI pass never sees previously cropped frames.

use log::{error, info, warn};
use rayon::prelude::*;
use std::{fmt, fs, path::Path, sync::Arc};

use crate::{
    Error,
    codec::ImageCodec,
    config::PrepareConfig,
    frames::discover_frames,
    layout::{Camera, Split, SplitLayout},
    materialize::{MaterializeOptions, MaterializeReport, materialize_groups},
    roi::{RectifyReport, RoiRect, RoiRectifier},
};

/// What happened to one split and camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// Regrouped, and rectified for EB.
    Prepared,
    /// The raw images directory does not exist.
    MissingSource,
    /// Output exists and `rewrite` is off.
    AlreadyPrepared,
    /// The unit aborted with the given error.
    Failed(String),
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Prepared => write!(f, "prepared"),
            UnitStatus::MissingSource => write!(f, "missing source"),
            UnitStatus::AlreadyPrepared => write!(f, "already prepared"),
            UnitStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Outcome of one split and camera.
#[derive(Debug, Clone)]
pub struct UnitReport {
    /// Split of the unit.
    pub split: Split,
    /// Camera of the unit.
    pub camera: Camera,
    /// Final state.
    pub status: UnitStatus,
    /// Frames with a valid timestamp.
    pub frames_discovered: usize,
    /// Files skipped for a malformed stem.
    pub frames_skipped: usize,
    /// Groups formed.
    pub groups: usize,
    /// Copy pass outcome.
    pub materialize: Option<MaterializeReport>,
    /// ROI pass outcome, EB only.
    pub rectify: Option<RectifyReport>,
}

impl UnitReport {
    fn new(split: &Split, camera: Camera, status: UnitStatus) -> Self {
        Self {
            split: split.clone(),
            camera,
            status,
            frames_discovered: 0,
            frames_skipped: 0,
            groups: 0,
            materialize: None,
            rectify: None,
        }
    }

    /// Frames written to the output tree.
    pub fn frames_grouped(&self) -> usize {
        self.materialize.as_ref().map_or(0, |m| m.frames_copied())
    }

    /// Per-file failures of both passes.
    pub fn failures(&self) -> usize {
        self.materialize.as_ref().map_or(0, |m| m.failures().count())
            + self.rectify.as_ref().map_or(0, |r| r.failures().count())
    }
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.split, self.camera, self.status)?;
        if self.status == UnitStatus::Prepared {
            write!(
                f,
                " ({} groups, {}/{} frames, {} skipped, {} failures)",
                self.groups,
                self.frames_grouped(),
                self.frames_discovered,
                self.frames_skipped,
                self.failures()
            )?;
        }
        Ok(())
    }
}

/// Outcome of a preparation run.
#[derive(Debug, Clone, Default)]
pub struct PrepareReport {
    /// One entry per split and camera, in configuration order.
    pub units: Vec<UnitReport>,
}

impl PrepareReport {
    /// Units with the given status.
    pub fn count(&self, status: &UnitStatus) -> usize {
        self.units.iter().filter(|u| &u.status == status).count()
    }

    /// Units that aborted.
    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Failed(_)))
    }

    /// Groups formed across all units.
    pub fn groups(&self) -> usize {
        self.units.iter().map(|u| u.groups).sum()
    }
}

/// Regroup every configured unit and rectify the EB units.
pub fn prepare(config: &PrepareConfig, codec: Arc<dyn ImageCodec>) -> Result<PrepareReport, Error> {
    prepare_with_progress(config, codec, |_| {})
}

/// [`prepare`], calling `on_unit` as each unit finishes.
///
/// Fails before touching any unit when the raw root is missing, the settings
/// are invalid or the ROI cannot be loaded.
pub fn prepare_with_progress<F>(
    config: &PrepareConfig,
    codec: Arc<dyn ImageCodec>,
    on_unit: F,
) -> Result<PrepareReport, Error>
where
    F: Fn(&UnitReport) + Sync,
{
    config.validate()?;
    if !config.data_path.is_dir() {
        return Err(Error::InvalidDirectory(config.data_path.clone()));
    }

    let cameras = config.camera.cameras();
    let roi = if cameras.contains(&Camera::Eb) {
        config.roi.load()?
    } else {
        None
    };
    if let Some(roi) = roi {
        info!("EB frames will be cropped to {:?}", roi);
    }

    let units: Vec<(Split, Camera)> = config
        .splits
        .iter()
        .flat_map(|split| cameras.iter().map(move |camera| (split.clone(), *camera)))
        .collect();

    let units = units
        .par_iter()
        .map(|(split, camera)| {
            let report = prepare_unit(config, split, *camera, roi, codec.clone());
            on_unit(&report);
            report
        })
        .collect();

    Ok(PrepareReport { units })
}

fn prepare_unit(
    config: &PrepareConfig,
    split: &Split,
    camera: Camera,
    roi: Option<RoiRect>,
    codec: Arc<dyn ImageCodec>,
) -> UnitReport {
    let source = SplitLayout::new(&config.data_path, split.clone(), camera);
    let target = SplitLayout::new(&config.out_path, split.clone(), camera);

    if !source.images_dir().is_dir() {
        warn!("Skipping {}: {:?} does not exist", source, source.images_dir());
        return UnitReport::new(split, camera, UnitStatus::MissingSource);
    }
    if target.images_dir().exists() && !config.rewrite {
        info!("Skipping {}: {:?} already exists", target, target.images_dir());
        return UnitReport::new(split, camera, UnitStatus::AlreadyPrepared);
    }

    let mut report = UnitReport::new(split, camera, UnitStatus::Prepared);
    if let Err(err) = regroup_unit(config, &source, &target, roi, codec, &mut report) {
        error!("Preparing {} failed: {}", target, err);
        report.status = UnitStatus::Failed(err.to_string());
    }
    report
}

fn regroup_unit(
    config: &PrepareConfig,
    source: &SplitLayout,
    target: &SplitLayout,
    roi: Option<RoiRect>,
    codec: Arc<dyn ImageCodec>,
    report: &mut UnitReport,
) -> Result<(), Error> {
    for dir in [target.images_dir(), target.labels_dir()] {
        if dir.exists() {
            info!("Removing previous output {:?}", dir);
            fs::remove_dir_all(&dir)?;
        }
    }

    let discovery = discover_frames(&source.images_dir(), source.camera, &source.split)?;
    report.frames_discovered = discovery.frames.len();
    report.frames_skipped = discovery.skipped.len();

    let groups = config.grouper().group(discovery.frames);
    report.groups = groups.len();

    let labels_dir = source.labels_dir();
    let materialized = materialize_groups(
        &groups,
        Some(labels_dir.as_path()),
        &target.images_dir(),
        &target.labels_dir(),
        &MaterializeOptions { overwrite: true },
    )?;
    report.materialize = Some(materialized);

    if source.camera == Camera::Eb
        && let Some(roi) = roi
        && !groups.is_empty()
    {
        let rectifier = RoiRectifier::new(roi, codec);
        report.rectify = Some(rectifier.rectify(&target.images_dir(), &target.labels_dir())?);
    }

    info!("{}", report);
    Ok(())
}

/// Whether `root` holds a regrouped unit for `split` and `camera`.
pub fn is_prepared(root: &Path, split: &Split, camera: Camera) -> bool {
    SplitLayout::new(root, split.clone(), camera).images_dir().is_dir()
}
