// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Group materialization.
//!
//! Writes each group produced by [`FrameGrouper`](crate::FrameGrouper) into
//! its own zero padded subdirectory on both the images tree and the labels
//! tree:
//!
//! ```text
//! images_out/0000/<frame>.jpg      labels_out/0000/<frame>.json
//! images_out/0001/<frame>.jpg      labels_out/0001/<frame>.json
//! ```
//!
//! Content is copied unchanged. Frames without a matching label file are
//! copied anyway; label files without a grouped frame are never copied.
//!
//! A group directory that already holds files is left alone unless
//! [`MaterializeOptions::overwrite`] is set, in which case files are merged by
//! overwriting.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{Error, grouper::Group};

/// Options for group materialization.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Overwrite files of group directories that already exist.
    pub overwrite: bool,
}

/// A file that could not be written during a batch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Offending file.
    pub path: PathBuf,
    /// Error description.
    pub reason: String,
}

impl FileFailure {
    fn new(path: &Path, err: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// Outcome of materializing one group.
#[derive(Debug, Clone, Default)]
pub struct GroupReport {
    /// Group directory name.
    pub id: String,
    /// The group directory already held files and was not touched.
    pub skipped: bool,
    /// Frames copied into the images tree.
    pub frames_copied: usize,
    /// Label files copied into the labels tree.
    pub labels_copied: usize,
    /// Stems of frames that had no label file.
    pub missing_labels: Vec<String>,
    /// Per-file failures.
    pub failures: Vec<FileFailure>,
}

/// Outcome of a materialization pass.
#[derive(Debug, Clone, Default)]
pub struct MaterializeReport {
    /// One entry per input group, in group order.
    pub groups: Vec<GroupReport>,
}

impl MaterializeReport {
    /// Groups written (not skipped).
    pub fn groups_written(&self) -> usize {
        self.groups.iter().filter(|g| !g.skipped).count()
    }

    /// Groups left untouched because they already existed.
    pub fn groups_skipped(&self) -> usize {
        self.groups.iter().filter(|g| g.skipped).count()
    }

    /// Total frames copied.
    pub fn frames_copied(&self) -> usize {
        self.groups.iter().map(|g| g.frames_copied).sum()
    }

    /// Total label files copied.
    pub fn labels_copied(&self) -> usize {
        self.groups.iter().map(|g| g.labels_copied).sum()
    }

    /// Total frames without a label file.
    pub fn missing_labels(&self) -> usize {
        self.groups.iter().map(|g| g.missing_labels.len()).sum()
    }

    /// All per-file failures.
    pub fn failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.groups.iter().flat_map(|g| g.failures.iter())
    }
}

/// Write grouped frames and their labels to disk.
///
/// # Arguments
/// * `groups` - Output of the frame grouper
/// * `source_labels` - Raw label directory of the split and camera, if any
/// * `images_out` - Root of the grouped images tree
/// * `labels_out` - Root of the grouped labels tree
/// * `options` - Overwrite policy
///
/// Groups are independent and are written in parallel. Failing to create the
/// two roots is fatal; everything below them is reported per file.
pub fn materialize_groups(
    groups: &[Group],
    source_labels: Option<&Path>,
    images_out: &Path,
    labels_out: &Path,
    options: &MaterializeOptions,
) -> Result<MaterializeReport, Error> {
    if groups.is_empty() {
        debug!("No groups to materialize into {:?}", images_out);
        return Ok(MaterializeReport::default());
    }

    fs::create_dir_all(images_out)?;
    fs::create_dir_all(labels_out)?;

    let source_labels = source_labels.filter(|p| p.is_dir());
    if source_labels.is_none() {
        warn!(
            "No label directory for {:?}, frames will be copied without labels",
            images_out
        );
    }

    let reports: Vec<GroupReport> = groups
        .par_iter()
        .map(|group| materialize_group(group, source_labels, images_out, labels_out, options))
        .collect();

    let report = MaterializeReport { groups: reports };
    info!(
        "Materialized {} groups into {:?} ({} frames, {} labels, {} skipped)",
        report.groups_written(),
        images_out,
        report.frames_copied(),
        report.labels_copied(),
        report.groups_skipped()
    );

    Ok(report)
}

fn materialize_group(
    group: &Group,
    source_labels: Option<&Path>,
    images_out: &Path,
    labels_out: &Path,
    options: &MaterializeOptions,
) -> GroupReport {
    let id = group.id();
    let image_dir = images_out.join(&id);
    let label_dir = labels_out.join(&id);
    let mut report = GroupReport {
        id: id.clone(),
        ..Default::default()
    };

    if !options.overwrite && (has_entries(&image_dir) || has_entries(&label_dir)) {
        warn!("Group {} already exists in {:?}, skipping", id, images_out);
        report.skipped = true;
        return report;
    }

    for dir in [&image_dir, &label_dir] {
        if let Err(err) = fs::create_dir_all(dir) {
            report.failures.push(FileFailure::new(dir, err));
            return report;
        }
    }

    for frame in &group.frames {
        let Some(file_name) = frame.file_name() else {
            report
                .failures
                .push(FileFailure::new(&frame.path, "frame path has no file name"));
            continue;
        };

        let destination = image_dir.join(file_name);
        match fs::copy(&frame.path, &destination) {
            Ok(_) => report.frames_copied += 1,
            Err(err) => {
                warn!("Failed to copy {:?}: {}", frame.path, err);
                report.failures.push(FileFailure::new(&frame.path, err));
                continue;
            }
        }

        let label_name = format!("{}.json", frame.stem);
        let source = source_labels.map(|dir| dir.join(&label_name));
        match source {
            Some(source) if source.is_file() => {
                match fs::copy(&source, label_dir.join(&label_name)) {
                    Ok(_) => report.labels_copied += 1,
                    Err(err) => {
                        warn!("Failed to copy {:?}: {}", source, err);
                        report.failures.push(FileFailure::new(&source, err));
                    }
                }
            }
            _ => {
                debug!("No label for frame {}", frame.stem);
                report.missing_labels.push(frame.stem.clone());
            }
        }
    }

    report
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
