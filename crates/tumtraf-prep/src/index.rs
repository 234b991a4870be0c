// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Random-access view over a raw or grouped dataset.
//!
//! The index is built once from a labels tree and is read-only afterwards.
//! Two tree layouts are recognised:
//!
//! - [`IndexLayout::Grouped`]: `<labels>/<group>/<stem>.json` next to
//!   `<images>/<group>/<stem>.<ext>`, as written by the materializer.
//! - [`IndexLayout::Raw`]: `<labels>/<stem>.json` next to
//!   `<images>/<stem>.<ext>`, the per-frame layout of the source dataset.
//!
//! A labels root holding both loose label files and group directories is
//! rejected. The index can be keyed two ways:
//!
//! - [`IndexMode::ByGroup`]: one entry per group directory, addressed by the
//!   group id, yielding every frame of the group.
//! - [`IndexMode::Flat`]: one entry per frame, addressed by a dense integer
//!   position in group then frame order.
//!
//! Both modes cover the same frames, so the flat length always equals the
//! sum of the group sizes. Raw frames have no group and can only be indexed
//! flat. Frames are ordered by file name, which for
//! `YYYYMMDD-HHMMSS.ffffff` stems is chronological order, independent of the
//! file system listing order.
//!
//! Images are decoded lazily on lookup through an [`ImageCodec`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use tumtraf_prep::{AnnotationIndex, IndexKey, IndexOptions};
//!
//! # fn main() -> Result<(), tumtraf_prep::Error> {
//! let index = AnnotationIndex::open(
//!     "data/preprocessed/train/images/rgb",
//!     "data/preprocessed/train/OPENLabel_labels_rgb",
//!     IndexOptions::flat(),
//! )?;
//! println!("{} frames, classes {:?}", index.len(), index.classes());
//! let sample = index.frame(0)?;
//! println!("{}x{}", sample.image.width(), sample.image.height());
//! # let _ = IndexKey::Position(0);
//! # Ok(())
//! # }
//! ```

use image::DynamicImage;
use log::{debug, info};
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

use crate::{
    Error,
    codec::{FileImageCodec, ImageCodec},
    frames::IMAGE_EXTENSIONS,
    openlabel::{AnnotationRecord, list_label_files, read_annotation},
};

/// Fixed TUMTraf class vocabulary.
pub const TUMTRAF_CLASSES: [&str; 6] = ["BICYCLE", "BUS", "CAR", "PEDESTRIAN", "TRAILER", "TRUCK"];

/// How entries of the index are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMode {
    /// One entry per group, keyed by group id.
    ByGroup,
    /// One entry per frame, keyed by position.
    #[default]
    Flat,
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMode::ByGroup => write!(f, "by-group"),
            IndexMode::Flat => write!(f, "flat"),
        }
    }
}

/// On-disk layout of the indexed tree, detected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLayout {
    /// Label files grouped one directory level below the labels root.
    Grouped,
    /// Label files stored directly in the labels root.
    Raw,
}

impl fmt::Display for IndexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexLayout::Grouped => write!(f, "grouped"),
            IndexLayout::Raw => write!(f, "raw"),
        }
    }
}

/// Options for building an [`AnnotationIndex`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Keying mode.
    pub mode: IndexMode,
    /// Fixed class vocabulary. When `None` the vocabulary is derived from
    /// the loaded labels.
    pub classes: Option<Vec<String>>,
    /// Extension tried first when resolving a frame image.
    pub image_extension: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            mode: IndexMode::Flat,
            classes: None,
            image_extension: "jpg".to_string(),
        }
    }
}

impl IndexOptions {
    /// Group-keyed index with a derived vocabulary.
    pub fn by_group() -> Self {
        Self {
            mode: IndexMode::ByGroup,
            ..Self::default()
        }
    }

    /// Frame-keyed index with a derived vocabulary.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Use the fixed TUMTraf vocabulary.
    pub fn with_tumtraf_classes(mut self) -> Self {
        self.classes = Some(TUMTRAF_CLASSES.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Use `classes` as the fixed vocabulary.
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }
}

/// Key of an index lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKey {
    /// Group id, for [`IndexMode::ByGroup`].
    Group(String),
    /// Dense position, for [`IndexMode::Flat`].
    Position(usize),
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Group(id) => write!(f, "group {}", id),
            IndexKey::Position(i) => write!(f, "position {}", i),
        }
    }
}

/// One loaded label file.
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    /// Owning group id, `None` for a raw frame.
    pub group: Option<String>,
    /// Frame id, the label file stem.
    pub frame_id: String,
    /// Parsed label file.
    pub annotation: AnnotationRecord,
}

/// One group directory and its frames.
#[derive(Debug, Clone)]
pub struct IndexedGroup {
    /// Group id, the directory name.
    pub id: String,
    /// Frames ordered by frame id.
    pub frames: Vec<IndexedFrame>,
}

/// A decoded frame with its annotation.
#[derive(Debug, Clone)]
pub struct FrameSample<'a> {
    /// Owning group id, `None` for a raw frame.
    pub group: Option<&'a str>,
    /// Frame id.
    pub frame_id: &'a str,
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Full per-frame annotation.
    pub annotation: &'a AnnotationRecord,
}

/// Result of [`AnnotationIndex::get`].
#[derive(Debug, Clone)]
pub enum Sample<'a> {
    /// Every frame of a group.
    Group(Vec<FrameSample<'a>>),
    /// A single frame.
    Frame(FrameSample<'a>),
}

/// Position of a frame in the index storage.
#[derive(Debug, Clone, Copy)]
enum FrameRef {
    Grouped(usize, usize),
    Raw(usize),
}

/// Read-only mapping from keys to annotations and lazily decoded images.
pub struct AnnotationIndex {
    images_root: PathBuf,
    labels_root: PathBuf,
    mode: IndexMode,
    layout: IndexLayout,
    classes: Vec<String>,
    image_extension: String,
    groups: Vec<IndexedGroup>,
    raw: Vec<IndexedFrame>,
    group_keys: HashMap<String, usize>,
    flat: Vec<FrameRef>,
    codec: Arc<dyn ImageCodec>,
}

impl fmt::Debug for AnnotationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationIndex")
            .field("images_root", &self.images_root)
            .field("labels_root", &self.labels_root)
            .field("mode", &self.mode)
            .field("layout", &self.layout)
            .field("classes", &self.classes)
            .field("groups", &self.groups.len())
            .field("frames", &self.flat.len())
            .finish()
    }
}

impl AnnotationIndex {
    /// Build an index decoding images with [`FileImageCodec`].
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        images_root: P,
        labels_root: Q,
        options: IndexOptions,
    ) -> Result<Self, Error> {
        Self::with_codec(images_root, labels_root, options, Arc::new(FileImageCodec::new()))
    }

    /// Build an index decoding images with `codec`.
    ///
    /// Fails with [`Error::InvalidDirectory`] when either root is missing or
    /// not a directory, and with the underlying error when a label file
    /// cannot be parsed. A labels root mixing loose label files with group
    /// directories, or a raw tree requested in [`IndexMode::ByGroup`], fails
    /// with [`Error::InvalidParameters`].
    pub fn with_codec<P: AsRef<Path>, Q: AsRef<Path>>(
        images_root: P,
        labels_root: Q,
        options: IndexOptions,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, Error> {
        let images_root = images_root.as_ref().to_path_buf();
        let labels_root = labels_root.as_ref().to_path_buf();
        for root in [&images_root, &labels_root] {
            if !root.is_dir() {
                return Err(Error::InvalidDirectory(root.clone()));
            }
        }

        let raw = load_frames(&labels_root, None)?;
        let groups = load_groups(&labels_root)?;

        let layout = match (raw.is_empty(), groups.is_empty()) {
            (true, _) => IndexLayout::Grouped,
            (false, true) => IndexLayout::Raw,
            (false, false) => {
                return Err(Error::InvalidParameters(format!(
                    "{:?} mixes loose label files with group directories",
                    labels_root
                )));
            }
        };
        if layout == IndexLayout::Raw && options.mode == IndexMode::ByGroup {
            return Err(Error::InvalidParameters(format!(
                "{:?} is not grouped and cannot be indexed by group",
                labels_root
            )));
        }

        let group_keys = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.clone(), i))
            .collect();
        let flat = groups
            .iter()
            .enumerate()
            .flat_map(|(g, group)| (0..group.frames.len()).map(move |f| FrameRef::Grouped(g, f)))
            .chain((0..raw.len()).map(FrameRef::Raw))
            .collect::<Vec<_>>();

        let classes = match options.classes {
            Some(classes) => classes,
            None => derive_classes(groups.iter().flat_map(|g| g.frames.iter()).chain(raw.iter())),
        };

        info!(
            "Indexed {} frames in {} groups from {} tree {:?} ({} mode, {} classes)",
            flat.len(),
            groups.len(),
            layout,
            labels_root,
            options.mode,
            classes.len()
        );

        Ok(Self {
            images_root,
            labels_root,
            mode: options.mode,
            layout,
            classes,
            image_extension: options.image_extension,
            groups,
            raw,
            group_keys,
            flat,
            codec,
        })
    }

    /// Number of entries: groups in [`IndexMode::ByGroup`], frames in
    /// [`IndexMode::Flat`].
    pub fn len(&self) -> usize {
        match self.mode {
            IndexMode::ByGroup => self.groups.len(),
            IndexMode::Flat => self.flat.len(),
        }
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of indexed frames, whatever the mode.
    pub fn frame_count(&self) -> usize {
        self.flat.len()
    }

    /// Keying mode.
    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Detected tree layout.
    pub fn layout(&self) -> IndexLayout {
        self.layout
    }

    /// Class vocabulary, fixed or derived.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Images root.
    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    /// Labels root.
    pub fn labels_root(&self) -> &Path {
        &self.labels_root
    }

    /// Every indexed frame in flat order.
    pub fn frames(&self) -> impl Iterator<Item = &IndexedFrame> {
        self.flat.iter().map(|r| self.resolve(*r))
    }

    /// Loaded groups in id order, empty for a raw tree.
    pub fn groups(&self) -> &[IndexedGroup] {
        &self.groups
    }

    /// Group ids in index order.
    pub fn group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.id.as_str())
    }

    /// Annotations of each entry in index order: a whole group per entry in
    /// [`IndexMode::ByGroup`], a single frame per entry in [`IndexMode::Flat`].
    pub fn samples(&self) -> Box<dyn Iterator<Item = &[IndexedFrame]> + '_> {
        match self.mode {
            IndexMode::ByGroup => Box::new(self.groups.iter().map(|g| g.frames.as_slice())),
            IndexMode::Flat => Box::new(
                self.flat
                    .iter()
                    .map(|r| std::slice::from_ref(self.resolve(*r))),
            ),
        }
    }

    /// Look up an entry, decoding its images.
    ///
    /// The key kind must match the index mode, otherwise
    /// [`Error::InvalidKey`] is returned.
    pub fn get(&self, key: &IndexKey) -> Result<Sample<'_>, Error> {
        match (self.mode, key) {
            (IndexMode::ByGroup, IndexKey::Group(id)) => self.group(id).map(Sample::Group),
            (IndexMode::Flat, IndexKey::Position(i)) => self.frame(*i).map(Sample::Frame),
            (mode, key) => Err(Error::InvalidKey(format!(
                "{} does not address a {} index",
                key, mode
            ))),
        }
    }

    /// Every frame of group `id`, decoded.
    ///
    /// Available in both modes.
    pub fn group(&self, id: &str) -> Result<Vec<FrameSample<'_>>, Error> {
        let index = self
            .group_keys
            .get(id)
            .ok_or_else(|| Error::InvalidKey(format!("unknown group {}", id)))?;
        self.groups[*index]
            .frames
            .iter()
            .map(|frame| self.load(frame))
            .collect()
    }

    /// The frame at flat `position`, decoded.
    ///
    /// Available in both modes.
    pub fn frame(&self, position: usize) -> Result<FrameSample<'_>, Error> {
        let frame_ref = self.flat.get(position).ok_or_else(|| {
            Error::InvalidKey(format!(
                "position {} out of range for {} frames",
                position,
                self.flat.len()
            ))
        })?;
        self.load(self.resolve(*frame_ref))
    }

    /// Path of the image backing `frame`, if one exists.
    ///
    /// The configured extension is tried first, then the known image
    /// extensions. Extensions match regardless of case.
    pub fn image_path(&self, frame: &IndexedFrame) -> Option<PathBuf> {
        let dir = self.image_dir(frame);
        let extensions = std::iter::once(self.image_extension.as_str())
            .chain(IMAGE_EXTENSIONS.iter().copied())
            .collect::<Vec<_>>();

        extensions
            .iter()
            .flat_map(|ext| [ext.to_lowercase(), ext.to_uppercase()])
            .map(|ext| dir.join(format!("{}.{}", frame.frame_id, ext)))
            .find(|path| path.is_file())
            .or_else(|| find_image_any_case(&dir, &frame.frame_id, &extensions))
    }

    fn image_dir(&self, frame: &IndexedFrame) -> PathBuf {
        match &frame.group {
            Some(group) => self.images_root.join(group),
            None => self.images_root.clone(),
        }
    }

    fn resolve(&self, frame_ref: FrameRef) -> &IndexedFrame {
        match frame_ref {
            FrameRef::Grouped(g, f) => &self.groups[g].frames[f],
            FrameRef::Raw(f) => &self.raw[f],
        }
    }

    fn load<'a>(&'a self, frame: &'a IndexedFrame) -> Result<FrameSample<'a>, Error> {
        let path = self.image_path(frame).ok_or_else(|| {
            Error::MissingAsset(
                self.image_dir(frame)
                    .join(format!("{}.{}", frame.frame_id, self.image_extension)),
            )
        })?;
        debug!("Loading {:?}", path);

        Ok(FrameSample {
            group: frame.group.as_deref(),
            frame_id: &frame.frame_id,
            image: self.codec.decode(&path)?,
            annotation: &frame.annotation,
        })
    }
}

/// Sorted distinct class labels of every object in `frames`.
pub fn derive_classes<'a>(frames: impl IntoIterator<Item = &'a IndexedFrame>) -> Vec<String> {
    frames
        .into_iter()
        .flat_map(|frame| frame.annotation.objects())
        .map(|object| object.class_label().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Image in `dir` named `<stem>.<ext>` with `ext` one of `extensions` in
/// any letter case.
fn find_image_any_case(dir: &Path, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| {
            path.file_stem().is_some_and(|s| s == stem)
                && path.extension().is_some_and(|e| {
                    let e = e.to_string_lossy();
                    extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext))
                })
        })
}

/// Label files stored directly in `dir`, owned by `group`.
fn load_frames(dir: &Path, group: Option<&str>) -> Result<Vec<IndexedFrame>, Error> {
    let mut frames = Vec::new();
    for path in list_label_files(dir)? {
        let Some(frame_id) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        frames.push(IndexedFrame {
            group: group.map(str::to_string),
            frame_id,
            annotation: read_annotation(&path)?,
        });
    }
    Ok(frames)
}

fn load_groups(labels_root: &Path) -> Result<Vec<IndexedGroup>, Error> {
    let mut groups = Vec::new();

    for entry in WalkDir::new(labels_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let id = entry.file_name().to_string_lossy().into_owned();
        let frames = load_frames(entry.path(), Some(&id))?;

        if frames.is_empty() {
            debug!("Group {:?} has no label files", entry.path());
            continue;
        }
        groups.push(IndexedGroup { id, frames });
    }

    Ok(groups)
}
