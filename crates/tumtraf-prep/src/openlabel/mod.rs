// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # OPENLabel Annotation Support
//!
//! Typed access to the per-frame OPENLabel JSON files shipped with TUMTraf.
//! Each file holds one annotation record:
//!
//! ```text
//! openlabel
//! └── frames
//!     └── <frame id>
//!         └── objects
//!             └── <object id>
//!                 └── object_data { name, type, bbox: [{ name, val, attributes }] }
//! ```
//!
//! Keys that are not modelled explicitly are kept in `extra` maps so a record
//! can be read, adjusted and written back without losing information. Edits
//! that must also keep key order and number formatting, such as
//! [`shift_full_boxes`], work on the untyped document instead.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tumtraf_prep::openlabel::read_annotation;
//!
//! let record = read_annotation("labels/0000/20240404-140235.137590.json")?;
//! for object in record.objects() {
//!     println!("{}", object.class_label());
//! }
//! # Ok::<(), tumtraf_prep::Error>(())
//! ```

mod edit;
mod reader;
mod types;
mod writer;

pub use edit::shift_full_boxes;
pub use reader::{list_label_files, read_annotation, read_label_value};
pub use types::{
    AnnotationRecord, FULL_BBOX, FALLBACK_LABEL, FrameEntry, NamedBox, ObjectData, ObjectEntry,
    OpenLabel,
};
pub use writer::{
    LabelWriteOptions, write_annotation, write_annotation_with, write_label_value,
};
