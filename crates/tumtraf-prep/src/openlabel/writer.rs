// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! OPENLabel file writers.

use super::types::AnnotationRecord;
use crate::Error;
use serde::Serialize;
use serde_json::Value;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Options for label writing.
#[derive(Debug, Clone, Default)]
pub struct LabelWriteOptions {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

/// Write a label file with default options (compact JSON).
pub fn write_annotation<P: AsRef<Path>>(record: &AnnotationRecord, path: P) -> Result<(), Error> {
    write_annotation_with(record, path, &LabelWriteOptions::default())
}

/// Write a label file, creating the parent directory when needed.
pub fn write_annotation_with<P: AsRef<Path>>(
    record: &AnnotationRecord,
    path: P,
    options: &LabelWriteOptions,
) -> Result<(), Error> {
    write_json(record, path.as_ref(), options)
}

/// Write an untyped JSON document as a label file.
pub fn write_label_value<P: AsRef<Path>>(
    document: &Value,
    path: P,
    options: &LabelWriteOptions,
) -> Result<(), Error> {
    write_json(document, path.as_ref(), options)
}

fn write_json<T: Serialize>(value: &T, path: &Path, options: &LabelWriteOptions) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);

    if options.pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.flush()?;

    Ok(())
}
