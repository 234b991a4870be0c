// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! OPENLabel file readers.

use super::types::AnnotationRecord;
use crate::Error;
use serde_json::Value;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Read one label file.
///
/// # Arguments
/// * `path` - Path to the OPENLabel JSON file
pub fn read_annotation<P: AsRef<Path>>(path: P) -> Result<AnnotationRecord, Error> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    let record: AnnotationRecord = serde_json::from_reader(reader)?;
    Ok(record)
}

/// Read one label file as an untyped JSON document.
pub fn read_label_value<P: AsRef<Path>>(path: P) -> Result<Value, Error> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    Ok(serde_json::from_reader(reader)?)
}

/// List the `.json` files stored directly in `dir`, in file name order.
pub fn list_label_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref())
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|e| e == "json")
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_annotation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("20240101-000000.000000.json");
        fs::write(
            &path,
            r#"{"openlabel": {"frames": {"0": {"objects": {"0": {"object_data": {"type": "CAR"}}}}}}}"#,
        )
        .unwrap();

        let record = read_annotation(&path).unwrap();
        assert_eq!(record.objects().count(), 1);
    }

    #[test]
    fn test_read_annotation_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read_annotation(&path), Err(Error::JsonError(_))));
        assert!(matches!(
            read_annotation(temp_dir.path().join("absent.json")),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_list_label_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("b.json"), "{}").unwrap();
        fs::write(dir.join("a.json"), "{}").unwrap();
        fs::write(dir.join("c.txt"), "").unwrap();
        fs::create_dir(dir.join("d.json")).unwrap();

        let files = list_label_files(dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
