// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use assert_cmd::Command;
use image::{GenericImageView, Rgb, RgbImage};
use predicates::prelude::*;
use std::{fs, path::Path};
use tempfile::TempDir;

const STEMS: [&str; 5] = [
    "20240101-120000.000000",
    "20240101-120000.150000",
    "20240101-120001.100000",
    "20240101-120001.250000",
    "20240101-120001.400000",
];

const LABEL: &str = r#"{"openlabel": {"frames": {"0": {"objects": {
    "0": {"object_data": {"name": "CAR_0", "type": "CAR", "bbox": [{"name": "full_bbox", "val": [300, 100, 50, 50]}]}},
    "1": {"object_data": {"name": "MOTORCYCLE_1", "type": "MOTORCYCLE", "bbox": []}}
}}}}}"#;

/// `<root>/train/images/<camera>/` and its label folder with five frames.
fn raw_tree(root: &Path) {
    for (images, labels) in [
        ("rgb", "OPENLabel_labels_rgb"),
        ("eb_transformed", "OPENLabel_labels_eb"),
    ] {
        let images = root.join("train/images").join(images);
        let labels = root.join("train").join(labels);
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&labels).unwrap();
        for stem in STEMS {
            RgbImage::from_pixel(20, 16, Rgb([50, 60, 70]))
                .save(images.join(format!("{stem}.png")))
                .unwrap();
            fs::write(labels.join(format!("{stem}.json")), LABEL).unwrap();
        }
    }
}

fn tumtraf() -> Command {
    let mut cmd = Command::cargo_bin("tumtraf").unwrap();
    cmd.env("RUST_LOG", "warn").env_remove("TUMTRAF_THREADS");
    cmd
}

fn prepare(raw: &Path, out: &Path) -> Command {
    let mut cmd = tumtraf();
    cmd.arg("prepare")
        .arg("--data-path")
        .arg(raw)
        .arg("--out-path")
        .arg(out)
        .args(["--split", "train", "--n-frames", "2", "--max-time-diff", "200"]);
    cmd
}

#[test]
fn test_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = tumtraf();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_prepare_rgb() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    raw_tree(&raw);

    prepare(&raw, &out)
        .arg("--rgb")
        .assert()
        .success()
        .stdout(predicate::str::contains("train/rgb: prepared (2 groups"))
        .stdout(predicate::str::contains("1 prepared"));

    let group = out.join("train/images/rgb/0001");
    assert!(group.join(format!("{}.png", STEMS[2])).is_file());
    assert!(!out.join("train/images/rgb/0002").exists());
    assert!(!out.join("train/images/eb_transformed").exists());
    assert!(
        out.join("train/OPENLabel_labels_rgb/0000")
            .join(format!("{}.json", STEMS[0]))
            .is_file()
    );

    // second run leaves the unit alone
    prepare(&raw, &out)
        .arg("--rgb")
        .assert()
        .success()
        .stdout(predicate::str::contains("already prepared"));
    Ok(())
}

#[test]
fn test_prepare_eb_with_inline_roi() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    raw_tree(&raw);

    prepare(&raw, &out)
        .args(["--eb", "--roi", "2,3,15,12"])
        .assert()
        .success();

    let frame = out
        .join("train/images/eb_transformed/0000")
        .join(format!("{}.png", STEMS[0]));
    assert_eq!(image::open(frame)?.dimensions(), (13, 9));

    let label = fs::read_to_string(
        out.join("train/OPENLabel_labels_eb/0000")
            .join(format!("{}.json", STEMS[0])),
    )?;
    assert!(label.contains("[298,97,50,50]"), "{label}");
    Ok(())
}

#[test]
fn test_prepare_rejects_bad_roi() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    raw_tree(&raw);

    prepare(&raw, &temp_dir.path().join("out"))
        .args(["--roi", "1,2,3"])
        .assert()
        .failure();

    prepare(&raw, &temp_dir.path().join("out"))
        .args(["--roi", "1,2,3,4", "--no-roi"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_prepare_missing_root() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    prepare(&temp_dir.path().join("nope"), &temp_dir.path().join("out"))
        .arg("--no-roi")
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidDirectory"));
    Ok(())
}

#[test]
fn test_rectify_with_text_roi() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    raw_tree(&raw);
    prepare(&raw, &out)
        .args(["--eb", "--no-roi"])
        .assert()
        .success();

    let roi = temp_dir.path().join("roi.txt");
    fs::write(&roi, "130\n9\n612\n451\n")?;

    tumtraf()
        .arg("rectify")
        .arg(out.join("train/images/eb_transformed"))
        .arg(out.join("train/OPENLabel_labels_eb"))
        .arg("--roi-text")
        .arg(&roi)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cropped 4/4 frames, adjusted 4/4 label files"));

    let label = fs::read_to_string(
        out.join("train/OPENLabel_labels_eb/0001")
            .join(format!("{}.json", STEMS[3])),
    )?;
    assert!(label.contains("[170,91,50,50]"), "{label}");
    Ok(())
}

#[test]
fn test_stats() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    raw_tree(&raw);
    prepare(&raw, &out).arg("--rgb").assert().success();

    tumtraf()
        .arg("stats")
        .arg("--root")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total samples: 4"))
        .stdout(predicate::str::contains("Empty samples: 0 (0.00%)"))
        .stdout(predicate::str::contains("CAR: 4"))
        .stdout(predicate::str::contains("MOTORCYCLE").not());

    let output = tumtraf()
        .arg("stats")
        .arg("--images")
        .arg(out.join("train/images/rgb"))
        .arg("--labels")
        .arg(out.join("train/OPENLabel_labels_rgb"))
        .args(["--by-group", "--derive-classes", "--json"])
        .output()?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["total_samples"], 2);
    assert_eq!(stats["class_counts"][0], serde_json::json!(["CAR", 4]));
    assert_eq!(stats["class_counts"][1], serde_json::json!(["MOTORCYCLE", 4]));
    Ok(())
}

#[test]
fn test_stats_requires_dirs() -> Result<(), Box<dyn std::error::Error>> {
    tumtraf().arg("stats").assert().failure();

    let temp_dir = TempDir::new()?;
    tumtraf()
        .arg("stats")
        .arg("--root")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidDirectory"));
    Ok(())
}

#[test]
fn test_info() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    raw_tree(&raw);
    prepare(&raw, &out).arg("--no-roi").assert().success();

    tumtraf()
        .arg("info")
        .arg("--root")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("train/rgb: 2 groups, 4 frames"))
        .stdout(predicate::str::contains("train/eb: 2 groups, 4 frames"))
        .stdout(predicate::str::contains("classes: CAR, MOTORCYCLE"));
    Ok(())
}

#[test]
fn test_stats_on_raw_tree() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    raw_tree(&raw);

    tumtraf()
        .arg("stats")
        .arg("--images")
        .arg(raw.join("train/images/rgb"))
        .arg("--labels")
        .arg(raw.join("train/OPENLabel_labels_rgb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Total samples: 5"))
        .stdout(predicate::str::contains("CAR: 5"));

    tumtraf()
        .arg("stats")
        .arg("--images")
        .arg(raw.join("train/images/rgb"))
        .arg("--labels")
        .arg(raw.join("train/OPENLabel_labels_rgb"))
        .arg("--by-group")
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidParameters"));
    Ok(())
}
