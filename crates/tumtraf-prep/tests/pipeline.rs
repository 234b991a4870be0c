// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end preparation of a synthetic TUMTraf tree.

use image::{GenericImageView, Rgb, RgbImage};
use std::{fs, path::Path, sync::Arc};
use tempfile::TempDir;
use tumtraf_prep::{
    AnnotationIndex, Camera, CameraSelection, Error, FileImageCodec, IndexKey, IndexLayout,
    IndexOptions, PrepareConfig, RoiRect, RoiSource, Sample, Split, SplitLayout, UnitStatus, prepare, scan,
};

/// Three bursts of frames 100 ms apart, separated by multi-second holes:
/// 5 frames, 2 frames, 4 frames.
fn timestamps() -> Vec<String> {
    let mut stems = Vec::new();
    for (second, count) in [(0, 5), (10, 2), (20, 4)] {
        for i in 0..count {
            stems.push(format!("20240315-0800{:02}.{:06}", second + i / 10, (i % 10) * 100_000));
        }
    }
    stems
}

fn label(kind: &str) -> String {
    format!(
        r#"{{"openlabel": {{"metadata": {{"schema_version": "1.0.0"}}, "frames": {{"0": {{"objects": {{
            "0": {{"object_data": {{"name": "{kind}_0", "type": "{kind}", "bbox": [
                {{"name": "full_bbox", "val": [300, 100, 50, 50],
                  "attributes": {{"text": [{{"name": "sensor_id", "val": "default_cam"}}]}}}}
            ]}}}}
        }}}}}}}}}}"#
    )
}

fn build_raw(root: &Path) {
    for camera in Camera::ALL {
        let layout = SplitLayout::new(root, Split::new("test/night_with_light_on"), camera);
        fs::create_dir_all(layout.images_dir()).unwrap();
        fs::create_dir_all(layout.labels_dir()).unwrap();

        for (i, stem) in timestamps().iter().enumerate() {
            RgbImage::from_pixel(720, 480, Rgb([(i * 20) as u8, 0, 0]))
                .save(layout.images_dir().join(format!("{stem}.jpg")))
                .unwrap();
            // every fourth frame has no label, every third is a legacy class
            if i % 4 == 3 {
                continue;
            }
            let kind = if i % 3 == 2 { "MOTORCYCLE" } else { "CAR" };
            fs::write(layout.labels_dir().join(format!("{stem}.json")), label(kind)).unwrap();
        }

        // a corrupted stem is skipped, not misparsed
        RgbImage::new(4, 4)
            .save(layout.images_dir().join("20240315-08000.jpg"))
            .unwrap();
    }
}

#[test]
fn test_prepare_then_index() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw");
    let out = temp_dir.path().join("out");
    build_raw(&raw);

    let config = PrepareConfig {
        data_path: raw.clone(),
        out_path: out.clone(),
        camera: CameraSelection::Both,
        splits: vec![Split::new("test/night_with_light_on")],
        n_frames: 2,
        max_time_diff: 200,
        roi: RoiSource::Inline(RoiRect::TUMTRAF_EB),
        ..Default::default()
    };

    let report = prepare(&config, Arc::new(FileImageCodec::new())).unwrap();
    assert_eq!(report.count(&UnitStatus::Prepared), 2);
    for unit in &report.units {
        assert_eq!(unit.frames_discovered, 11);
        assert_eq!(unit.frames_skipped, 1);
        // bursts of 5, 2 and 4 frames give 2 + 1 + 2 groups of two
        assert_eq!(unit.groups, 5);
        assert_eq!(unit.frames_grouped(), 10);
        assert_eq!(unit.failures(), 0);
    }

    let split = Split::new("test/night_with_light_on");
    let rgb = SplitLayout::new(&out, split.clone(), Camera::Rgb);
    let eb = SplitLayout::new(&out, split, Camera::Eb);
    assert!(
        rgb.labels_dir()
            .ends_with("OPENLabel_labels_fusion_gt_optimized_rgb")
    );

    // group ids match across the images and labels trees
    for layout in [&rgb, &eb] {
        for entry in fs::read_dir(layout.labels_dir()).unwrap() {
            let group = entry.unwrap().file_name();
            assert!(layout.images_dir().join(&group).is_dir());
        }
    }

    let flat = AnnotationIndex::open(
        eb.images_dir(),
        eb.labels_dir(),
        IndexOptions::flat().with_tumtraf_classes(),
    )
    .unwrap();
    let by_group = AnnotationIndex::open(
        eb.images_dir(),
        eb.labels_dir(),
        IndexOptions::by_group().with_tumtraf_classes(),
    )
    .unwrap();
    let frames_per_group: usize = by_group.groups().iter().map(|g| g.frames.len()).sum();
    assert_eq!(flat.len(), frames_per_group);

    // EB frames are cropped to 482x442 and their boxes shifted
    let sample = flat.frame(0).unwrap();
    assert_eq!(sample.image.dimensions(), (482, 442));
    let object = sample.annotation.objects().next().unwrap();
    let bbox = object.object_data.as_ref().unwrap().full_bbox().unwrap();
    assert_eq!(bbox.val, vec![170.0, 91.0, 50.0, 50.0]);

    // RGB frames keep their size
    let rgb_index =
        AnnotationIndex::open(rgb.images_dir(), rgb.labels_dir(), IndexOptions::by_group())
            .unwrap();
    let Sample::Group(samples) = rgb_index.get(&IndexKey::Group("0000".into())).unwrap() else {
        panic!("expected a group");
    };
    assert_eq!(samples[0].image.dimensions(), (720, 480));

    // legacy classes are retained but not counted
    assert_eq!(rgb_index.classes(), ["CAR", "MOTORCYCLE"]);
    let stats = scan(&flat);
    assert_eq!(stats.count("MOTORCYCLE"), 0);
    assert_eq!(stats.total_samples, flat.len());
    assert!(stats.empty_samples > 0);
}

#[test]
fn test_index_raw_tree() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw");
    build_raw(&raw);

    let layout = SplitLayout::new(&raw, Split::new("test/night_with_light_on"), Camera::Rgb);
    let index = AnnotationIndex::open(
        layout.images_dir(),
        layout.labels_dir(),
        IndexOptions::flat().with_tumtraf_classes(),
    )
    .unwrap();

    // eleven frames, two of them unlabelled
    assert_eq!(index.layout(), IndexLayout::Raw);
    assert_eq!(index.len(), 9);
    let sample = index.frame(0).unwrap();
    assert_eq!(sample.group, None);
    assert_eq!(sample.frame_id, timestamps()[0]);
    assert_eq!(sample.image.dimensions(), (720, 480));
    assert_eq!(scan(&index).total_samples, 9);

    let result = AnnotationIndex::open(
        layout.images_dir(),
        layout.labels_dir(),
        IndexOptions::by_group(),
    );
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}
