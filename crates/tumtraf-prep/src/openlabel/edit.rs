// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! In-place edits of untyped label documents.
//!
//! Editing the parsed [`Value`] instead of an [`AnnotationRecord`] keeps key
//! order and number formatting of everything that is not touched.
//!
//! [`AnnotationRecord`]: super::AnnotationRecord

use super::types::FULL_BBOX;
use serde_json::{Number, Value};

/// Move every `full_bbox` origin of `document` by `(-dx, -dy)`.
///
/// Both the `{"openlabel": …}` and the legacy `{"data": {"openlabel": …}}`
/// shapes are handled. Integer coordinates stay integers. Returns the number
/// of boxes shifted.
pub fn shift_full_boxes(document: &mut Value, dx: i64, dy: i64) -> usize {
    let pointer = match document.pointer("/openlabel") {
        Some(_) => "/openlabel",
        None => "/data/openlabel",
    };
    let Some(root) = document.pointer_mut(pointer) else {
        return 0;
    };

    let Some(frames) = root.get_mut("frames").and_then(Value::as_object_mut) else {
        return 0;
    };

    let mut shifted = 0;
    for frame in frames.values_mut() {
        let Some(objects) = frame.get_mut("objects").and_then(Value::as_object_mut) else {
            continue;
        };
        for object in objects.values_mut() {
            let Some(boxes) = object
                .pointer_mut("/object_data/bbox")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for bbox in boxes {
                if bbox.get("name").and_then(Value::as_str) != Some(FULL_BBOX) {
                    continue;
                }
                let Some(val) = bbox.get_mut("val").and_then(Value::as_array_mut) else {
                    continue;
                };
                if let Some(x) = val.get_mut(0) {
                    offset(x, dx);
                }
                if let Some(y) = val.get_mut(1) {
                    offset(y, dy);
                }
                shifted += 1;
            }
        }
    }

    shifted
}

fn offset(coord: &mut Value, delta: i64) {
    let shifted = match coord.as_i64() {
        Some(i) => Some(Value::from(i - delta)),
        None => coord
            .as_f64()
            .and_then(|f| Number::from_f64(f - delta as f64))
            .map(Value::Number),
    };
    if let Some(shifted) = shifted {
        *coord = shifted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_keeps_untouched_content() {
        let text = r#"{"openlabel":{"metadata":{"schema_version":"1.0.0"},"frames":{"0":{"objects":{"0":{"object_data":{"type":"CAR","name":"CAR_0","bbox":[{"name":"full_bbox","val":[300,100.5,50,50],"attributes":{"z":1.0,"a":2}},{"name":"other","val":[300.0,100,50,50]}]}}}}}}}"#;
        let mut document: Value = serde_json::from_str(text).unwrap();

        assert_eq!(shift_full_boxes(&mut document, 130, 9), 1);
        let written = serde_json::to_string(&document).unwrap();
        assert_eq!(
            written,
            text.replace("[300,100.5,50,50]", "[170,91.5,50,50]")
        );
    }

    #[test]
    fn test_shift_legacy_wrapper() {
        let mut document: Value = serde_json::from_str(
            r#"{"data":{"openlabel":{"frames":{"7":{"objects":{
                "1":{"object_data":{"bbox":[{"name":"full_bbox","val":[10,20,3,4]}]}},
                "2":{"object_data":{"bbox":[{"name":"full_bbox","val":[5,5,1,1]}]}}
            }}}}}}"#,
        )
        .unwrap();

        assert_eq!(shift_full_boxes(&mut document, 2, 3), 2);
        assert_eq!(
            document.pointer("/data/openlabel/frames/7/objects/1/object_data/bbox/0/val"),
            Some(&serde_json::json!([8, 17, 3, 4]))
        );
    }

    #[test]
    fn test_shift_without_payload() {
        let mut document = serde_json::json!({"other": 1});
        assert_eq!(shift_full_boxes(&mut document, 1, 1), 0);
        assert_eq!(document, serde_json::json!({"other": 1}));
    }
}
