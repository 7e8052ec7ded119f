use crate::{
    detection::{BoundingBox, Detection},
    error::BridgeError,
    labels::ClassLabels,
    registry::ModelConfig,
};
use ndarray::{s, ArrayD, Axis};

/// A detection as produced by the engine, before thresholding and
/// suppression: best class per anchor with its score, box already rescaled
/// to original-image coordinates.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Parse a single-scale detector output of shape `[1, 4 + classes, anchors]`
/// (center-x, center-y, width, height rows followed by per-class scores).
pub fn parse_output(
    raw: &ArrayD<f32>,
    input_size: u32,
    orig_width: u32,
    orig_height: u32,
) -> Result<Vec<RawDetection>, BridgeError> {
    let shape = raw.shape();
    if raw.ndim() != 3 || shape[0] != 1 || shape[1] <= 4 {
        return Err(BridgeError::InferenceError(format!(
            "unexpected output shape {:?}, want [1, 4 + classes, anchors]",
            shape
        )));
    }

    let output = raw.slice(s![0, .., ..]);
    let size = input_size as f32;
    let scale_x = orig_width as f32 / size;
    let scale_y = orig_height as f32 / size;

    let mut detections = Vec::new();
    for anchor in output.axis_iter(Axis(1)) {
        let mut class_id = 0usize;
        let mut confidence = f32::NEG_INFINITY;
        for (index, value) in anchor.iter().skip(4).copied().enumerate() {
            if value > confidence {
                class_id = index;
                confidence = value;
            }
        }

        let xc = anchor[0] * scale_x;
        let yc = anchor[1] * scale_y;
        let width = anchor[2] * scale_x;
        let height = anchor[3] * scale_y;

        detections.push(RawDetection {
            class_id,
            confidence,
            bounding_box: BoundingBox {
                x: xc - width / 2.,
                y: yc - height / 2.,
                width,
                height,
            },
        });
    }

    Ok(detections)
}

/// Confidence filter followed by greedy non-maximum suppression.
///
/// Detections at or above the confidence threshold are kept and sorted by
/// descending confidence; a detection whose IoU with an already-kept one
/// exceeds the IoU threshold is dropped. The output stays sorted by
/// descending confidence.
pub fn filter_detections(
    mut candidates: Vec<RawDetection>,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Vec<RawDetection> {
    candidates.retain(|d| d.confidence >= confidence_threshold);
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    'candidates: for candidate in candidates {
        for winner in &kept {
            if winner.bounding_box.iou(&candidate.bounding_box) > iou_threshold {
                continue 'candidates;
            }
        }
        kept.push(candidate);
    }
    kept
}

/// Full post-processing pass: threshold, suppress, attach class labels.
pub fn finalize(
    candidates: Vec<RawDetection>,
    config: &ModelConfig,
    labels: &ClassLabels,
) -> Vec<Detection> {
    filter_detections(
        candidates,
        config.confidence_threshold,
        config.iou_threshold,
    )
    .into_iter()
    .map(|d| Detection {
        label: labels.name_for(d.class_id),
        confidence: d.confidence,
        bounding_box: d.bounding_box,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    fn raw(confidence: f32, x: f32, y: f32, width: f32, height: f32) -> RawDetection {
        RawDetection {
            class_id: 0,
            confidence,
            bounding_box: BoundingBox {
                x,
                y,
                width,
                height,
            },
        }
    }

    /// Output tensor with 3 classes: anchors given as (cx, cy, w, h, scores).
    fn output_tensor(anchors: &[([f32; 4], [f32; 3])]) -> ArrayD<f32> {
        let n = anchors.len();
        let mut data = vec![0.0f32; 7 * n];
        for (i, (bbox, scores)) in anchors.iter().enumerate() {
            for (row, value) in bbox.iter().chain(scores.iter()).enumerate() {
                data[row * n + i] = *value;
            }
        }
        Array::from_shape_vec(IxDyn(&[1, 7, n]), data).unwrap()
    }

    #[test]
    fn test_parse_output_scales_to_original_image() {
        // One anchor centered at (160, 160) in 320-space, 64x32 extent,
        // best class 2 with score 0.9. Original image is 640x320, so
        // coordinates double horizontally and stay 1:1 vertically.
        let tensor = output_tensor(&[([160.0, 160.0, 64.0, 32.0], [0.1, 0.2, 0.9])]);

        let detections = parse_output(&tensor, 320, 640, 320).unwrap();
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        assert_eq!(det.class_id, 2);
        assert!((det.confidence - 0.9).abs() < 1e-6);
        assert!((det.bounding_box.x - (320.0 - 64.0)).abs() < 1e-4);
        assert!((det.bounding_box.y - (160.0 - 16.0)).abs() < 1e-4);
        assert!((det.bounding_box.width - 128.0).abs() < 1e-4);
        assert!((det.bounding_box.height - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_parse_output_rejects_bad_shapes() {
        let flat = Array::from_shape_vec(IxDyn(&[7, 10]), vec![0.0; 70]).unwrap();
        assert!(matches!(
            parse_output(&flat, 320, 100, 100),
            Err(BridgeError::InferenceError(_))
        ));

        // No class rows at all.
        let boxes_only = Array::from_shape_vec(IxDyn(&[1, 4, 10]), vec![0.0; 40]).unwrap();
        assert!(matches!(
            parse_output(&boxes_only, 320, 100, 100),
            Err(BridgeError::InferenceError(_))
        ));
    }

    #[test]
    fn test_confidence_threshold_boundary_is_kept() {
        let candidates = vec![
            raw(0.49, 0.0, 0.0, 10.0, 10.0),
            raw(0.5, 100.0, 100.0, 10.0, 10.0),
            raw(0.8, 200.0, 200.0, 10.0, 10.0),
        ];

        let kept = filter_detections(candidates, 0.5, 0.45);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.confidence >= 0.5));
    }

    #[test]
    fn test_suppression_drops_overlapping_lower_confidence() {
        // Two near-identical boxes and one far away.
        let candidates = vec![
            raw(0.6, 0.0, 0.0, 100.0, 100.0),
            raw(0.9, 5.0, 5.0, 100.0, 100.0),
            raw(0.7, 500.0, 500.0, 50.0, 50.0),
        ];

        let kept = filter_detections(candidates, 0.5, 0.45);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!((kept[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_iou_exactly_at_threshold_survives() {
        // Boxes overlapping with IoU = 1/3; suppression requires strictly
        // greater than the threshold.
        let candidates = vec![
            raw(0.9, 0.0, 0.0, 10.0, 10.0),
            raw(0.8, 5.0, 0.0, 10.0, 10.0),
        ];

        let kept = filter_detections(candidates.clone(), 0.5, 1.0 / 3.0);
        assert_eq!(kept.len(), 2);

        let kept = filter_detections(candidates, 0.5, 0.3);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_output_sorted_by_descending_confidence() {
        let candidates = vec![
            raw(0.55, 0.0, 0.0, 10.0, 10.0),
            raw(0.95, 100.0, 0.0, 10.0, 10.0),
            raw(0.75, 200.0, 0.0, 10.0, 10.0),
        ];

        let kept = filter_detections(candidates, 0.5, 0.45);
        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.95, 0.75, 0.55]);
    }

    #[test]
    fn test_suppression_is_idempotent() {
        let candidates = vec![
            raw(0.9, 0.0, 0.0, 100.0, 100.0),
            raw(0.8, 10.0, 10.0, 100.0, 100.0),
            raw(0.7, 300.0, 300.0, 50.0, 50.0),
            raw(0.6, 310.0, 310.0, 50.0, 50.0),
        ];

        let once = filter_detections(candidates, 0.5, 0.45);
        let twice = filter_detections(once.clone(), 0.5, 0.45);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.confidence, b.confidence);
            assert_eq!(a.bounding_box, b.bounding_box);
        }
    }

    #[test]
    fn test_raising_threshold_never_yields_more_detections() {
        let candidates: Vec<RawDetection> = (0..20)
            .map(|i| {
                raw(
                    0.05 * i as f32,
                    (i % 5) as f32 * 30.0,
                    (i / 5) as f32 * 30.0,
                    40.0,
                    40.0,
                )
            })
            .collect();

        let mut previous = usize::MAX;
        for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let kept = filter_detections(candidates.clone(), threshold, 0.45).len();
            assert!(kept <= previous);
            previous = kept;
        }
    }

    #[test]
    fn test_finalize_attaches_labels() {
        let labels = ClassLabels::from_names(vec!["person".to_string(), "bicycle".to_string()]);
        let config = ModelConfig {
            model_path: "model.onnx".into(),
            input_size: 320,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        };

        let mut person = raw(0.9, 0.0, 0.0, 10.0, 10.0);
        person.class_id = 0;
        let mut unknown = raw(0.8, 100.0, 100.0, 10.0, 10.0);
        unknown.class_id = 9;

        let detections = finalize(vec![person, unknown], &config, &labels);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[1].label, "class 9");
    }

    #[test]
    fn test_finalize_empty_input_is_empty_output() {
        let labels = ClassLabels::from_names(vec![]);
        let config = ModelConfig {
            model_path: "model.onnx".into(),
            input_size: 320,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        };
        assert!(finalize(Vec::new(), &config, &labels).is_empty());
    }
}
