use detsift::{
    BBox, BoxDecoder, CenterBox, Decoder, DetSiftError, HeadLayout, PredictionView, Stage,
};

#[test]
fn prediction_view_rejects_zero_dimensions() {
    let data = [0.0f32; 7];
    let err = PredictionView::new(&data, [1, 0, 1, 7]).err().unwrap();
    assert_eq!(
        err,
        DetSiftError::InvalidParameter {
            stage: Stage::Tensor,
            name: "grid_width",
            value: 0.0,
            reason: "tensor dimensions must be non-zero",
        }
    );
}

#[test]
fn prediction_view_rejects_buffer_length_mismatch() {
    let data = [0.0f32; 13];
    let err = PredictionView::new(&data, [1, 2, 1, 7]).err().unwrap();
    assert_eq!(
        err,
        DetSiftError::ShapeMismatch {
            stage: Stage::Tensor,
            what: "buffer length",
            expected: 14,
            got: 13,
        }
    );
}

#[test]
fn decoder_rejects_anchor_axis_mismatch() {
    let data = [0.0f32; 2 * 7];
    let view = PredictionView::new(&data, [1, 1, 2, 7]).unwrap();
    let decoder = BoxDecoder::new(HeadLayout::new(1, 1, 1, 2).unwrap());
    let err = decoder.decode(view).err().unwrap();
    assert_eq!(
        err,
        DetSiftError::ShapeMismatch {
            stage: Stage::Decode,
            what: "anchor axis",
            expected: 1,
            got: 2,
        }
    );
}

#[test]
fn decoder_rejects_grid_other_than_configured() {
    let decoder = BoxDecoder::new(HeadLayout::new(2, 2, 1, 2).unwrap());
    let first = [0.0f32; 2 * 2 * 7];
    let view = PredictionView::new(&first, [2, 2, 1, 7]).unwrap();
    assert_eq!(decoder.decode(view).unwrap().len(), 4);

    let second = [0.0f32; 5 * 3 * 7];
    let view = PredictionView::new(&second, [5, 3, 1, 7]).unwrap();
    let err = decoder.decode(view).err().unwrap();
    assert_eq!(
        err,
        DetSiftError::ShapeMismatch {
            stage: Stage::Decode,
            what: "grid height",
            expected: 2,
            got: 5,
        }
    );
    assert_eq!(
        err.to_string(),
        "decode: shape mismatch in grid height: expected 2, got 5"
    );
}

#[test]
fn decoder_emits_one_candidate_per_cell_anchor_in_row_major_order() {
    let (gh, gw, anchors, depth) = (2usize, 3usize, 2usize, 6usize);
    let mut data = vec![0.0f32; gh * gw * anchors * depth];
    for (idx, entry) in data.chunks_exact_mut(depth).enumerate() {
        // Encode the flat index in the center x so order is observable.
        entry[1] = idx as f32;
        entry[3] = 2.0;
        entry[4] = 2.0;
    }
    let view = PredictionView::new(&data, [gh, gw, anchors, depth]).unwrap();
    let decoder = BoxDecoder::new(HeadLayout::new(gh, gw, anchors, 1).unwrap());
    let candidates = decoder.decode(view).unwrap();

    assert_eq!(candidates.len(), gh * gw * anchors);
    for (idx, candidate) in candidates.iter().enumerate() {
        assert_eq!(candidate.bbox.to_center().cx, idx as f32);
        assert_eq!(candidate.class_probs.len(), 1);
        assert!(candidate.bbox.x1 <= candidate.bbox.x2);
        assert!(candidate.bbox.y1 <= candidate.bbox.y2);
    }
}

#[test]
fn center_and_corner_forms_round_trip() {
    let center = CenterBox::new(5.0, 5.0, 4.0, 4.0);
    let corners: BBox = center.into();
    assert_eq!(corners, BBox::new(3.0, 3.0, 7.0, 7.0));
    let back: CenterBox = corners.into();
    assert_eq!(back, center);
}

#[test]
fn error_message_names_stage_and_invariant() {
    let data = [0.0f32; 6];
    let view = PredictionView::new(&data, [1, 1, 1, 6]).unwrap();
    let err = BoxDecoder::new(HeadLayout::new(1, 1, 1, 2).unwrap())
        .decode(view)
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "decode: shape mismatch in trailing axis: expected 7, got 6"
    );
}
