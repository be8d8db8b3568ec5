//! Intersection, union and IoU for corner-form boxes.

use crate::geometry::BBox;

/// Area shared by `a` and `b`; zero when they do not overlap.
pub fn intersection_area(a: &BBox, b: &BBox) -> f32 {
    let w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    w * h
}

/// Combined area of `a` and `b`, counting the overlap once.
///
/// Degenerate boxes contribute zero area.
pub fn union_area(a: &BBox, b: &BBox) -> f32 {
    a.area() + b.area() - intersection_area(a, b)
}

/// Intersection over union of two boxes in the same coordinate scale.
///
/// Returns 0 when the union is empty, so two zero-area boxes never overlap.
/// Non-finite areas (NaN, or infinite extents giving `inf / inf`) also
/// yield 0. The result is symmetric in its arguments and lies in `[0, 1]`.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    // Intersection is clamped by each box's own extent, so a malformed box
    // (x2 < x1) yields zero overlap rather than a negative one.
    let inter = intersection_area(a, b);
    let union = a.area() + b.area() - inter;
    if union.is_nan() || union <= 0.0 {
        return 0.0;
    }
    let ratio = inter / union;
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::{intersection_area, iou, union_area};
    use crate::geometry::BBox;

    #[test]
    fn quarter_overlap_matches_hand_computation() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(intersection_area(&a, &b), 25.0);
        assert_eq!(union_area(&a, &b), 175.0);
        assert!((iou(&a, &b) - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = BBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BBox::new(1.0, 0.0, 2.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn zero_area_boxes_never_overlap() {
        let point = BBox::new(2.0, 2.0, 2.0, 2.0);
        assert_eq!(iou(&point, &point), 0.0);
    }

    #[test]
    fn infinite_extent_stays_in_range() {
        let unbounded = BBox::new(0.0, 0.0, f32::INFINITY, f32::INFINITY);
        let finite = BBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(iou(&unbounded, &unbounded), 0.0);
        let partial = iou(&unbounded, &finite);
        assert!((0.0..=1.0).contains(&partial));
        assert_eq!(iou(&BBox::new(f32::NAN, 0.0, 1.0, 1.0), &finite), 0.0);
    }

    #[test]
    fn contained_box_ratio() {
        let outer = BBox::new(0.0, 0.0, 4.0, 4.0);
        let inner = BBox::new(1.0, 1.0, 3.0, 3.0);
        assert!((iou(&outer, &inner) - 0.25).abs() < 1e-6);
    }
}
