use detsift::lowlevel::{intersection_area, union_area};
use detsift::{iou, BBox};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_box(rng: &mut StdRng) -> BBox {
    let x1 = rng.random_range(-20.0f32..20.0);
    let y1 = rng.random_range(-20.0f32..20.0);
    // Allow negative extents so malformed boxes are covered too.
    let w = rng.random_range(-2.0f32..15.0);
    let h = rng.random_range(-2.0f32..15.0);
    BBox::new(x1, y1, x1 + w, y1 + h)
}

#[test]
fn iou_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2000 {
        let a = random_box(&mut rng);
        let b = random_box(&mut rng);
        assert_eq!(iou(&a, &b), iou(&b, &a), "a={a:?} b={b:?}");
    }
}

#[test]
fn iou_stays_within_unit_interval() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let a = random_box(&mut rng);
        let b = random_box(&mut rng);
        let value = iou(&a, &b);
        assert!((0.0..=1.0 + 1e-6).contains(&value), "iou={value}");
        assert!(intersection_area(&a, &b) >= 0.0);
        assert!(union_area(&a, &b) >= 0.0);
    }
}

#[test]
fn self_iou_is_one_for_positive_area_and_zero_otherwise() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..500 {
        let a = random_box(&mut rng);
        let expected = if a.area() > 0.0 { 1.0 } else { 0.0 };
        assert_eq!(iou(&a, &a), expected, "a={a:?}");
    }

    let line = BBox::new(0.0, 0.0, 5.0, 0.0);
    assert_eq!(iou(&line, &line), 0.0);
}

#[test]
fn disjoint_boxes_have_zero_iou() {
    let a = BBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BBox::new(20.0, 20.0, 30.0, 30.0);
    assert_eq!(iou(&a, &b), 0.0);
    assert_eq!(union_area(&a, &b), 200.0);
}

#[test]
fn unbounded_boxes_stay_within_unit_interval() {
    let mut rng = StdRng::seed_from_u64(23);
    let unbounded = [
        BBox::new(0.0, 0.0, f32::INFINITY, f32::INFINITY),
        BBox::new(f32::NEG_INFINITY, 0.0, 1.0, f32::INFINITY),
        BBox::new(0.0, 0.0, f32::INFINITY, 1.0),
    ];
    for wide in &unbounded {
        assert!((0.0..=1.0).contains(&iou(wide, wide)), "a={wide:?}");
        for _ in 0..200 {
            let b = random_box(&mut rng);
            let value = iou(wide, &b);
            assert!((0.0..=1.0).contains(&value), "a={wide:?} b={b:?}");
            assert_eq!(value, iou(&b, wide));
        }
    }
}
