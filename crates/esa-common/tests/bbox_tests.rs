//! Integration tests for `BoundingBox` parsing and coordinate trimming.

use esa_common::bbox::{trim_ascending, trim_coord, BboxError, BoundingBox, TrimBounds};

#[test]
fn constructs_valid_bbox() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0).unwrap();
    assert_eq!(bbox.min_x, -180.0);
    assert_eq!(bbox.max_y, 90.0);
}

#[test]
fn rejects_inverted_bbox() {
    let err = BoundingBox::new(10.0, 0.0, -10.0, 10.0).unwrap_err();
    assert!(matches!(err, BboxError::Inverted(_)));
}

#[test]
fn parses_query_string() {
    let bbox = BoundingBox::from_query_string("-10,40,10,60").unwrap();
    assert_eq!(bbox.min_x, -10.0);
    assert_eq!(bbox.min_y, 40.0);
    assert_eq!(bbox.max_x, 10.0);
    assert_eq!(bbox.max_y, 60.0);
}

#[test]
fn rejects_wrong_field_count() {
    assert!(matches!(
        BoundingBox::from_query_string("0,0,100"),
        Err(BboxError::InvalidFormat(_))
    ));
    assert!(matches!(
        BoundingBox::from_query_string("0,0,100,100,200"),
        Err(BboxError::InvalidFormat(_))
    ));
}

#[test]
fn rejects_non_numeric_field() {
    assert!(matches!(
        BoundingBox::from_query_string("abc,0,100,100"),
        Err(BboxError::InvalidNumber(_))
    ));
}

#[test]
fn width_and_height() {
    let bbox = BoundingBox::new(10.0, 0.0, 30.0, 25.0).unwrap();
    assert_eq!(bbox.width(), 20.0);
    assert_eq!(bbox.height(), 25.0);
}

#[test]
fn intersects_overlapping_and_disjoint() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
    let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0).unwrap();
    let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
}

#[test]
fn as_query_param_round_trips() {
    let bbox = BoundingBox::new(-10.0, 40.0, 10.0, 60.0).unwrap();
    let reparsed = BoundingBox::from_query_string(&bbox.as_query_param()).unwrap();
    assert_eq!(bbox, reparsed);
}

// ---------------------------------------------------------------------------
// Coordinate trimming — the bbox-driven index selection used by C9/§4.9.3.
// ---------------------------------------------------------------------------

#[test]
fn trim_ascending_is_left_inclusive_right_inclusive_via_bisect() {
    let lon = [-20.0, -10.0, 0.0, 10.0, 20.0];
    let bounds = trim_ascending(&lon, -10.0, 10.0);
    assert_eq!(bounds, TrimBounds { lo: 1, hi: 4 });
    assert_eq!(&lon[bounds.lo..bounds.hi], &[-10.0, 0.0, 10.0]);
}

#[test]
fn trim_excludes_values_strictly_outside_the_box() {
    let lon = [-180.0, -90.0, 0.0, 90.0, 180.0];
    let bounds = trim_ascending(&lon, -45.0, 45.0);
    assert_eq!(&lon[bounds.lo..bounds.hi], &[0.0]);
}

#[test]
fn flipped_latitude_dataset_trims_then_exposes_ascending_order() {
    // Source array stored descending (common for satellite products).
    let flipped_lat = [60.0, 50.0, 40.0, 30.0, 20.0, 10.0];
    let bounds = trim_coord(&flipped_lat, 20.0, 50.0);
    let slice = &flipped_lat[bounds.lo..bounds.hi];
    // Still descending in storage order...
    assert_eq!(slice, &[50.0, 40.0, 30.0, 20.0]);
    // ...but the exposed Zarr array is reversed to ascending order.
    let mut ascending: Vec<f64> = slice.to_vec();
    ascending.reverse();
    assert_eq!(ascending, vec![20.0, 30.0, 40.0, 50.0]);
}

#[test]
fn empty_trim_when_box_misses_every_value() {
    let lat = [10.0, 20.0, 30.0];
    let bounds = trim_ascending(&lat, 100.0, 200.0);
    assert!(bounds.is_empty());
}
