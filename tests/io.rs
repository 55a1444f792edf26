//! Loading pairs and parameters, writing renderings.

mod common;

use bm_disparity::io;
use bm_disparity::prelude::*;
use bm_disparity::Error;

#[test]
fn generate_from_image_files() {
    let dir = tempfile::tempdir().unwrap();
    let (left, right) = common::shifted_pair(64, 64, 8);
    let left_path = dir.path().join("left.png");
    let right_path = dir.path().join("right.png");
    left.save(&left_path).unwrap();
    right.save(&right_path).unwrap();

    let pair = io::load_pair(&left_path, &right_path).unwrap();
    assert_eq!(pair.left(), &left);
    assert_eq!(pair.right(), &right);

    let params = ParameterSet::default()
        .with_pre_filter_size(9)
        .with_block_size(5)
        .with_disparity_range(0, 16);
    let map = BlockMatcher::new(params).compute(&pair).unwrap();

    let color_path = dir.path().join("out").join("disparity.png");
    io::save_color(&map, &color_path).unwrap();
    let rendered = image::open(&color_path).unwrap().into_rgb8();
    assert_eq!(rendered.dimensions(), (64, 64));
    assert_eq!(rendered, map.to_color());

    let gray_path = dir.path().join("disparity_gray.png");
    io::save_luma(&map, &gray_path).unwrap();
    assert_eq!(io::load_gray(&gray_path).unwrap(), map.to_luma_normalised());
}

#[test]
fn mismatched_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let left_path = dir.path().join("left.png");
    let right_path = dir.path().join("right.png");
    common::texture(64, 64, 1).save(&left_path).unwrap();
    common::texture(32, 32, 1).save(&right_path).unwrap();

    assert!(matches!(
        io::load_pair(&left_path, &right_path),
        Err(Error::InputMismatch { .. })
    ));
}

#[test]
fn missing_file_is_an_image_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = io::load_gray(&dir.path().join("nope.png"));
    assert!(matches!(result, Err(Error::Image(_))));
}

#[test]
fn parameters_round_trip_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params").join("bm.json");
    let params = ParameterSet::default()
        .with_pre_filter_type(PreFilterType::XSobel)
        .with_block_size(15)
        .with_disparity_range(-16, 64)
        .with_speckle(100, 2)
        .with_disp12_max_diff(1);

    io::save_params(&params, &path).unwrap();
    assert_eq!(io::load_params(&path).unwrap(), params);
}

#[test]
fn malformed_parameter_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "block_size": "wide" }"#).unwrap();
    assert!(matches!(io::load_params(&path), Err(Error::Config(_))));
}
