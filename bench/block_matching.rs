use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bm_disparity::prelude::*;
use image::{GrayImage, Luma};

/// Deterministic textured image and a copy shifted left by `disparity` pixels.
fn synthetic_pair(width: u32, height: u32, disparity: u32) -> (GrayImage, GrayImage) {
    let left = GrayImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(0x27d4_eb2d) ^ y.wrapping_mul(0x1656_67b1);
        v ^= v >> 15;
        v = v.wrapping_mul(0x85eb_ca6b);
        v ^= v >> 13;
        Luma([(v & 0xff) as u8])
    });
    let right = GrayImage::from_fn(width, height, |x, y| {
        *left.get_pixel((x + disparity).min(width - 1), y)
    });
    (left, right)
}

fn block_matching_bench(c: &mut Criterion) {
    // Build the pair
    let (left, right) = synthetic_pair(320, 240, 12);

    // Tuner defaults, with a search range that suits the pair
    let params = ParameterSet::default()
        .with_block_size(15)
        .with_disparity_range(0, 32);

    c.bench_function("block matching 320x240 block 15", |b| {
        b.iter(|| compute_disparity(black_box(&left), black_box(&right), params))
    });

    let params = params.with_speckle(100, 2).with_disp12_max_diff(1);
    c.bench_function("block matching 320x240 block 15 + filters", |b| {
        b.iter(|| compute_disparity(black_box(&left), black_box(&right), params))
    });
}

criterion_group!(benches, block_matching_bench);
criterion_main!(benches);
