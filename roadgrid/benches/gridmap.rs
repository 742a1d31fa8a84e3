use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use roadgrid::{build_grid, find_path, GridMap, Point};

/// A street grid: bright roads every 40 pixels on a dark background
fn city_image(size: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        if x % 40 < 12 || y % 40 < 12 {
            Rgb([210, 210, 200])
        } else {
            Rgb([30, 40, 30])
        }
    })
}

fn bench_build(c: &mut Criterion, size: u32) {
    let img = city_image(size);

    c.bench_function(&format!("build_grid_{}", size), |b| {
        b.iter(|| build_grid(black_box(&img), black_box(4), black_box(128)))
    });
}

fn bench_find(c: &mut Criterion, size: u32, allow_diagonal: bool) {
    let map: GridMap = build_grid(&city_image(size), 4, 128);
    let start = Point { row: 0, col: 0 };
    // the crossing nearest to the bottom right corner
    let corner = (size - 34) as f32;
    let goal = map.pixel_to_cell(corner, corner).unwrap();

    let name = format!(
        "find_path_{}_{}",
        size,
        if allow_diagonal { "8" } else { "4" }
    );
    c.bench_function(&name, |b| {
        b.iter(|| {
            let report = find_path(&map, black_box(start), black_box(goal), allow_diagonal);
            assert!(report.found());
        })
    });
}

pub fn map_small(c: &mut Criterion) {
    bench_build(c, 200);
    bench_find(c, 200, true);
    bench_find(c, 200, false);
}

pub fn map_large(c: &mut Criterion) {
    bench_build(c, 800);
    bench_find(c, 800, true);
    bench_find(c, 800, false);
}

criterion_group!(benches, map_small, map_large);
criterion_main!(benches);
