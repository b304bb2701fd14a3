//! # Headland Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector2;

use guide_lib::headland::{
    build_headland, clip_at_line, nearest_anchor, BoundaryRing, ClipMode, JoinType,
};

/// An irregular field with both convex and reflex corners.
fn field_boundary() -> BoundaryRing {
    let num_points = 400;

    BoundaryRing::new(
        (0..num_points)
            .map(|i| {
                let a = 2.0 * std::f64::consts::PI * (i as f64) / (num_points as f64);
                let r = 400.0 + 40.0 * (5.0 * a).sin();
                Vector2::new(r * a.cos(), r * a.sin())
            })
            .collect(),
    )
    .unwrap()
}

fn headland_benchmark(c: &mut Criterion) {
    let boundary = field_boundary();

    c.bench_function("build headland (round)", |b| {
        b.iter(|| build_headland(black_box(&boundary), 12.0, JoinType::Round).unwrap())
    });

    c.bench_function("build headland (miter)", |b| {
        b.iter(|| build_headland(black_box(&boundary), 12.0, JoinType::Miter).unwrap())
    });

    let ring = build_headland(&boundary, 12.0, JoinType::Round)
        .unwrap()
        .as_ring()
        .unwrap();
    let a1 = nearest_anchor(&ring, &Vector2::new(-500.0, 10.0));
    let a2 = nearest_anchor(&ring, &Vector2::new(500.0, -10.0));

    c.bench_function("clip headland", |b| {
        b.iter(|| clip_at_line(black_box(&ring), &a1, &a2, ClipMode::Curve).unwrap())
    });
}

criterion_group!(benches, headland_benchmark);
criterion_main!(benches);
