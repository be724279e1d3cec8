use criterion::{Criterion, criterion_group, criterion_main};
use glam::{DQuat, DVec3};
use image::{Rgba, RgbaImage};
use scene::{
    compose::{FLOOR_LOCATION, facing_x},
    engine::{CameraSpec, Material, PlaneSpec, SceneEngine},
    geom::{cartesian_to_spherical, spherical_to_cartesian},
    preview::{PreviewConfig, PreviewEngine},
};
use std::hint::black_box;

fn bench_geometry(c: &mut Criterion) {
    c.bench_function("spherical_round_trip", |b| {
        b.iter(|| {
            let p = spherical_to_cartesian(black_box((1.2, -0.4)), black_box(4.5));
            black_box(cartesian_to_spherical(p))
        })
    });
}

fn bench_preview(c: &mut Criterion) {
    let mut engine = PreviewEngine::new(PreviewConfig::default());
    engine
        .add_plane(PlaneSpec {
            location: FLOOR_LOCATION,
            rotation: DQuat::IDENTITY,
            scale: [10.0, 10.0],
            material: Material::new("floor", [0.3, 0.6, 0.2, 1.0]),
        })
        .unwrap();
    let handle = engine.add_image_plane(
        RgbaImage::from_pixel(256, 192, Rgba([200, 40, 40, 255])),
        DVec3::ZERO,
        facing_x(),
    );
    engine
        .add_camera(CameraSpec {
            location: spherical_to_cartesian((1.4, 0.3), 4.0),
            rotation: DQuat::IDENTITY,
            track: Some(handle),
        })
        .unwrap();

    c.bench_function("preview_render_512", |b| {
        b.iter(|| black_box(engine.render_image().unwrap()))
    });
}

criterion_group!(benches, bench_geometry, bench_preview);
criterion_main!(benches);
