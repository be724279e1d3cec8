//! Builds one attempt's scene on top of a [`SceneEngine`].
//!
//! Layout per attempt: a point light, a tinted backdrop behind the subject, a
//! tinted floor below it, the source image as a billboard at the origin facing
//! +X, and a camera placed from a [`CameraSample`] that tracks the billboard.

use std::path::Path;

use rand::Rng;
use tracing::debug;

use crate::{
    engine::{CameraSpec, EngineError, Material, OutputFormat, PlaneSpec, PointLight, SceneEngine},
    geom::{CameraSample, rotation_xyz_degrees},
};
use glam::{DQuat, DVec3};

pub const LIGHT_LOCATION: DVec3 = DVec3::new(2.0, -2.0, 2.0);
pub const BACKDROP_LOCATION: DVec3 = DVec3::new(-0.01, 0.0, 0.0);
pub const FLOOR_LOCATION: DVec3 = DVec3::new(0.0, 0.0, -0.7);
pub const FLOOR_SCALE: [f64; 2] = [10.0, 10.0];

const BACKDROP_WIDTH_MIN: f64 = 1.0;
const BACKDROP_WIDTH_MAX: f64 = 4.0;
// squared RGB distance between floor and backdrop tints
const MIN_TINT_DISTANCE_SQ: f32 = 0.09;
const TINT_DRAWS: usize = 16;

/// Rotation that turns a plane's +Z normal towards +X with its local Y up.
pub fn facing_x() -> DQuat {
    rotation_xyz_degrees(90.0, 0.0, 90.0)
}

pub fn random_tint<R: Rng + ?Sized>(rng: &mut R) -> [f32; 4] {
    [rng.random(), rng.random(), rng.random(), 1.0]
}

fn tint_distance_sq(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

/// Draws tints until one is far enough from `other`; gives up after a few
/// draws and keeps the last one.
pub fn distinct_tint<R: Rng + ?Sized>(rng: &mut R, other: &[f32; 4]) -> [f32; 4] {
    let mut tint = random_tint(rng);
    for _ in 1..TINT_DRAWS {
        if tint_distance_sq(&tint, other) >= MIN_TINT_DISTANCE_SQ {
            break;
        }
        tint = random_tint(rng);
    }
    tint
}

pub struct SceneComposer<E> {
    engine: E,
    format: OutputFormat,
}

impl<E: SceneEngine> SceneComposer<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            format: OutputFormat::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Resets the scene and builds it around `image` as seen from `sample`.
    pub fn compose<R: Rng + ?Sized>(
        &mut self,
        image: &Path,
        sample: &CameraSample,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        self.engine.clear_scene()?;

        self.engine.add_light(PointLight {
            location: LIGHT_LOCATION,
            radius: 1.0,
        })?;

        let backdrop_tint = random_tint(rng);
        let backdrop_width = rng.random_range(BACKDROP_WIDTH_MIN..BACKDROP_WIDTH_MAX);
        self.engine.add_plane(PlaneSpec {
            location: BACKDROP_LOCATION,
            rotation: facing_x(),
            scale: [backdrop_width, 1.0],
            material: Material::new("backdrop", backdrop_tint),
        })?;

        let floor_tint = distinct_tint(rng, &backdrop_tint);
        self.engine.add_plane(PlaneSpec {
            location: FLOOR_LOCATION,
            rotation: DQuat::IDENTITY,
            scale: FLOOR_SCALE,
            material: Material::new("floor", floor_tint),
        })?;

        let billboard = self
            .engine
            .import_image_as_plane(image, DVec3::ZERO, facing_x())?;

        let location = sample.position();
        debug!(image = %image.display(), %sample, %location, "composed scene");
        self.engine.add_camera(CameraSpec {
            location,
            rotation: DQuat::IDENTITY,
            track: Some(billboard),
        })
    }

    pub fn render_to(&mut self, path: &Path) -> Result<(), EngineError> {
        self.engine.render_to_file(path, self.format)
    }
}
