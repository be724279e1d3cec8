//! The scene engine capability.
//!
//! Composition code drives a single mutable scene through [`SceneEngine`] and
//! never touches an engine's own data model. Every call may fail with an
//! [`EngineError`]; callers decide how far such a failure reaches.

use std::path::{Path, PathBuf};
use thiserror::Error;

use glam::{DQuat, DVec3};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write render {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {0} has no pixels")]
    EmptyImage(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown plane handle {0}")]
    UnknownHandle(usize),

    #[error("scene has no camera")]
    NoCamera,

    #[error("camera at {0} cannot look at its target")]
    DegenerateCamera(DVec3),

    #[error("{0}")]
    Backend(String),
}

/// Opaque reference to a plane previously added to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaneHandle(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA in `[0, 1]`.
    pub color: [f32; 4],
}

impl Material {
    pub fn new(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// A unit square in its local XY plane (normal +Z), scaled, rotated, then
/// moved to `location`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneSpec {
    pub location: DVec3,
    pub rotation: DQuat,
    pub scale: [f64; 2],
    pub material: Material,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub location: DVec3,
    pub radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSpec {
    pub location: DVec3,
    pub rotation: DQuat,
    /// When set the camera keeps this plane centred regardless of `rotation`.
    pub track: Option<PlaneHandle>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

pub trait SceneEngine {
    /// Removes every object, light, camera and material from the scene.
    fn clear_scene(&mut self) -> Result<(), EngineError>;

    fn add_light(&mut self, light: PointLight) -> Result<(), EngineError>;

    fn add_plane(&mut self, plane: PlaneSpec) -> Result<PlaneHandle, EngineError>;

    /// Imports an image file as a textured plane one unit high, its width
    /// following the image aspect ratio.
    fn import_image_as_plane(
        &mut self,
        path: &Path,
        location: DVec3,
        rotation: DQuat,
    ) -> Result<PlaneHandle, EngineError>;

    fn add_camera(&mut self, camera: CameraSpec) -> Result<(), EngineError>;

    /// Renders the current scene and blocks until `path` is written.
    fn render_to_file(&mut self, path: &Path, format: OutputFormat) -> Result<(), EngineError>;
}

impl<E: SceneEngine + ?Sized> SceneEngine for &mut E {
    fn clear_scene(&mut self) -> Result<(), EngineError> {
        (**self).clear_scene()
    }

    fn add_light(&mut self, light: PointLight) -> Result<(), EngineError> {
        (**self).add_light(light)
    }

    fn add_plane(&mut self, plane: PlaneSpec) -> Result<PlaneHandle, EngineError> {
        (**self).add_plane(plane)
    }

    fn import_image_as_plane(
        &mut self,
        path: &Path,
        location: DVec3,
        rotation: DQuat,
    ) -> Result<PlaneHandle, EngineError> {
        (**self).import_image_as_plane(path, location, rotation)
    }

    fn add_camera(&mut self, camera: CameraSpec) -> Result<(), EngineError> {
        (**self).add_camera(camera)
    }

    fn render_to_file(&mut self, path: &Path, format: OutputFormat) -> Result<(), EngineError> {
        (**self).render_to_file(path, format)
    }
}

impl<E: SceneEngine + ?Sized> SceneEngine for Box<E> {
    fn clear_scene(&mut self) -> Result<(), EngineError> {
        (**self).clear_scene()
    }

    fn add_light(&mut self, light: PointLight) -> Result<(), EngineError> {
        (**self).add_light(light)
    }

    fn add_plane(&mut self, plane: PlaneSpec) -> Result<PlaneHandle, EngineError> {
        (**self).add_plane(plane)
    }

    fn import_image_as_plane(
        &mut self,
        path: &Path,
        location: DVec3,
        rotation: DQuat,
    ) -> Result<PlaneHandle, EngineError> {
        (**self).import_image_as_plane(path, location, rotation)
    }

    fn add_camera(&mut self, camera: CameraSpec) -> Result<(), EngineError> {
        (**self).add_camera(camera)
    }

    fn render_to_file(&mut self, path: &Path, format: OutputFormat) -> Result<(), EngineError> {
        (**self).render_to_file(path, format)
    }
}
