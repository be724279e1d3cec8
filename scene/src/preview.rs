//! Software preview engine.
//!
//! A pinhole camera with look-at, flat-shaded planes and a projectively warped
//! billboard. Planes are painted back to front by their farthest corner;
//! textured planes always go last so the subject is never hidden.

use std::path::Path;

use glam::{DMat4, DQuat, DVec3};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use imageproc::{
    drawing::draw_polygon_mut,
    geometric_transformations::{Interpolation, Projection, warp_into},
    point::Point,
};
use tracing::debug;

use crate::engine::{
    CameraSpec, EngineError, OutputFormat, PlaneHandle, PlaneSpec, PointLight, SceneEngine,
};

const NEAR: f64 = 1e-3;
const PIXEL_LIMIT: f64 = 1e6;

#[derive(Clone, Debug)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_deg: f64,
    /// Light floor applied to every tinted plane, `[0, 1]`.
    pub ambient: f32,
    pub background: [u8; 3],
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            fov_deg: 50.0,
            ambient: 0.35,
            background: [18, 18, 22],
        }
    }
}

enum Surface {
    Tint([f32; 4]),
    Texture(RgbaImage),
}

struct PlaneEntry {
    location: DVec3,
    rotation: DQuat,
    scale: [f64; 2],
    surface: Surface,
}

impl PlaneEntry {
    /// Corners in texture order: top-left, top-right, bottom-right, bottom-left.
    fn corners(&self) -> [DVec3; 4] {
        let (hx, hy) = (self.scale[0] / 2.0, self.scale[1] / 2.0);
        [(-hx, hy), (hx, hy), (hx, -hy), (-hx, -hy)]
            .map(|(x, y)| self.location + self.rotation * DVec3::new(x, y, 0.0))
    }

    fn normal(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }
}

/// Look-at view plus pinhole projection.
struct View {
    eye: DVec3,
    view: DMat4,
    proj: DMat4,
    width: f64,
    height: f64,
}

impl View {
    fn look_at(eye: DVec3, target: DVec3, config: &PreviewConfig) -> Result<Self, EngineError> {
        let forward = (target - eye)
            .try_normalize()
            .ok_or(EngineError::DegenerateCamera(eye))?;
        // Z up, unless looking straight along it
        let up = if forward.cross(DVec3::Z).length_squared() > 1e-12 {
            DVec3::Z
        } else {
            DVec3::Y
        };
        let (width, height) = (f64::from(config.width), f64::from(config.height));
        let fov = config.fov_deg.to_radians().max(2e-3);
        Ok(Self {
            eye,
            view: DMat4::look_at_rh(eye, target, up),
            proj: DMat4::perspective_infinite_rh(fov, width / height.max(1.0), NEAR),
            width,
            height,
        })
    }

    /// Camera space: x right, y up, z depth along the view direction.
    fn to_camera(&self, p: DVec3) -> DVec3 {
        let c = self.view.transform_point3(p);
        DVec3::new(c.x, c.y, -c.z)
    }

    fn project(&self, c: DVec3) -> (f64, f64) {
        let ndc = self.proj.project_point3(DVec3::new(c.x, c.y, -c.z));
        let u = (ndc.x + 1.0) * 0.5 * self.width;
        let v = (1.0 - ndc.y) * 0.5 * self.height;
        (
            u.clamp(-PIXEL_LIMIT, PIXEL_LIMIT),
            v.clamp(-PIXEL_LIMIT, PIXEL_LIMIT),
        )
    }
}

/// Clips a camera-space polygon against the near plane.
fn clip_near(poly: &[DVec3]) -> Vec<DVec3> {
    let mut out = Vec::with_capacity(poly.len() + 2);
    for (i, &a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        let (a_in, b_in) = (a.z >= NEAR, b.z >= NEAR);
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (NEAR - a.z) / (b.z - a.z);
            out.push(a + (b - a) * t);
        }
    }
    out
}

fn shade(color: [f32; 4], factor: f32) -> Rgba<u8> {
    let c = |v: f32| (v * factor * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([c(color[0]), c(color[1]), c(color[2]), 255])
}

pub struct PreviewEngine {
    config: PreviewConfig,
    planes: Vec<PlaneEntry>,
    light: Option<PointLight>,
    camera: Option<CameraSpec>,
}

impl PreviewEngine {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            planes: Vec::new(),
            light: None,
            camera: None,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn object_count(&self) -> usize {
        self.planes.len() + usize::from(self.light.is_some()) + usize::from(self.camera.is_some())
    }

    /// Adds an in-memory texture as a billboard one unit high.
    pub fn add_image_plane(
        &mut self,
        texture: RgbaImage,
        location: DVec3,
        rotation: DQuat,
    ) -> PlaneHandle {
        let aspect = f64::from(texture.width()) / f64::from(texture.height().max(1));
        self.planes.push(PlaneEntry {
            location,
            rotation,
            scale: [aspect, 1.0],
            surface: Surface::Texture(texture),
        });
        PlaneHandle(self.planes.len() - 1)
    }

    pub fn render_image(&self) -> Result<RgbaImage, EngineError> {
        let camera = self.camera.ok_or(EngineError::NoCamera)?;
        let target = match camera.track {
            Some(PlaneHandle(i)) => {
                self.planes
                    .get(i)
                    .ok_or(EngineError::UnknownHandle(i))?
                    .location
            }
            None => camera.location + camera.rotation * -DVec3::Z,
        };
        let view = View::look_at(camera.location, target, &self.config)?;

        let [r, g, b] = self.config.background;
        let mut canvas = RgbaImage::from_pixel(self.config.width, self.config.height, Rgba([r, g, b, 255]));

        let mut order: Vec<(bool, f64, &PlaneEntry)> = self
            .planes
            .iter()
            .map(|p| {
                let far = p
                    .corners()
                    .iter()
                    .map(|&c| view.to_camera(c).z)
                    .fold(f64::MIN, f64::max);
                (matches!(p.surface, Surface::Texture(_)), far, p)
            })
            .collect();
        order.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.total_cmp(&a.1)));

        for (_, _, plane) in order {
            match &plane.surface {
                Surface::Tint(color) => self.fill_plane(&mut canvas, &view, plane, *color),
                Surface::Texture(texture) => Self::warp_plane(&mut canvas, &view, plane, texture),
            }
        }
        Ok(canvas)
    }

    fn fill_plane(&self, canvas: &mut RgbaImage, view: &View, plane: &PlaneEntry, color: [f32; 4]) {
        let camera_space: Vec<DVec3> = plane.corners().iter().map(|&c| view.to_camera(c)).collect();
        let mut points: Vec<Point<i32>> = Vec::with_capacity(6);
        for c in clip_near(&camera_space) {
            let (u, v) = view.project(c);
            let p = Point::new(u.round() as i32, v.round() as i32);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return;
        }

        let factor = match self.light {
            Some(light) => {
                let mut normal = plane.normal();
                if normal.dot(view.eye - plane.location) < 0.0 {
                    normal = -normal;
                }
                let lambert = (light.location - plane.location)
                    .try_normalize()
                    .map_or(0.0, |l| normal.dot(l).max(0.0)) as f32;
                self.config.ambient + (1.0 - self.config.ambient) * lambert
            }
            None => self.config.ambient,
        };
        draw_polygon_mut(canvas, &points, shade(color, factor));
    }

    fn warp_plane(canvas: &mut RgbaImage, view: &View, plane: &PlaneEntry, texture: &RgbaImage) {
        let corners = plane.corners().map(|c| view.to_camera(c));
        if corners.iter().any(|c| c.z < NEAR) {
            debug!("billboard crosses the near plane, skipped");
            return;
        }
        let (w, h) = (texture.width() as f32, texture.height() as f32);
        let from = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let to = corners.map(|c| {
            let (u, v) = view.project(c);
            (u as f32, v as f32)
        });
        let Some(projection) = Projection::from_control_points(from, to) else {
            debug!("billboard projection is degenerate, skipped");
            return;
        };

        let mut layer = RgbaImage::new(canvas.width(), canvas.height());
        warp_into(
            texture,
            &projection,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
            &mut layer,
        );
        imageops::overlay(canvas, &layer, 0, 0);
    }
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new(PreviewConfig::default())
    }
}

impl SceneEngine for PreviewEngine {
    fn clear_scene(&mut self) -> Result<(), EngineError> {
        self.planes.clear();
        self.light = None;
        self.camera = None;
        Ok(())
    }

    fn add_light(&mut self, light: PointLight) -> Result<(), EngineError> {
        self.light = Some(light);
        Ok(())
    }

    fn add_plane(&mut self, plane: PlaneSpec) -> Result<PlaneHandle, EngineError> {
        self.planes.push(PlaneEntry {
            location: plane.location,
            rotation: plane.rotation,
            scale: plane.scale,
            surface: Surface::Tint(plane.material.color),
        });
        Ok(PlaneHandle(self.planes.len() - 1))
    }

    fn import_image_as_plane(
        &mut self,
        path: &Path,
        location: DVec3,
        rotation: DQuat,
    ) -> Result<PlaneHandle, EngineError> {
        let texture = image::open(path)
            .map_err(|source| EngineError::ImageRead {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        if texture.width() == 0 || texture.height() == 0 {
            return Err(EngineError::EmptyImage(path.to_path_buf()));
        }
        Ok(self.add_image_plane(texture, location, rotation))
    }

    fn add_camera(&mut self, camera: CameraSpec) -> Result<(), EngineError> {
        match camera.track {
            Some(PlaneHandle(i)) if i >= self.planes.len() => {
                return Err(EngineError::UnknownHandle(i));
            }
            _ => {}
        }
        self.camera = Some(camera);
        Ok(())
    }

    fn render_to_file(&mut self, path: &Path, format: OutputFormat) -> Result<(), EngineError> {
        let canvas = self.render_image()?;
        let written = match format {
            OutputFormat::Jpeg => DynamicImage::ImageRgba8(canvas)
                .to_rgb8()
                .save_with_format(path, ImageFormat::Jpeg),
            OutputFormat::Png => canvas.save_with_format(path, ImageFormat::Png),
        };
        written.map_err(|source| EngineError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compose::{SceneComposer, facing_x},
        engine::Material,
        geom::CameraSample,
    };
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    const RED: Rgba<u8> = Rgba([220, 10, 10, 255]);

    fn small() -> PreviewConfig {
        PreviewConfig {
            width: 96,
            height: 64,
            ..PreviewConfig::default()
        }
    }

    fn head_on(engine: &mut PreviewEngine) {
        let handle = engine.add_image_plane(RgbaImage::from_pixel(8, 8, RED), DVec3::ZERO, facing_x());
        engine
            .add_camera(CameraSpec {
                location: DVec3::new(3.0, 0.0, 0.0),
                rotation: DQuat::IDENTITY,
                track: Some(handle),
            })
            .unwrap();
    }

    #[test]
    fn billboard_fills_image_centre() {
        let mut engine = PreviewEngine::new(small());
        head_on(&mut engine);
        let img = engine.render_image().unwrap();

        assert_eq!(img.dimensions(), (96, 64));
        assert_eq!(*img.get_pixel(48, 32), RED);
        assert_eq!(*img.get_pixel(0, 0), Rgba([18, 18, 22, 255]));
    }

    #[test]
    fn billboard_is_painted_over_planes() {
        let mut engine = PreviewEngine::new(small());
        engine
            .add_plane(PlaneSpec {
                location: DVec3::new(1.0, 0.0, 0.0),
                rotation: facing_x(),
                scale: [3.0, 3.0],
                material: Material::new("front", [0.0, 0.0, 1.0, 1.0]),
            })
            .unwrap();
        head_on(&mut engine);
        let img = engine.render_image().unwrap();

        assert_eq!(*img.get_pixel(48, 32), RED);
    }

    #[test]
    fn floor_behind_camera_is_clipped() {
        let mut engine = PreviewEngine::new(small());
        engine
            .add_plane(PlaneSpec {
                location: DVec3::new(0.0, 0.0, -0.7),
                rotation: DQuat::IDENTITY,
                scale: [10.0, 10.0],
                material: Material::new("floor", [0.0, 1.0, 0.0, 1.0]),
            })
            .unwrap();
        head_on(&mut engine);
        let img = engine.render_image().unwrap();

        let bottom = img.get_pixel(48, 63);
        assert!(bottom[1] > bottom[0] && bottom[1] > bottom[2], "{bottom:?}");
    }

    #[test]
    fn render_without_camera_fails() {
        let engine = PreviewEngine::new(small());
        assert!(matches!(engine.render_image(), Err(EngineError::NoCamera)));
    }

    #[test]
    fn tracking_unknown_plane_fails() {
        let mut engine = PreviewEngine::new(small());
        let err = engine
            .add_camera(CameraSpec {
                location: DVec3::X,
                rotation: DQuat::IDENTITY,
                track: Some(PlaneHandle(4)),
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownHandle(4)));
    }

    #[test]
    fn camera_on_target_is_degenerate() {
        let mut engine = PreviewEngine::new(small());
        let handle = engine.add_image_plane(RgbaImage::from_pixel(2, 2, RED), DVec3::ZERO, facing_x());
        engine
            .add_camera(CameraSpec {
                location: DVec3::ZERO,
                rotation: DQuat::IDENTITY,
                track: Some(handle),
            })
            .unwrap();
        assert!(matches!(
            engine.render_image(),
            Err(EngineError::DegenerateCamera(_))
        ));
    }

    #[test]
    fn camera_straight_below_renders() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("subject.png");
        RgbaImage::from_pixel(8, 8, RED).save(&src).unwrap();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        let mut composer = SceneComposer::new(PreviewEngine::new(small()));
        let below = CameraSample {
            h_angle: 0.0,
            v_angle: 180.0,
            distance: 5.0,
        };
        composer.compose(&src, &below, &mut rng).unwrap();
        composer.render_to(&dir.path().join("below.jpg")).unwrap();
        assert!(dir.path().join("below.jpg").exists());
    }

    #[test]
    fn unreadable_image_fails_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut engine = PreviewEngine::new(small());
        let err = engine
            .import_image_as_plane(&path, DVec3::ZERO, facing_x())
            .unwrap_err();
        assert!(matches!(err, EngineError::ImageRead { .. }));
    }

    #[test]
    fn composed_scene_renders_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("subject.png");
        RgbaImage::from_pixel(16, 12, RED).save(&src).unwrap();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut composer = SceneComposer::new(PreviewEngine::new(small()));
        let sample = CameraSample {
            h_angle: 20.0,
            v_angle: 80.0,
            distance: 4.0,
        };
        composer.compose(&src, &sample, &mut rng).unwrap();
        assert_eq!(composer.engine().object_count(), 5);

        let out = dir.path().join("subject_00000.jpg");
        composer.render_to(&out).unwrap();
        let written = image::open(&out).unwrap();
        assert_eq!((written.width(), written.height()), (96, 64));

        composer.compose(&src, &sample, &mut rng).unwrap();
        assert_eq!(composer.engine().object_count(), 5);
    }
}
