//! Scripted engine for exercising composition and generation without a
//! renderer.
//!
//! ```ignore
//! use scene::fixtures::ScriptedEngine;
//!
//! let mut engine = ScriptedEngine::new().failing_on_input("b.png");
//! // drive it through a SceneComposer, then inspect
//! assert_eq!(engine.render_calls(), 2);
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use glam::{DQuat, DVec3};

use crate::engine::{
    CameraSpec, EngineError, OutputFormat, PlaneHandle, PlaneSpec, PointLight, SceneEngine,
};

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    ClearScene,
    AddLight(DVec3),
    AddPlane { material: String, color: [f32; 4] },
    ImportImage(PathBuf),
    AddCamera(CameraSpec),
    Render(PathBuf),
}

/// Object counts present in the scene when a render was issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub lights: usize,
    pub planes: usize,
    pub cameras: usize,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    pub calls: Vec<EngineCall>,
    pub rendered: Vec<SceneCounts>,
    live: SceneCounts,
    failing_inputs: Vec<String>,
    failing_renders: Vec<usize>,
    render_attempts: usize,
    write_files: bool,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            rendered: Vec::new(),
            live: SceneCounts::default(),
            failing_inputs: Vec::new(),
            failing_renders: Vec::new(),
            render_attempts: 0,
            write_files: true,
        }
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every import of a file with this name fails.
    pub fn failing_on_input(mut self, file_name: &str) -> Self {
        self.failing_inputs.push(file_name.to_string());
        self
    }

    /// The n-th render call (0-based, counting failed ones) fails.
    pub fn failing_on_render(mut self, n: usize) -> Self {
        self.failing_renders.push(n);
        self
    }

    /// Skip writing placeholder files on render.
    pub fn without_files(mut self) -> Self {
        self.write_files = false;
        self
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn render_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Render(_)))
    }

    pub fn import_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::ImportImage(_)))
    }

    pub fn clear_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::ClearScene))
    }

    pub fn cameras(&self) -> Vec<CameraSpec> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::AddCamera(cam) => Some(*cam),
                _ => None,
            })
            .collect()
    }

    pub fn planes(&self) -> Vec<(String, [f32; 4])> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::AddPlane { material, color } => Some((material.clone(), *color)),
                _ => None,
            })
            .collect()
    }
}

impl SceneEngine for ScriptedEngine {
    fn clear_scene(&mut self) -> Result<(), EngineError> {
        self.calls.push(EngineCall::ClearScene);
        self.live = SceneCounts::default();
        Ok(())
    }

    fn add_light(&mut self, light: PointLight) -> Result<(), EngineError> {
        self.calls.push(EngineCall::AddLight(light.location));
        self.live.lights += 1;
        Ok(())
    }

    fn add_plane(&mut self, plane: PlaneSpec) -> Result<PlaneHandle, EngineError> {
        self.calls.push(EngineCall::AddPlane {
            material: plane.material.name,
            color: plane.material.color,
        });
        self.live.planes += 1;
        Ok(PlaneHandle(self.live.planes - 1))
    }

    fn import_image_as_plane(
        &mut self,
        path: &Path,
        _location: DVec3,
        _rotation: DQuat,
    ) -> Result<PlaneHandle, EngineError> {
        self.calls.push(EngineCall::ImportImage(path.to_path_buf()));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_inputs.contains(&name) {
            return Err(EngineError::Backend(format!(
                "scripted import failure for {}",
                path.display()
            )));
        }
        self.live.planes += 1;
        Ok(PlaneHandle(self.live.planes - 1))
    }

    fn add_camera(&mut self, camera: CameraSpec) -> Result<(), EngineError> {
        self.calls.push(EngineCall::AddCamera(camera));
        self.live.cameras += 1;
        Ok(())
    }

    fn render_to_file(&mut self, path: &Path, _format: OutputFormat) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Render(path.to_path_buf()));
        let n = self.render_attempts;
        self.render_attempts += 1;
        if self.failing_renders.contains(&n) {
            return Err(EngineError::Backend(format!("scripted render failure #{n}")));
        }
        if self.live.cameras == 0 {
            return Err(EngineError::NoCamera);
        }
        self.rendered.push(self.live);
        if self.write_files {
            fs::write(path, b"scripted render")?;
        }
        Ok(())
    }
}
