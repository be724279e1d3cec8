use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{config::RunConfig, error::AttemptError};

/// One `map.csv` row: a source image and one of its renders. `Display`
/// yields the CSV line without its terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingRow {
    pub base_img: String,
    pub query_img: String,
}

impl MappingRow {
    pub fn new(source: &Path, render: &Path) -> Self {
        Self {
            base_img: source.to_string_lossy().into_owned(),
            query_img: render.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for MappingRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", csv_field(&self.base_img), csv_field(&self.query_img))
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Contents of `meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub src: PathBuf,
    pub dst: PathBuf,
    pub camera_angles_range_h: (f64, f64),
    pub camera_angles_range_v: (f64, f64),
    pub camera_distance_range: (f64, f64),
    pub render_per_input: usize,
    /// Successful renders.
    pub size: usize,
    pub seed: u64,
}

impl RunMetadata {
    pub fn new(config: &RunConfig, seed: u64, size: usize) -> Self {
        Self {
            src: config.src.clone(),
            dst: config.dst.clone(),
            camera_angles_range_h: config.camera_angles_range_h,
            camera_angles_range_v: config.camera_angles_range_v,
            camera_distance_range: config.camera_distance_range,
            render_per_input: config.render_per_input,
            size,
            seed,
        }
    }
}

#[derive(Debug)]
pub struct AttemptFailure {
    pub input_index: usize,
    pub input: PathBuf,
    pub attempt: usize,
    pub error: AttemptError,
}

#[derive(Debug)]
pub struct RunSummary {
    pub metadata: RunMetadata,
    pub failures: Vec<AttemptFailure>,
    pub cutoff_reached: bool,
}

impl RunSummary {
    pub fn generated(&self) -> usize {
        self.metadata.size
    }
}
