//! Synthesizes "query" images by compositing each source image into a small
//! 3D scene and rendering it from randomized camera viewpoints.
//!
//! The run writes `{dst}/images/{stem}_{attempt:05}.jpg` per successful
//! attempt, and optionally `{dst}/map.csv` (source to render rows, appended as
//! renders succeed) and `{dst}/meta.json` (run summary).
//!
//! ```ignore
//! use querygen::{Generator, RunConfig};
//! use scene::preview::PreviewEngine;
//!
//! let config = RunConfig::new("src", "dst");
//! let summary = Generator::new(config, PreviewEngine::default()).run()?;
//! println!("{} renders", summary.generated());
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod inputs;
pub mod io;
pub mod record;
pub mod sampler;

pub use config::{ConfigFile, RunConfig};
pub use error::{AttemptError, ConfigError, RunError, SinkError};
pub use generator::Generator;
pub use io::{OutputRecorder, TableSink};
pub use record::{AttemptFailure, MappingRow, RunMetadata, RunSummary};
