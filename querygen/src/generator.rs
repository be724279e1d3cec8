use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use rand::Rng;
use scene::{compose::SceneComposer, engine::SceneEngine};
use tracing::{debug, error, info, warn};

use crate::{
    config::RunConfig,
    error::{AttemptError, RunError},
    inputs::{InputSet, render_name},
    io::{OutputRecorder, TableSink, create_table_file},
    record::{AttemptFailure, RunMetadata, RunSummary},
    sampler::{self, SeedStream},
};

/// Drives a whole run: every input, `render_per_input` attempts each, one
/// scene at a time.
pub struct Generator<E> {
    config: RunConfig,
    composer: SceneComposer<E>,
}

impl<E: SceneEngine> Generator<E> {
    pub fn new(config: RunConfig, engine: E) -> Self {
        Self::with_composer(config, SceneComposer::new(engine))
    }

    pub fn with_composer(config: RunConfig, composer: SceneComposer<E>) -> Self {
        Self { config, composer }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn into_engine(self) -> E {
        self.composer.into_engine()
    }

    /// Runs to completion, logging instead of returning a fatal error.
    pub fn run_logged(&mut self) -> Option<RunSummary> {
        self.run_logged_with(create_table_file)
    }

    pub fn run_logged_with<W, F>(&mut self, open_table: F) -> Option<RunSummary>
    where
        W: TableSink,
        F: FnOnce(&Path) -> io::Result<W>,
    {
        match self.run_with(open_table) {
            Ok(summary) => Some(summary),
            Err(err) => {
                error!(error = %err, "generation aborted; outputs written so far are kept");
                None
            }
        }
    }

    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        self.run_with(create_table_file)
    }

    /// Like [`run`](Self::run), with `map.csv` opened through `open_table`.
    pub fn run_with<W, F>(&mut self, open_table: F) -> Result<RunSummary, RunError>
    where
        W: TableSink,
        F: FnOnce(&Path) -> io::Result<W>,
    {
        let mut inputs =
            InputSet::discover(&self.config.src).map_err(|source| RunError::ListInputs {
                path: self.config.src.clone(),
                source,
            })?;
        let images_dir = prepare_output(&self.config)?;

        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        info!(
            seed,
            inputs = inputs.len(),
            render_per_input = self.config.render_per_input,
            "starting generation"
        );
        let mut seeds = SeedStream::new(seed);
        if self.config.shuffle_input {
            inputs.shuffle(&mut seeds.next_rng());
        }

        let mut recorder = OutputRecorder::with_table(&self.config, open_table)?;
        let mut generated = 0;
        let mut failures = Vec::new();
        let mut cutoff_reached = false;

        for (input_index, input) in inputs.iter().enumerate() {
            let source = self.config.src.join(input);
            for attempt in 0..self.config.render_per_input {
                let target = images_dir.join(render_name(input, attempt, self.composer.format()));
                let mut rng = seeds.next_rng();

                match self.attempt(&source, &target, &mut rng) {
                    Ok(()) => {
                        recorder.record_row(&source, &target)?;
                        generated += 1;
                        if self
                            .config
                            .max_images_to_render
                            .is_some_and(|max| generated >= max)
                        {
                            cutoff_reached = true;
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(
                            input_index,
                            input = %input.display(),
                            attempt,
                            error = %error,
                            "render attempt failed"
                        );
                        failures.push(AttemptFailure {
                            input_index,
                            input: input.to_path_buf(),
                            attempt,
                            error,
                        });
                    }
                }
            }
            info!("generated images for {} inputs", input_index + 1);
            if cutoff_reached {
                info!(generated, "reached max_images_to_render");
                break;
            }
        }

        let metadata = RunMetadata::new(&self.config, seed, generated);
        recorder.finalize(&metadata)?;
        info!(generated, failed = failures.len(), "done");

        Ok(RunSummary {
            metadata,
            failures,
            cutoff_reached,
        })
    }

    fn attempt<R: Rng + ?Sized>(
        &mut self,
        source: &Path,
        target: &Path,
        rng: &mut R,
    ) -> Result<(), AttemptError> {
        let sample = sampler::sample(&self.config, rng);
        debug!(output = %target.display(), %sample, "rendering");
        self.composer.compose(source, &sample, rng)?;
        self.composer.render_to(target)?;
        Ok(())
    }
}

/// Creates `{dst}/images`. Without `overwrite` an existing folder is refused,
/// which keeps two runs from writing into the same place.
fn prepare_output(config: &RunConfig) -> Result<PathBuf, RunError> {
    let create_err = |path: &Path, source: std::io::Error| RunError::CreateOutput {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(&config.dst).map_err(|e| create_err(config.dst.as_path(), e))?;

    let images = config.images_dir();
    if config.overwrite {
        fs::create_dir_all(&images).map_err(|e| create_err(images.as_path(), e))?;
    } else {
        match fs::create_dir(&images) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RunError::OutputExists(images));
            }
            Err(e) => return Err(create_err(images.as_path(), e)),
        }
    }
    Ok(images)
}
