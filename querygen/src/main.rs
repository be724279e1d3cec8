use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use querygen::{ConfigFile, Generator};
use scene::preview::{PreviewConfig, PreviewEngine};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Render source images into randomized 3D scenes.
#[derive(Parser, Debug)]
#[command(name = "querygen")]
#[command(version)]
#[command(
    long_about = "Composites every image of a source folder onto a billboard in a small 3D scene and renders it from randomly sampled camera positions.\n\nOptions given on the command line override the YAML config.\n\nExample usage:\n  querygen --config settings.yaml --render-per-input 4 --seed 7"
)]
struct Cli {
    /// YAML run configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder with the images to put on the billboard.
    #[arg(long)]
    src: Option<PathBuf>,

    /// Folder to place renders, map.csv and meta.json in.
    #[arg(long)]
    dst: Option<PathBuf>,

    /// Renders per source image.
    #[arg(short = 'n', long)]
    render_per_input: Option<usize>,

    /// Stop after this many successful renders.
    #[arg(short, long)]
    max_images: Option<usize>,

    /// Seed for every random draw of the run.
    #[arg(long)]
    seed: Option<u64>,

    /// Shuffle inputs once before rendering.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    shuffle: Option<bool>,

    /// Write map.csv.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    table: Option<bool>,

    /// Write meta.json.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    meta: Option<bool>,

    /// Reuse an existing output folder.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    overwrite: Option<bool>,

    /// Render width in pixels.
    #[arg(long, default_value = "512")]
    width: u32,

    /// Render height in pixels.
    #[arg(long, default_value = "512")]
    height: u32,

    /// Vertical field of view in degrees.
    #[arg(long, default_value = "50")]
    fov: f64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            src: self.src.clone(),
            dst: self.dst.clone(),
            render_per_input: self.render_per_input,
            max_images_to_render: self.max_images,
            seed: self.seed,
            shuffle_input: self.shuffle,
            generate_table: self.table,
            generate_meta: self.meta,
            overwrite: self.overwrite,
            ..ConfigFile::default()
        }
    }

    fn preview_config(&self) -> PreviewConfig {
        PreviewConfig {
            width: self.width,
            height: self.height,
            fov_deg: self.fov,
            ..PreviewConfig::default()
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when it parses.
fn log_filter(env: Option<&str>, level: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
            &cli.log_level,
        ))
        .init();

    let mut file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    file.apply_overrides(cli.overrides());
    let config = file.into_run_config()?;
    info!(src = %config.src.display(), dst = %config.dst.display(), "configuration loaded");

    let engine = PreviewEngine::new(cli.preview_config());
    let mut generator = Generator::new(config, engine);
    Ok(match generator.run_logged() {
        Some(_) => ExitCode::SUCCESS,
        None => ExitCode::FAILURE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::parse_from([
            "querygen", "--src", "in", "--dst", "out", "-n", "3", "--shuffle", "--meta=false",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.src, Some(PathBuf::from("in")));
        assert_eq!(overrides.render_per_input, Some(3));
        assert_eq!(overrides.shuffle_input, Some(true));
        assert_eq!(overrides.generate_meta, Some(false));
        assert_eq!(overrides.generate_table, None);
        assert_eq!(overrides.overwrite, None);
    }

    #[test]
    fn flags_can_undo_yaml_switches() {
        let mut file = ConfigFile::from_yaml_str(
            "src: in\ndst: out\nshuffle_input: true\ngenerate_table: false\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["querygen", "--shuffle=false", "--table", "--overwrite=true"]);
        file.apply_overrides(cli.overrides());
        let config = file.into_run_config().unwrap();

        assert!(!config.shuffle_input);
        assert!(config.generate_table);
        assert!(config.overwrite);
    }

    #[test]
    fn env_filter_wins_over_level_flag() {
        use tracing_subscriber::filter::LevelFilter;

        let hint = |env, level| log_filter(env, level).max_level_hint();
        assert_eq!(hint(Some("debug"), "warn"), Some(LevelFilter::DEBUG));
        assert_eq!(hint(None, "warn"), Some(LevelFilter::WARN));
        assert_eq!(hint(Some("querygen=loud"), "error"), Some(LevelFilter::ERROR));
    }

    #[test]
    fn preview_size_comes_from_flags() {
        let cli = Cli::parse_from(["querygen", "--width", "64", "--height", "32"]);
        let preview = cli.preview_config();
        assert_eq!((preview.width, preview.height), (64, 32));
        assert_eq!(preview.fov_deg, 50.0);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
