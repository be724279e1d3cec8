//! Run configuration.
//!
//! A [`ConfigFile`] is what YAML and command-line flags produce: every field
//! optional, unknown keys ignored. [`ConfigFile::into_run_config`] applies the
//! defaults and checks the result, yielding an immutable [`RunConfig`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_ANGLES_RANGE_H: (f64, f64) = (0.0, 0.0);
pub const DEFAULT_ANGLES_RANGE_V: (f64, f64) = (90.0, 90.0);
pub const DEFAULT_DISTANCE_RANGE: (f64, f64) = (5.0, 5.0);
pub const DEFAULT_RENDER_PER_INPUT: usize = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Azimuth range in degrees; endpoints in either order.
    pub camera_angles_range_h: (f64, f64),
    /// Polar angle range in degrees, measured from +Z; endpoints in either order.
    pub camera_angles_range_v: (f64, f64),
    pub camera_distance_range: (f64, f64),
    pub render_per_input: usize,
    pub max_images_to_render: Option<usize>,
    pub generate_table: bool,
    pub generate_meta: bool,
    pub shuffle_input: bool,
    pub seed: Option<u64>,
    pub overwrite: bool,
}

impl RunConfig {
    /// Defaults for everything but the two folders.
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            camera_angles_range_h: DEFAULT_ANGLES_RANGE_H,
            camera_angles_range_v: DEFAULT_ANGLES_RANGE_V,
            camera_distance_range: DEFAULT_DISTANCE_RANGE,
            render_per_input: DEFAULT_RENDER_PER_INPUT,
            max_images_to_render: None,
            generate_table: true,
            generate_meta: true,
            shuffle_input: false,
            seed: None,
            overwrite: false,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dst.join("images")
    }

    pub fn table_path(&self) -> PathBuf {
        self.dst.join("map.csv")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dst.join("meta.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_per_input == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render_per_input",
                message: "must be at least 1".into(),
            });
        }
        if self.max_images_to_render == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_images_to_render",
                message: "must be at least 1 when set".into(),
            });
        }
        check_range("camera_angles_range_h", self.camera_angles_range_h)?;
        check_range("camera_angles_range_v", self.camera_angles_range_v)?;
        check_range("camera_distance_range", self.camera_distance_range)?;
        let (a, b) = self.camera_distance_range;
        if a < 0.0 || b < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "camera_distance_range",
                message: format!("distances must be non-negative, got ({a}, {b})"),
            });
        }
        Ok(())
    }
}

fn check_range(key: &'static str, (a, b): (f64, f64)) -> Result<(), ConfigError> {
    if a.is_finite() && b.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key,
            message: format!("endpoints must be finite, got ({a}, {b})"),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub src: Option<PathBuf>,
    pub dst: Option<PathBuf>,
    pub camera_angles_range_h: Option<(f64, f64)>,
    pub camera_angles_range_v: Option<(f64, f64)>,
    /// Older layout: `[[v_min, h_min], [v_max, h_max]]`.
    pub camera_angles_range: Option<[[f64; 2]; 2]>,
    pub camera_distance_range: Option<(f64, f64)>,
    pub render_per_input: Option<usize>,
    pub max_images_to_render: Option<usize>,
    pub generate_table: Option<bool>,
    pub generate_meta: Option<bool>,
    pub shuffle_input: Option<bool>,
    pub seed: Option<u64>,
    pub overwrite: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Fields set in `other` replace ours.
    pub fn apply_overrides(&mut self, other: ConfigFile) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            src,
            dst,
            camera_angles_range_h,
            camera_angles_range_v,
            camera_angles_range,
            camera_distance_range,
            render_per_input,
            max_images_to_render,
            generate_table,
            generate_meta,
            shuffle_input,
            seed,
            overwrite,
        );
    }

    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let src = self.src.ok_or(ConfigError::Missing("src"))?;
        let dst = self.dst.ok_or(ConfigError::Missing("dst"))?;
        let mut config = RunConfig::new(src, dst);

        if let Some([[v_min, h_min], [v_max, h_max]]) = self.camera_angles_range {
            config.camera_angles_range_v = (v_min, v_max);
            config.camera_angles_range_h = (h_min, h_max);
        }
        if let Some(h) = self.camera_angles_range_h {
            config.camera_angles_range_h = h;
        }
        if let Some(v) = self.camera_angles_range_v {
            config.camera_angles_range_v = v;
        }
        if let Some(d) = self.camera_distance_range {
            config.camera_distance_range = d;
        }
        if let Some(n) = self.render_per_input {
            config.render_per_input = n;
        }
        config.max_images_to_render = self.max_images_to_render;
        config.generate_table = self.generate_table.unwrap_or(config.generate_table);
        config.generate_meta = self.generate_meta.unwrap_or(config.generate_meta);
        config.shuffle_input = self.shuffle_input.unwrap_or(config.shuffle_input);
        config.seed = self.seed;
        config.overwrite = self.overwrite.unwrap_or(config.overwrite);

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_yaml_is_parsed() {
        let file = ConfigFile::from_yaml_str(
            r#"
src: in
dst: out
camera_angles_range_h: [-60, 60]
camera_angles_range_v: [110, 70]
camera_distance_range: [5, 3]
render_per_input: 4
max_images_to_render: 10
generate_table: false
shuffle_input: true
seed: 99
"#,
        )
        .unwrap();
        let config = file.into_run_config().unwrap();

        assert_eq!(config.src, PathBuf::from("in"));
        assert_eq!(config.images_dir(), PathBuf::from("out/images"));
        assert_eq!(config.camera_angles_range_h, (-60.0, 60.0));
        assert_eq!(config.camera_angles_range_v, (110.0, 70.0));
        assert_eq!(config.camera_distance_range, (5.0, 3.0));
        assert_eq!(config.render_per_input, 4);
        assert_eq!(config.max_images_to_render, Some(10));
        assert!(!config.generate_table);
        assert!(config.generate_meta);
        assert!(config.shuffle_input);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn defaults_fill_missing_options() {
        let config = ConfigFile::from_yaml_str("src: a\ndst: b\n")
            .unwrap()
            .into_run_config()
            .unwrap();
        assert_eq!(config, RunConfig::new("a", "b"));
    }

    #[test]
    fn legacy_angle_layout_is_split() {
        let config = ConfigFile::from_yaml_str(
            "src: a\ndst: b\ncamera_angles_range: [[70, -60], [110, 60]]\n",
        )
        .unwrap()
        .into_run_config()
        .unwrap();
        assert_eq!(config.camera_angles_range_v, (70.0, 110.0));
        assert_eq!(config.camera_angles_range_h, (-60.0, 60.0));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file = ConfigFile::from_yaml_str("src: a\ndst: b\nlog_level: debug\nfoo: [1, 2]\n");
        assert!(file.unwrap().into_run_config().is_ok());
    }

    #[test]
    fn missing_folders_fail_fast() {
        let err = ConfigFile::from_yaml_str("dst: b\n")
            .unwrap()
            .into_run_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("src")));

        let err = ConfigFile::default().into_run_config().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("src")));

        let err = ConfigFile::from_yaml_str("src: a\n")
            .unwrap()
            .into_run_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("dst")));
    }

    #[test]
    fn invalid_counts_are_rejected() {
        let err = ConfigFile::from_yaml_str("src: a\ndst: b\nrender_per_input: 0\n")
            .unwrap()
            .into_run_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "render_per_input", .. }));

        let err = ConfigFile::from_yaml_str("src: a\ndst: b\nmax_images_to_render: 0\n")
            .unwrap()
            .into_run_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "max_images_to_render", .. }));
    }

    #[test]
    fn negative_distance_is_rejected() {
        let err = ConfigFile::from_yaml_str("src: a\ndst: b\ncamera_distance_range: [-1, 3]\n")
            .unwrap()
            .into_run_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "camera_distance_range", .. }));
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let mut file = ConfigFile::from_yaml_str("src: a\ndst: b\nrender_per_input: 3\n").unwrap();
        file.apply_overrides(ConfigFile {
            dst: Some("c".into()),
            shuffle_input: Some(true),
            ..ConfigFile::default()
        });
        let config = file.into_run_config().unwrap();

        assert_eq!(config.src, PathBuf::from("a"));
        assert_eq!(config.dst, PathBuf::from("c"));
        assert_eq!(config.render_per_input, 3);
        assert!(config.shuffle_input);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = ConfigFile::from_yaml_str("src: [unterminated\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
