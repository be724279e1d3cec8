use std::{
    collections::HashMap,
    fs::read_dir,
    io,
    path::{Path, PathBuf},
};

use rand::{Rng, seq::SliceRandom};
use scene::engine::OutputFormat;
use tracing::warn;

/// Source image file names, read once from the source folder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputSet {
    names: Vec<PathBuf>,
}

impl InputSet {
    /// Lists regular, non-hidden files in `src`, sorted by name.
    pub fn discover(src: &Path) -> io::Result<Self> {
        let mut names = Vec::new();
        for entry in read_dir(src)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            names.push(PathBuf::from(name));
        }
        names.sort();

        let set = Self { names };
        set.warn_on_stem_collisions();
        Ok(set)
    }

    pub fn from_names<I, P>(names: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Permutes the set once; iteration order is fixed afterwards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.names.shuffle(rng);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.names.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn warn_on_stem_collisions(&self) {
        let mut seen: HashMap<String, &Path> = HashMap::new();
        for name in &self.names {
            let stem = stem_of(name);
            if let Some(prev) = seen.insert(stem.clone(), name) {
                warn!(
                    first = %prev.display(),
                    second = %name.display(),
                    %stem,
                    "inputs share a file stem; their renders will overwrite each other"
                );
            }
        }
    }
}

fn stem_of(name: &Path) -> String {
    name.file_stem()
        .unwrap_or(name.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Output file name for one attempt, e.g. `cat_00003.jpg`.
pub fn render_name(input: &Path, attempt: usize, format: OutputFormat) -> String {
    format!("{}_{attempt:05}.{}", stem_of(input), format.extension())
}
