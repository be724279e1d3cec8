use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    config::RunConfig,
    error::SinkError,
    record::{MappingRow, RunMetadata},
};

const TABLE_HEADER: &str = "base_img,query_img";

/// Destination of `map.csv`.
pub trait TableSink: Write {
    /// Makes written rows durable.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl TableSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Opens `map.csv` as a plain file.
pub fn create_table_file(path: &Path) -> io::Result<File> {
    File::create(path)
}

/// Writes `map.csv` row by row and `meta.json` once at the end.
pub struct OutputRecorder<W: TableSink = File> {
    table_path: PathBuf,
    meta_path: PathBuf,
    writer: Option<BufWriter<W>>,
    write_meta: bool,
    rows: usize,
}

impl OutputRecorder {
    pub fn create(config: &RunConfig) -> Result<Self, SinkError> {
        Self::with_table(config, create_table_file)
    }
}

impl<W: TableSink> OutputRecorder<W> {
    /// Opens the table through `open_table` and writes its header when the
    /// table is enabled.
    pub fn with_table<F>(config: &RunConfig, open_table: F) -> Result<Self, SinkError>
    where
        F: FnOnce(&Path) -> io::Result<W>,
    {
        let mut recorder = Self {
            table_path: config.table_path(),
            meta_path: config.meta_path(),
            writer: None,
            write_meta: config.generate_meta,
            rows: 0,
        };
        if config.generate_table {
            let sink = open_table(&recorder.table_path).map_err(|e| recorder.table_err(e))?;
            let mut writer = BufWriter::new(sink);
            writeln!(writer, "{TABLE_HEADER}")
                .and_then(|_| writer.flush())
                .map_err(|e| recorder.table_err(e))?;
            recorder.writer = Some(writer);
        }
        Ok(recorder)
    }

    /// Appends and flushes one row; a no-op when the table is disabled.
    pub fn record_row(&mut self, source: &Path, render: &Path) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let row = MappingRow::new(source, render);
        let written = writeln!(writer, "{row}").and_then(|_| writer.flush());
        if let Err(e) = written {
            // nothing more goes to a table that failed mid-row
            self.writer = None;
            return Err(self.table_err(e));
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn table_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Closes the table and writes `meta.json` when enabled.
    pub fn finalize(&mut self, metadata: &RunMetadata) -> Result<(), SinkError> {
        if self.writer.is_some() {
            debug_assert_eq!(metadata.size, self.rows);
        }
        self.close()?;
        if !self.write_meta {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(metadata)?;
        let io_err = |source: std::io::Error| SinkError::Io {
            path: self.meta_path.clone(),
            source,
        };
        let mut writer = BufWriter::new(File::create(&self.meta_path).map_err(io_err)?);
        writeln!(writer, "{json}").map_err(io_err)?;
        writer
            .into_inner()
            .map_err(|e| io_err(e.into_error()))?
            .sync_all()
            .map_err(io_err)
    }

    pub fn close(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            writer
                .into_inner()
                .map_err(|e| self.table_err(e.into_error()))?
                .sync()
                .map_err(|e| self.table_err(e))?;
        }
        Ok(())
    }

    fn table_err(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.table_path.clone(),
            source,
        }
    }
}

impl<W: TableSink> Drop for OutputRecorder<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
