// =============================================================================
// writer.rs: WHERE THE RECORDS END UP
// =============================================================================
//
// Everything the run produces lands in one directory:
//
//   <Source>.json / <Source>.csv    one pair per source
//   combined.json / combined.csv    every source, merged
//
// Files are written to a temporary name and renamed into place, so a run
// that dies halfway leaves the previous dataset readable. JSON is the array
// form; CSV always uses the whitelist as its header.
//
// The same directory is read back for two things: the last good dataset of
// a source that failed this run, and archived datasets (any other *.json)
// for the summary table.
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::OutputError;
use crate::models::{BreachRecord, RawRecord, Source, WHITELIST};

pub const COMBINED_STEM: &str = "combined";

pub struct DatasetWriter {
    dir: PathBuf,
    stats: WriterStats,
}

/// What the writer has done so far this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub files_written: u64,
    pub records_written: u64,
}

impl DatasetWriter {
    /// Open `dir` for writing, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| OutputError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            stats: WriterStats::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `<Source>.json` and `<Source>.csv`.
    pub fn write_source(&mut self, source: Source, records: &[BreachRecord]) -> Result<(), OutputError> {
        self.write_pair(source.name(), records)?;
        info!(
            source = %source,
            records = records.len(),
            dir = %self.dir.display(),
            "saved {} dataset",
            source
        );
        Ok(())
    }

    /// Write `combined.json` and `combined.csv`.
    pub fn write_combined(&mut self, records: &[BreachRecord]) -> Result<(), OutputError> {
        self.write_pair(COMBINED_STEM, records)?;
        info!(records = records.len(), "saved combined dataset");
        Ok(())
    }

    /// Write raw records as a JSON array, keys untouched. Used for the static
    /// dataset conversion.
    pub fn write_raw(&mut self, file_name: &str, records: &[RawRecord]) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(file_name);
        write_json(&path, records)?;
        self.stats.files_written += 1;
        self.stats.records_written += records.len() as u64;
        Ok(path)
    }

    /// The last dataset written for `source`, if there is one.
    pub fn previous(&self, source: Source) -> Result<Option<Vec<RawRecord>>, OutputError> {
        let path = self.dir.join(source.json_file());
        if !path.exists() {
            return Ok(None);
        }
        load(&path).map(Some)
    }

    /// JSON datasets in the directory that are neither a live source nor the
    /// combined file, sorted by name. Returns `(display name, path)`.
    pub fn archived(&self) -> Result<Vec<(String, PathBuf)>, OutputError> {
        let live: Vec<String> = Source::LIVE.iter().map(|s| s.json_file()).collect();
        let combined = format!("{COMBINED_STEM}.json");

        let entries = fs::read_dir(&self.dir).map_err(|source| OutputError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut archived = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| OutputError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if name == combined || live.contains(&name) {
                continue;
            }
            archived.push((stem.to_string(), entry.path()));
        }
        archived.sort();
        debug!(count = archived.len(), "found archived datasets");
        Ok(archived)
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    fn write_pair(&mut self, stem: &str, records: &[BreachRecord]) -> Result<(), OutputError> {
        write_json(&self.dir.join(format!("{stem}.json")), records)?;
        write_csv(&self.dir.join(format!("{stem}.csv")), records)?;
        self.stats.files_written += 2;
        self.stats.records_written += records.len() as u64;
        Ok(())
    }
}

/// Read a JSON dataset back as raw records.
pub fn load(path: &Path) -> Result<Vec<RawRecord>, OutputError> {
    let text = fs::read_to_string(path).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| OutputError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| OutputError::Json {
        path: path.display().to_string(),
        source,
    })?;
    write_atomic(path, &bytes)
}

fn write_csv(path: &Path, records: &[BreachRecord]) -> Result<(), OutputError> {
    let csv_err = |source| OutputError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut bytes);
        writer.write_record(WHITELIST).map_err(csv_err)?;
        for record in records {
            writer.write_record(record.csv_row()).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| OutputError::Io {
            path: path.display().to_string(),
            source,
        })?;
    }
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(io_err)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}
