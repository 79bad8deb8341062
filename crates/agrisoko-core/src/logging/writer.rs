//! Append-only JSONL writer, one file per instance per day.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::LogEntry;

pub struct InstanceLogWriter {
    instance: String,
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl InstanceLogWriter {
    /// Open (or create) `<logs_dir>/raw/<date>_<instance>.jsonl` for appending.
    pub fn open(logs_dir: impl AsRef<Path>, instance: impl Into<String>) -> io::Result<Self> {
        let instance = instance.into();
        let raw_dir = logs_dir.as_ref().join("raw");
        fs::create_dir_all(&raw_dir)?;

        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = raw_dir.join(format!("{}_{}.jsonl", date, instance));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            instance,
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush, so a crash loses at most the current line.
    pub fn append(&self, entry: &LogEntry) -> io::Result<()> {
        let line = entry
            .to_line()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut file = self.file.lock();
        writeln!(file, "{}", line)?;
        file.flush()
    }
}

impl Drop for InstanceLogWriter {
    fn drop(&mut self) {
        let _ = self.file.get_mut().flush();
    }
}

/// Read every entry under `<logs_dir>/raw`, optionally only one instance's,
/// sorted by timestamp. Unparseable lines are skipped.
pub fn read_entries(logs_dir: impl AsRef<Path>, instance: Option<&str>) -> io::Result<Vec<LogEntry>> {
    let raw_dir = logs_dir.as_ref().join("raw");
    if !raw_dir.exists() {
        return Ok(Vec::new());
    }

    let suffix = instance.map(|i| format!("_{}.jsonl", i));
    let mut entries = Vec::new();
    for dir_entry in fs::read_dir(&raw_dir)? {
        let path = dir_entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let wanted = match &suffix {
            Some(suffix) => name.ends_with(suffix.as_str()),
            None => name.ends_with(".jsonl"),
        };
        if !wanted {
            continue;
        }

        let content = fs::read_to_string(&path)?;
        entries.extend(
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| LogEntry::from_line(line).ok()),
        );
    }

    entries.sort_by(|a, b| a.ts.cmp(&b.ts));
    Ok(entries)
}
