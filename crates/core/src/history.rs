//! Folders the operator has confirmed before, offered again by folder pickers.

use std::path::Path;

use log::debug;

use crate::config::expand_path;
use crate::error::{Error, Result};
use crate::file_handling::{read_yaml, write_yaml};

const FILE_DESCRIPTION: &str = "path history";

#[derive(Debug, Clone)]
pub struct PathHistory {
    path: String,
    entries: Vec<String>,
}

impl PathHistory {
    /// Opens the history file at `path`. A missing file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &str) -> Result<Self> {
        let entries = read_yaml(FILE_DESCRIPTION, path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_string(),
            entries,
        })
    }

    /// Recorded folders, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Records `directory` unless it is already known. Returns whether the
    /// history changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotADirectory`] if the path is not an existing
    /// directory, or an error if the file cannot be written.
    pub fn record(&mut self, directory: &str) -> Result<bool> {
        let directory = expand_path(directory.trim());
        if !Path::new(&directory).is_dir() {
            return Err(Error::NotADirectory(directory));
        }
        if self.entries.contains(&directory) {
            return Ok(false);
        }

        let mut entries = self.entries.clone();
        entries.push(directory);
        write_yaml(FILE_DESCRIPTION, &self.path, &entries)?;
        self.entries = entries;

        debug!("Path history now holds {} folders", self.entries.len());
        Ok(true)
    }
}
