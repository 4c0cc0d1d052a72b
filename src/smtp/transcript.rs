//! Optional on-disk transcript of a session

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends every command line received and every reply sent to a file
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    /// Create a transcript writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the transcript file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a line received from the client
    pub fn received(&self, line: &str) -> io::Result<()> {
        self.append(line)
    }

    /// Record a reply sent to the client
    pub fn replied(&self, reply: &str) -> io::Result<()> {
        self.append(&format!("REPLY:{reply}"))
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        // A new transcript starts with a lone '#' marker
        if !self.path.exists() {
            std::fs::write(&self.path, "#")?;
        }

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", entry.trim())
    }
}
