//! Append-only skip-list of items already downloaded.
//!
//! One `"<provider> <source_id>"` entry per line. The file is read in full
//! when opened and appended to after every confirmed download; it is never
//! rewritten. Blank or malformed lines are ignored and duplicates are
//! harmless. A single writer per file is assumed; there is no file locking.

use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors produced by the archive store.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive exists but could not be read.
    #[error("failed to read archive {path}: {source}")]
    Read {
        /// Archive file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be appended.
    #[error("failed to append to archive {path}: {source}")]
    Write {
        /// Archive file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Deduplication key for a downloaded item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    /// Lowercase provider name, e.g. `youtube`.
    pub provider: String,
    /// Provider-unique item id.
    pub source_id: String,
}

impl ArchiveEntry {
    /// Creates an entry. The provider is lowercased.
    #[must_use]
    pub fn new(provider: &str, source_id: &str) -> Self {
        Self {
            provider: provider.to_ascii_lowercase(),
            source_id: source_id.to_string(),
        }
    }

    /// Parses one archive line. Returns `None` for blank or malformed lines.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let provider = parts.next()?;
        let source_id = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(provider, source_id))
    }

    /// Formats the entry as an archive line (without newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{} {}", self.provider, self.source_id)
    }
}

/// In-memory view of an archive file plus its path for appends.
#[derive(Debug)]
pub struct ArchiveStore {
    path: PathBuf,
    entries: HashSet<ArchiveEntry>,
}

impl ArchiveStore {
    /// Loads the archive at `path`. A missing file is an empty archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Read`] if the file exists but cannot be read.
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let entries: HashSet<ArchiveEntry> = match fs::read_to_string(path) {
            Ok(content) => content.lines().filter_map(ArchiveEntry::parse_line).collect(),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No archive yet, starting empty");
                HashSet::new()
            }
            Err(source) => {
                return Err(ArchiveError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        debug!(entries = entries.len(), "Archive loaded");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Archive file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct entries known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the item was recorded by this or an earlier run.
    #[must_use]
    pub fn contains(&self, provider: &str, source_id: &str) -> bool {
        self.entries.contains(&ArchiveEntry::new(provider, source_id))
    }

    /// Appends an entry to the file, then records it in memory.
    ///
    /// The write completes before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Write`] if the file cannot be opened or written;
    /// the in-memory view is left unchanged in that case.
    pub fn append(&mut self, provider: &str, source_id: &str) -> Result<(), ArchiveError> {
        let entry = ArchiveEntry::new(provider, source_id);
        let write_err = |source| ArchiveError::Write {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        let prefix = if ends_mid_line(&mut file).map_err(write_err)? {
            "\n"
        } else {
            ""
        };
        writeln!(file, "{prefix}{}", entry.to_line()).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        debug!(path = %self.path.display(), entry = %entry.to_line(), "Archive entry appended");
        self.entries.insert(entry);
        Ok(())
    }
}

// True when the file is non-empty and its last byte is not a newline, e.g.
// after a hand edit or a write cut short by a crash.
fn ends_mid_line(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
