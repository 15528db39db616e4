use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const STAMP_FILE: &str = "index.stamp";

/// Marker file recording when the vector store was last rebuilt
#[derive(Debug, Clone)]
pub struct IndexStamp {
    path: PathBuf,
}

impl IndexStamp {
    pub fn new<P: AsRef<Path>>(state_dir: P) -> Self {
        IndexStamp {
            path: state_dir.as_ref().join(STAMP_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the stamp, if it exists
    pub fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    /// Cutoff used when selecting files to (re)index.
    ///
    /// Always `UNIX_EPOCH` for now, so every file counts as new and the
    /// collection is rebuilt in full.
    pub fn last_update(&self) -> SystemTime {
        let last_modified = self.last_modified().unwrap_or(UNIX_EPOCH);
        let date: DateTime<Local> = last_modified.into();
        debug!("Last Modified Date: {}", date.format("%Y-%m-%d %H:%M:%S"));

        // TODO: return `last_modified` once ingest deletes the points of changed files
        UNIX_EPOCH
    }

    /// Record a successful rebuild
    pub fn touch(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {}", parent.display()))?;
        }

        let now: DateTime<Local> = SystemTime::now().into();
        fs::write(&self.path, now.to_rfc3339())
            .with_context(|| format!("Failed to write index stamp {}", self.path.display()))?;

        Ok(())
    }
}
