use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Number of matching file names echoed while scanning
const ECHOED_FILE_NAMES: usize = 14;

/// Represents a text document loaded from disk
#[derive(Debug, Clone)]
pub struct Document {
    /// The actual text content of the document
    pub content: String,
    /// Path relative to the scanned root (used as document ID)
    pub document_id: String,
    /// Absolute or root-joined path of the file
    pub path: PathBuf,
    /// Last modification time of the file
    pub modified: SystemTime,
}

/// Read all `.txt` files below `directory` that were modified after `last_update`
pub fn load_txt_files<P: AsRef<Path>>(
    directory: P,
    last_update: SystemTime,
) -> Result<Vec<Document>> {
    let root = directory.as_ref();
    if !root.is_dir() {
        return Err(anyhow::anyhow!(
            "Document directory not found: {}",
            root.display()
        ));
    }

    let mut documents = Vec::new();
    let mut seen = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to walk directory {}", root.display()))?;
        if !entry.file_type().is_file() || !is_txt_file(entry.path()) {
            continue;
        }

        seen += 1;
        if seen <= ECHOED_FILE_NAMES {
            info!("{}", entry.file_name().to_string_lossy());
        }

        let modified = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .modified()
            .with_context(|| format!("No modification time for {}", entry.path().display()))?;

        if modified <= last_update {
            continue;
        }

        let content = fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read text file: {}", entry.path().display()))?;

        let document_id = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();

        documents.push(Document {
            content,
            document_id,
            path: entry.path().to_path_buf(),
            modified,
        });
    }

    debug!("Number of documents added: {}", documents.len());

    Ok(documents)
}

fn is_txt_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".txt"))
}
