//! Inspection of Jupyter notebook cells by execution count.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Execution counts reported when none are requested explicitly
pub const DEFAULT_EXEC_COUNTS: [i64; 5] = [39, 40, 41, 42, 43];

const PREVIEW_CHARS: usize = 100;

#[derive(Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    cell_type: Option<String>,
    execution_count: Option<i64>,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows the source either as one string or as a list of lines
#[derive(Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }
}

/// A cell whose execution count was asked for
#[derive(Debug, Clone, PartialEq)]
pub struct CellSummary {
    pub index: usize,
    pub execution_count: i64,
    pub cell_type: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotebookReport {
    pub total_cells: usize,
    pub matches: Vec<CellSummary>,
}

impl fmt::Display for NotebookReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cells: {}", self.total_cells)?;
        for cell in &self.matches {
            writeln!(
                f,
                "Cell index {}: exec_count={}, type={}",
                cell.index, cell.execution_count, cell.cell_type
            )?;
            writeln!(f, "  Preview: {}...", cell.preview)?;
        }
        Ok(())
    }
}

/// Read a notebook and summarize the cells with the given execution counts
pub fn inspect<P: AsRef<Path>>(path: P, exec_counts: &[i64]) -> Result<NotebookReport> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notebook {}", path.display()))?;
    let notebook: Notebook = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse notebook {}", path.display()))?;

    let matches = notebook
        .cells
        .iter()
        .enumerate()
        .filter_map(|(index, cell)| {
            let execution_count = cell.execution_count?;
            if !exec_counts.contains(&execution_count) {
                return None;
            }

            Some(CellSummary {
                index,
                execution_count,
                cell_type: cell
                    .cell_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                preview: preview(&cell.source.joined()),
            })
        })
        .collect();

    Ok(NotebookReport {
        total_cells: notebook.cells.len(),
        matches,
    })
}

fn preview(source: &str) -> String {
    source
        .chars()
        .take(PREVIEW_CHARS)
        .collect::<String>()
        .replace('\n', " ")
}
