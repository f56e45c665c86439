//! Full exchange dump to JSONL files
//!
//! Writes every executed case (not just failures) to per-route JSONL files
//! for post-hoc analysis of what the service actually answered.
//!
//! ```text
//! .recette/dumps/
//! ├── _search.jsonl
//! ├── _completion.jsonl
//! └── index.json
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::verdict::{CaseStatus, Exchange, Outcome};

/// One JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpLine {
    pub identifier: String,
    pub status: CaseStatus,
    #[serde(flatten)]
    pub exchange: Exchange,
}

/// Summary of a dump operation, written as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpIndex {
    /// Total exchanges dumped
    pub total: u64,
    /// Per-route file listing
    pub routes: Vec<DumpRouteEntry>,
    /// Directory where files were written
    pub dump_dir: PathBuf,
}

/// An entry in the dump index for one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRouteEntry {
    /// Route key, e.g. "/search"
    pub route: String,
    /// Filename within dump directory
    pub file: String,
    /// Number of exchanges in this file
    pub count: u64,
}

/// Write the exchanges of all outcomes to per-route JSONL files.
///
/// Outcomes without an exchange (skipped cases) are left out.
///
/// # Errors
///
/// Returns error if dump directory cannot be created or files cannot be written.
pub fn write_dump(outcomes: &[Outcome], dump_dir: &Path) -> Result<DumpIndex, DumpError> {
    std::fs::create_dir_all(dump_dir)
        .map_err(|e| DumpError::Io(format!("create {}: {e}", dump_dir.display())))?;

    // BTreeMap keeps file order deterministic
    let mut groups: BTreeMap<&str, Vec<DumpLine>> = BTreeMap::new();
    for outcome in outcomes {
        if let Some(exchange) = &outcome.exchange {
            groups.entry(&outcome.route).or_default().push(DumpLine {
                identifier: outcome.identifier.clone(),
                status: outcome.status,
                exchange: exchange.clone(),
            });
        }
    }

    let mut entries = Vec::new();
    let mut total: u64 = 0;

    for (route, lines) in groups {
        let filename = sanitize_filename(route);
        let filepath = dump_dir.join(&filename);

        let file = std::fs::File::create(&filepath)
            .map_err(|e| DumpError::Io(format!("create {}: {e}", filepath.display())))?;
        let mut writer = std::io::BufWriter::new(file);

        let count = lines.len() as u64;
        total += count;

        for line in &lines {
            let json =
                serde_json::to_string(line).map_err(|e| DumpError::Serialize(e.to_string()))?;
            writeln!(writer, "{json}")
                .map_err(|e| DumpError::Io(format!("write {}: {e}", filepath.display())))?;
        }

        writer
            .flush()
            .map_err(|e| DumpError::Io(format!("flush {}: {e}", filepath.display())))?;

        entries.push(DumpRouteEntry {
            route: route.to_string(),
            file: filename,
            count,
        });
    }

    let index = DumpIndex {
        total,
        routes: entries,
        dump_dir: dump_dir.to_path_buf(),
    };

    let index_path = dump_dir.join("index.json");
    let index_json =
        serde_json::to_string_pretty(&index).map_err(|e| DumpError::Serialize(e.to_string()))?;
    std::fs::write(&index_path, index_json)
        .map_err(|e| DumpError::Io(format!("write {}: {e}", index_path.display())))?;

    Ok(index)
}

/// Maximum characters kept from the route in the filename.
const MAX_FILENAME_LEN: usize = 200;

/// Convert a route key to a safe filename.
///
/// "/search" → "_search.jsonl", "/" → "_.jsonl"
fn sanitize_filename(route: &str) -> String {
    let sanitized: String = route
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' => c,
            _ => '_',
        })
        .collect();
    format!("{sanitized}.jsonl")
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}
