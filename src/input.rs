//! Loading declared types from input files.
//!
//! `.json` files hold a serialized array of declared types; any other file
//! is scanned as annotated TypeScript source.

use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::schema::DeclaredType;
use crate::source::scan_declared_types;

/// Expand directories to their `.ts`/`.json` files and drop duplicates,
/// keeping the first occurrence of each path.
pub fn collect_input_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut seen = HashSet::new();
    let mut collected = Vec::new();

    for path in paths {
        let expanded = if path.is_dir() {
            let mut entries = fs::read_dir(path)
                .map_err(|e| format!("Failed to read directory {}: {}", path.display(), e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_input_file(p))
                .collect::<Vec<_>>();
            entries.sort();
            entries
        } else {
            vec![path.clone()]
        };

        for path in expanded {
            if seen.insert(path.clone()) {
                collected.push(path);
            }
        }
    }

    Ok(collected)
}

fn is_input_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts") | Some("json")
    )
}

/// Load the declared types of one file.
pub fn load_declared_types(path: &Path) -> Result<Vec<DeclaredType>, Box<dyn Error>> {
    info!("Reading {}", path.display());
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let declared: Vec<DeclaredType> = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid declared types in {}: {}", path.display(), e))?;
        Ok(declared)
    } else {
        Ok(scan_declared_types(&content))
    }
}

/// Load declared types from every file, in the given file order.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<DeclaredType>, Box<dyn Error>> {
    let mut declared = Vec::new();
    for path in paths {
        declared.extend(load_declared_types(path)?);
    }
    info!("Loaded {} declared types from {} files", declared.len(), paths.len());
    Ok(declared)
}
