//! Configuration file handling.
//!
//! This module provides loading and parsing of `ts2psqlconfig.json`
//! configuration files and merging them with command-line arguments.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Args;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./ts2psqlconfig.json";

/// Top-level configuration file structure.
///
/// ```json
/// {
///   "include": ["./src/models"],
///   "outFile": "./sql/schema.sql",
///   "verbose": true
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    /// Input files or directories
    pub include: Vec<PathBuf>,

    /// Single input file; takes precedence over `include`
    pub file: Option<PathBuf>,

    /// Output file; stdout when absent
    pub out_file: Option<PathBuf>,

    pub verbose: bool,
}

impl ConfigFile {
    /// Load configuration from `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Option<Self>, Box<dyn Error>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))?;

        Ok(Some(config))
    }

    /// Input paths named by the config: `file` if set, else `include`.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        match &self.file {
            Some(file) => vec![file.clone()],
            None => self.include.clone(),
        }
    }
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub inputs: Vec<PathBuf>,
    pub out_file: Option<PathBuf>,
    pub verbose: bool,
}

impl Settings {
    /// Merge command-line arguments over the config file.
    pub fn resolve(args: &Args, config: Option<ConfigFile>) -> Result<Self, Box<dyn Error>> {
        let config = config.unwrap_or_default();

        let inputs = if args.files.is_empty() {
            config.input_paths()
        } else {
            args.files.clone()
        };
        if inputs.is_empty() {
            return Err(format!(
                "No input files. Pass files on the command line or create {} with \
                 an \"include\" or \"file\" entry, e.g.\n\
                 {{\n  \"include\": [\"./src/models\"],\n  \"outFile\": \"./schema.sql\"\n}}",
                args.config.display()
            )
            .into());
        }

        Ok(Settings {
            inputs,
            out_file: args.out_file.clone().or(config.out_file),
            verbose: args.verbose || config.verbose,
        })
    }
}
