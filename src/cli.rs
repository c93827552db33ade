//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Generate PostgreSQL CREATE TABLE statements from annotated type declarations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
Examples:
  ts2psql models/user.ts models/order.ts       # Print DDL for two files
  ts2psql models/ -o sql/schema.sql            # All .ts/.json files in a directory
  ts2psql                                      # Inputs from ./ts2psqlconfig.json")]
pub struct Args {
    /// Input files or directories (.ts source or .json declared types)
    pub files: Vec<PathBuf>,

    /// Path to the JSON config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Write the DDL to this file instead of stdout
    #[arg(short, long)]
    pub out_file: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_defaults() {
        let args = Args::try_parse_from(["ts2psql"]).unwrap();
        assert!(args.files.is_empty());
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(args.out_file, None);
        assert!(!args.verbose);
    }

    #[rstest]
    #[case(&["ts2psql", "-c", "custom.json"], "custom.json")]
    #[case(&["ts2psql", "--config", "other.json"], "other.json")]
    fn test_config_option(#[case] argv: &[&str], #[case] expected: &str) {
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.config, PathBuf::from(expected));
    }

    #[rstest]
    fn test_files_and_out_file() {
        let args = Args::try_parse_from(["ts2psql", "a.ts", "b.json", "--out-file", "schema.sql"]).unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.ts"), PathBuf::from("b.json")]);
        assert_eq!(args.out_file, Some(PathBuf::from("schema.sql")));
    }
}
