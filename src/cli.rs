use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::load::DEFAULT_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean crash records and split them into a star schema",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean and enrich the raw crash, person, and vehicle files
    Clean(CleanArgs),
    /// Split the cleaned files into star-schema tables
    Split(SplitArgs),
    /// Render the star-schema tables as batched INSERT statements
    Load(LoadArgs),
    /// Clean, split, and optionally load in one pass
    Run(RunArgs),
}

/// Options for commands that read the raw CSV input. Files the pipeline
/// writes itself are always comma-delimited UTF-8.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Data directory holding raw/, external/, cleaned/, and splitted/
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Data directory holding cleaned/ and splitted/
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: PathBuf,
    /// YAML manifest overriding the built-in star-schema tables
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Data directory holding splitted/ and sql/
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: PathBuf,
    /// JSON file with server, db, user, and pwd keys
    #[arg(short, long)]
    pub credentials: PathBuf,
    /// SQL DDL emitted before the inserts (defaults to <data-dir>/sql/schema.sql when present)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// Destination SQL script (defaults to <data-dir>/sql/load.sql)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Rows per INSERT statement
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// YAML manifest overriding the built-in star-schema tables
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
    /// Load the split tables using these credentials when provided
    #[arg(short, long)]
    pub credentials: Option<PathBuf>,
    /// SQL DDL emitted before the inserts of the load step
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// Destination SQL script for the load step
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Rows per INSERT statement
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn run_accepts_optional_credentials() {
        let cli = Cli::try_parse_from(["crash-etl", "run", "--data-dir", "data"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.credentials.is_none());
                assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn split_and_load_take_only_the_data_directory() {
        assert!(
            Cli::try_parse_from(["crash-etl", "split", "-d", "data", "--delimiter", ";"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "crash-etl", "load", "-d", "data", "-c", "db.json", "--schema", "ddl.sql",
        ])
        .unwrap();
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.schema, Some(PathBuf::from("ddl.sql")));
                assert_eq!(args.data_dir, PathBuf::from("data"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
