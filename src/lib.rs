pub mod cleaning;
pub mod cli;
pub mod config;
pub mod data;
pub mod enrich;
pub mod error;
pub mod io_utils;
pub mod load;
pub mod pipeline;
pub mod reshape;
pub mod rules;
pub mod table;
pub mod transform;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, InputArgs},
    config::{Credentials, DataPaths},
    io_utils::{CsvOptions, resolve_encoding},
    reshape::SchemaManifest,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("crash_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args.input),
        Commands::Split(args) => handle_split(&args.data_dir, args.manifest.as_deref()),
        Commands::Load(args) => handle_load(
            &args.data_dir,
            &args.credentials,
            args.schema.as_deref(),
            args.output.as_deref(),
            args.batch_size,
        ),
        Commands::Run(args) => {
            handle_clean(&args.input)?;
            handle_split(&args.input.data_dir, args.manifest.as_deref())?;
            match &args.credentials {
                Some(credentials) => handle_load(
                    &args.input.data_dir,
                    credentials,
                    args.schema.as_deref(),
                    args.output.as_deref(),
                    args.batch_size,
                ),
                None => {
                    info!("No credentials given; skipping the load step");
                    Ok(())
                }
            }
        }
    }
}

fn handle_clean(args: &InputArgs) -> Result<()> {
    let encoding = resolve_encoding(args.input_encoding.as_deref())?;
    let options = CsvOptions {
        delimiter: args.delimiter,
        encoding,
    };
    let paths = DataPaths::new(&args.data_dir);
    info!(
        "Cleaning raw data in '{}' using delimiter '{}'",
        paths.root().display(),
        printable_delimiter(options.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER))
    );
    pipeline::clean(&paths, options)
        .with_context(|| format!("Cleaning raw data in {:?}", paths.root()))?;
    Ok(())
}

fn handle_split(data_dir: &Path, manifest: Option<&Path>) -> Result<()> {
    let paths = DataPaths::new(data_dir);
    let manifest = match manifest {
        Some(path) => SchemaManifest::load(path)?,
        None => SchemaManifest::default(),
    };
    let written = pipeline::split(&paths, &manifest)
        .with_context(|| format!("Splitting cleaned data in {:?}", paths.root()))?;
    for (stem, rows) in &written {
        info!("{stem}: {rows} row(s)");
    }
    info!(
        "Star schema with {} table(s) written to {:?}",
        written.len(),
        paths.splitted_dir()
    );
    Ok(())
}

fn handle_load(
    data_dir: &Path,
    credentials: &Path,
    schema: Option<&Path>,
    output: Option<&Path>,
    batch_size: usize,
) -> Result<()> {
    let paths = DataPaths::new(data_dir);
    let credentials = Credentials::load(credentials)?;
    let schema = match schema {
        Some(path) => Some(path.to_path_buf()),
        None => Some(paths.default_schema_script()).filter(|path| path.is_file()),
    };
    if schema.is_none() {
        info!("No schema script found; emitting inserts only");
    }
    let output = output
        .map(|path| path.to_path_buf())
        .unwrap_or_else(|| paths.default_load_script());
    pipeline::load(&paths, &credentials, schema.as_deref(), &output, batch_size)
        .with_context(|| format!("Loading star schema from {:?}", paths.splitted_dir()))?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
