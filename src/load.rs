//! Bulk loading of star-schema tables into a relational store.
//!
//! The datastore transport is not part of this crate. [`BulkSink`] is the seam
//! a connection-backed loader implements; [`SqlScriptSink`] renders the same
//! batched `INSERT` statements into a SQL script instead.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    config::Credentials,
    data::Value,
    error::TableError,
    table::Table,
};

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Star-schema tables in load order; the fact table goes last.
pub const LOAD_ORDER: [&str; 7] = [
    "crash", "date", "location", "injury", "person", "vehicle", "damage",
];

pub trait BulkSink {
    /// Runs a multi-statement SQL script, such as the schema DDL.
    fn execute_script(&mut self, script: &str) -> Result<()>;

    /// Inserts one batch of rows into `target`.
    fn insert_batch(&mut self, target: &str, columns: &[String], rows: &[Vec<String>])
    -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Inserts every row of `table` into `target` in batches of `batch_size`.
/// Returns the number of batches written.
pub fn load_table(
    sink: &mut dyn BulkSink,
    table: &Table,
    target: &str,
    batch_size: usize,
) -> Result<usize> {
    if table.is_empty() || table.columns().is_empty() {
        return Err(TableError::EmptyTable {
            table: table.name().to_string(),
        }
        .into());
    }
    let batch_size = batch_size.max(1);
    let mut batches = 0usize;
    for chunk in &table.rows().chunks(batch_size) {
        let rows = chunk
            .map(|row| row.cells().iter().map(|cell| sql_literal(cell.as_ref())).collect())
            .collect::<Vec<Vec<String>>>();
        sink.insert_batch(target, table.columns(), &rows)
            .with_context(|| format!("Inserting batch {} into '{target}'", batches + 1))?;
        batches += 1;
    }
    debug!("Inserted {} row(s) into '{target}' in {batches} batch(es)", table.len());
    Ok(batches)
}

/// SQL literal for a cell: `NULL`, bare numbers, or single-quoted text.
/// Text that reads as a number is emitted bare.
pub fn sql_literal(cell: Option<&Value>) -> String {
    match cell {
        None => "NULL".to_string(),
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Float(f)) if f.is_finite() => cell.map(Value::as_display).unwrap_or_default(),
        Some(Value::Float(_)) => "NULL".to_string(),
        Some(Value::String(s)) if s.is_empty() => "NULL".to_string(),
        Some(Value::String(s)) if is_plain_number(s) => s.clone(),
        Some(Value::String(s)) => format!("'{}'", s.replace('\'', "''")),
    }
}

fn is_plain_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty()
        && !digits.starts_with('.')
        && !digits.ends_with('.')
        && digits.chars().filter(|c| *c == '.').count() <= 1
        && digits.chars().all(|c| c == '.' || c.is_ascii_digit())
        && !(digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0."))
}

/// Writes batched `INSERT` statements to a SQL script.
pub struct SqlScriptSink<W: Write> {
    writer: W,
    statements: usize,
}

impl SqlScriptSink<BufWriter<File>> {
    /// Creates the script at `path` with a header naming the target database.
    pub fn create(path: &Path, credentials: &Credentials) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating directory {parent:?}"))?;
        }
        let file = File::create(path).with_context(|| format!("Creating SQL script {path:?}"))?;
        let mut sink = SqlScriptSink::new(BufWriter::new(file));
        writeln!(
            sink.writer,
            "-- target: {} on {} as {}",
            credentials.db, credentials.server, credentials.user
        )?;
        writeln!(sink.writer, "USE {};", credentials.db)?;
        Ok(sink)
    }
}

impl<W: Write> SqlScriptSink<W> {
    pub fn new(writer: W) -> Self {
        SqlScriptSink {
            writer,
            statements: 0,
        }
    }

    pub fn statements(&self) -> usize {
        self.statements
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BulkSink for SqlScriptSink<W> {
    fn execute_script(&mut self, script: &str) -> Result<()> {
        let script = script.trim();
        if script.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "{script}")?;
        if !script.ends_with(';') {
            writeln!(self.writer, ";")?;
        }
        debug!("Copied {} byte(s) of schema SQL into the script", script.len());
        Ok(())
    }

    fn insert_batch(
        &mut self,
        target: &str,
        columns: &[String],
        rows: &[Vec<String>],
    ) -> Result<()> {
        writeln!(
            self.writer,
            "INSERT INTO {target} ({}) VALUES",
            columns.iter().join(", ")
        )?;
        for (idx, row) in rows.iter().enumerate() {
            let terminator = if idx + 1 == rows.len() { ";" } else { "," };
            writeln!(self.writer, "  ({}){terminator}", row.iter().join(", "))?;
        }
        self.statements += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Flushing SQL script")?;
        info!("SQL script complete with {} INSERT statement(s)", self.statements);
        Ok(())
    }
}
