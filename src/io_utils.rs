//! CSV load/store for [`Table`] plus delimiter and encoding resolution.
//!
//! Every file the pipeline touches flows through this module:
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, with a
//!   manual override.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//!   Output is always UTF-8.
//! - **Load**: the header row becomes the schema; every field is loaded as a
//!   text cell (empty fields stay empty strings).
//! - **Store**: header followed by rows in current order, minimal quoting.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{Value, display_cell},
    error::TableError,
    table::Table,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Options shared by every load in a run.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(reader: &mut csv::Reader<R>, encoding: &'static Encoding) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    let mut decoded = decode_record(&headers, encoding)?;
    // A UTF-8 byte order mark would otherwise stick to the first column name.
    if let Some(first) = decoded.first_mut()
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        *first = stripped.to_string();
    }
    Ok(decoded)
}

/// Reads a whole CSV file into a table named `name`.
pub fn read_table(path: &Path, name: &str, options: CsvOptions) -> Result<Table> {
    let delimiter = resolve_delimiter(path, options.delimiter);
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let headers = reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
        let decoded = decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {} in {path:?}", row_idx + 2))?;
        rows.push(decoded.into_iter().map(|v| Some(Value::String(v))).collect());
    }
    let table = Table::from_rows(name, headers, rows)
        .with_context(|| format!("Building table from {path:?}"))?;
    debug!(
        "Loaded {} row(s) x {} column(s) from {path:?}",
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

/// Writes `table` to `path`, creating parent directories as needed.
/// Empty tables are rejected.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if table.is_empty() {
        return Err(TableError::EmptyTable {
            table: table.name().to_string(),
        }
        .into());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(resolve_delimiter(path, None))
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(BufWriter::new(file));
    writer
        .write_record(table.columns())
        .with_context(|| format!("Writing headers to {path:?}"))?;
    for (row_idx, row) in table.rows().enumerate() {
        writer
            .write_record(row.cells().iter().map(|cell| display_cell(cell.as_ref())))
            .with_context(|| format!("Writing row {} to {path:?}", row_idx + 2))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing output file {path:?}"))?;
    debug!("Wrote {} row(s) to {path:?}", table.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn resolve_delimiter_prefers_override() {
        assert_eq!(resolve_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn read_table_strips_bom_and_keeps_empty_fields() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "\u{feff}RD_NO,CITY\nJA1,\nJA2,CHICAGO\n").unwrap();
        let table = read_table(file.path(), "people", CsvOptions::default()).unwrap();
        assert_eq!(table.columns(), &["RD_NO".to_string(), "CITY".to_string()]);
        assert_eq!(table.value(0, "CITY"), Some(&Value::from("")));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn write_table_rejects_empty_tables() {
        let table = Table::new("empty", vec!["A"]);
        let file = NamedTempFile::new().expect("temp file");
        let err = write_table(&table, file.path()).unwrap_err();
        assert!(err.to_string().contains("no data available"));
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(resolve_encoding(Some("latin1")).is_ok());
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
