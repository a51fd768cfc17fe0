//! Error taxonomy for table operations, cleaning rules, and enrichment.

use itertools::Itertools;
use thiserror::Error;

/// Errors raised by [`Table`](crate::table::Table) operations and the
/// enrichment passes that run on top of them.
///
/// Every variant is fatal to the enclosing pipeline stage; nothing in the
/// crate catches and retries these internally.
#[derive(Debug, Error)]
pub enum TableError {
    /// One or more referenced columns are absent from the schema.
    #[error("the following columns are not present: {}", .columns.iter().join(", "))]
    MissingColumn { columns: Vec<String> },

    /// A column was added or renamed onto an existing name.
    #[error("the column '{column}' is already present")]
    DuplicateColumn { column: String },

    /// A row did not carry exactly one cell per column.
    #[error("row {row} has {found} value(s) but the schema has {expected} column(s)")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A value could not be converted to the requested numeric type.
    #[error("error converting '{column}' column: value '{value}' invalid")]
    Cast { column: String, value: String },

    /// Latitude or longitude was not numeric when a geohash was requested.
    #[error("invalid latitude or longitude value ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: String, longitude: String },

    /// A datetime string did not match the expected format.
    #[error("failed to parse '{value}' as datetime with format '{format}'")]
    DateTimeParse { value: String, format: String },

    /// A beat geometry could not be parsed or has no centroid.
    #[error("invalid geometry for beat '{beat}': {message}")]
    Geometry { beat: String, message: String },

    /// Central tendency requested over a column with no numeric values.
    #[error("no valid numeric value in column '{column}'")]
    NoNumericValues { column: String },

    /// A table with no rows was handed to an operation that needs data.
    #[error("no data available in table '{table}'")]
    EmptyTable { table: String },
}

impl TableError {
    pub fn missing(column: impl Into<String>) -> Self {
        TableError::MissingColumn {
            columns: vec![column.into()],
        }
    }

    pub fn duplicate(column: impl Into<String>) -> Self {
        TableError::DuplicateColumn {
            column: column.into(),
        }
    }
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_every_name() {
        let err = TableError::MissingColumn {
            columns: vec!["AGE".into(), "SEX".into()],
        };
        assert_eq!(
            err.to_string(),
            "the following columns are not present: AGE, SEX"
        );
    }

    #[test]
    fn cast_error_names_column_and_value() {
        let err = TableError::Cast {
            column: "AGE".into(),
            value: "forty".into(),
        };
        assert!(err.to_string().contains("'AGE'"));
        assert!(err.to_string().contains("'forty'"));
    }
}
