//! Mean and median over the numeric values of a column. Imputation itself
//! goes through [`Fill::CentralTendency`](crate::rules::Fill::CentralTendency).

use crate::{
    data::as_number,
    error::{Result, TableError},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralTendency {
    Mean,
    Median,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, or the average of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Numeric values of `column`, skipping nulls and anything that does not parse.
pub fn numeric_values(table: &Table, column: &str) -> Result<Vec<f64>> {
    Ok(table.column_values(column)?.filter_map(as_number).collect())
}

pub fn central_tendency(table: &Table, column: &str, method: CentralTendency) -> Result<f64> {
    let values = numeric_values(table, column)?;
    let computed = match method {
        CentralTendency::Mean => mean(&values),
        CentralTendency::Median => median(&values),
    };
    computed.ok_or_else(|| TableError::NoNumericValues {
        column: column.to_string(),
    })
}
