//! Injury classification of a crash from its per-category injury counts.

use std::collections::HashMap;

use log::debug;

use crate::{
    data::{as_number, display_cell},
    error::{Result, TableError},
    table::{RowView, Table},
};

/// Count columns paired with their label, most severe first.
pub const INJURY_CATEGORIES: [(&str, &str); 5] = [
    ("INJURIES_FATAL", "FATAL"),
    ("INJURIES_INCAPACITATING", "INCAPACITATING INJURY"),
    ("INJURIES_NON_INCAPACITATING", "NON-INCAPACITATING INJURY"),
    ("INJURIES_REPORTED_NOT_EVIDENT", "REPORTED NOT EVIDENT"),
    ("INJURIES_NO_INDICATION", "NO INDICATION OF INJURY"),
];

pub const CLASSIFICATION_COLUMN: &str = "INJURY_CLASSIFICATION";

/// Label of the most severe category with a positive count.
///
/// Severity wins over magnitude: one fatality outranks any number of lesser
/// injuries. Blank or non-numeric counts read as zero, and a row with
/// nothing positive falls back to the most severe label.
pub fn classify(row: RowView<'_>) -> &'static str {
    INJURY_CATEGORIES
        .iter()
        .find(|(column, _)| as_number(row.get(column)).is_some_and(|count| count > 0.0))
        .map_or(INJURY_CATEGORIES[0].1, |(_, label)| *label)
}

/// Case identifier → injury classification, built once from the crash table.
#[derive(Debug, Default)]
pub struct InjuryIndex {
    by_case: HashMap<String, &'static str>,
}

impl InjuryIndex {
    /// Later rows with the same case identifier replace earlier ones.
    pub fn from_crashes(crashes: &Table, case_column: &str) -> Result<Self> {
        if !crashes.has_column(case_column) {
            return Err(TableError::missing(case_column));
        }
        let by_case = crashes
            .rows()
            .map(|row| (display_cell(row.get(case_column)), classify(row)))
            .collect();
        Ok(InjuryIndex { by_case })
    }

    pub fn classification(&self, case: &str) -> Option<&'static str> {
        self.by_case.get(case).copied()
    }

    pub fn len(&self) -> usize {
        self.by_case.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_case.is_empty()
    }
}

/// Writes the classification of each row's crash into `INJURY_CLASSIFICATION`,
/// adding the column when absent. Rows without a matching crash stay null.
pub fn assign_classification(
    table: &mut Table,
    index: &InjuryIndex,
    case_column: &str,
) -> Result<usize> {
    if !table.has_column(case_column) {
        return Err(TableError::missing(case_column));
    }
    table.ensure_column(CLASSIFICATION_COLUMN)?;
    let mut matched = 0usize;
    table.try_for_each_row(|mut row| {
        let case = display_cell(row.get(case_column));
        if let Some(label) = index.classification(&case) {
            row.set(CLASSIFICATION_COLUMN, Some(label.into()))?;
            matched += 1;
        }
        Ok(())
    })?;
    debug!("Classified {matched} of {} row(s) in '{}'", table.len(), table.name());
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn crashes() -> Table {
        let mut columns = vec!["RD_NO".to_string()];
        columns.extend(INJURY_CATEGORIES.iter().map(|(c, _)| c.to_string()));
        let row = |case: &str, counts: [&str; 5]| {
            let mut cells = vec![Some(Value::from(case))];
            cells.extend(counts.iter().map(|c| Some(Value::from(*c))));
            cells
        };
        Table::from_rows(
            "crashes",
            columns,
            vec![
                row("A", ["1", "2", "0", "0", "0"]),
                row("B", ["0", "0", "3", "1", "4"]),
                row("C", ["", "", "", "", ""]),
                row("A", ["0", "0", "0", "0", "1"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn severity_outranks_magnitude() {
        let table = crashes();
        assert_eq!(classify(table.row(0).unwrap()), "FATAL");
        assert_eq!(classify(table.row(1).unwrap()), "NON-INCAPACITATING INJURY");
        assert_eq!(classify(table.row(2).unwrap()), "FATAL");
    }

    #[test]
    fn index_keeps_last_row_per_case() {
        let index = InjuryIndex::from_crashes(&crashes(), "RD_NO").unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.classification("A"), Some("NO INDICATION OF INJURY"));
        assert_eq!(index.classification("Z"), None);
    }

    #[test]
    fn assign_classification_adds_column() {
        let index = InjuryIndex::from_crashes(&crashes(), "RD_NO").unwrap();
        let mut people = Table::from_rows(
            "people",
            vec!["RD_NO".into()],
            vec![vec![Some("B".into())], vec![Some("Q".into())]],
        )
        .unwrap();
        let matched = assign_classification(&mut people, &index, "RD_NO").unwrap();
        assert_eq!(matched, 1);
        assert_eq!(
            people.value(0, CLASSIFICATION_COLUMN),
            Some(&Value::from("NON-INCAPACITATING INJURY"))
        );
        assert_eq!(people.value(1, CLASSIFICATION_COLUMN), None);
    }
}
