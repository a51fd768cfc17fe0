//! In-memory table: an ordered column list plus insertion-ordered rows.
//!
//! Rows are stored positionally, one [`Cell`] per column, so every row always
//! carries exactly the current schema. All operations mutate in place and
//! preserve row order; failures leave earlier mutations in place.

use std::{borrow::Cow, collections::HashSet};

use crate::{
    data::{Cell, NumericType, Value, cast_value, is_blank},
    error::{Result, TableError},
};

/// Replacement applied by [`Table::replace_column_values`].
pub enum Replacement<'a> {
    /// Write this value into every matching cell.
    Value(Cell),
    /// Compute the new value from the current one.
    With(Box<dyn Fn(Option<&Value>) -> Cell + 'a>),
}

impl<'a> Replacement<'a> {
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Cell + 'a,
    {
        Replacement::With(Box::new(f))
    }

    fn produce(&self, current: Option<&Value>) -> Cell {
        match self {
            Replacement::Value(value) => value.clone(),
            Replacement::With(f) => f(current),
        }
    }
}

impl From<Value> for Replacement<'_> {
    fn from(value: Value) -> Self {
        Replacement::Value(Some(value))
    }
}

/// Read-only view of a single row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> RowView<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        position(self.columns, column).and_then(|idx| self.cells[idx].as_ref())
    }

    pub fn get_str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }
}

/// Mutable view of a single row handed out by [`Table::try_for_each_row`].
pub struct RowMut<'a> {
    columns: &'a [String],
    cells: &'a mut [Cell],
}

impl RowMut<'_> {
    pub fn get(&self, column: &str) -> Option<&Value> {
        position(self.columns, column).and_then(|idx| self.cells[idx].as_ref())
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn is_blank(&self, column: &str) -> bool {
        is_blank(self.get(column))
    }

    pub fn set(&mut self, column: &str, cell: Cell) -> Result<()> {
        let idx = position(self.columns, column).ok_or_else(|| TableError::missing(column))?;
        self.cells[idx] = cell;
        Ok(())
    }

    /// Rewrites a text cell through `f`. Non-text and null cells are left untouched.
    pub fn map_text<F>(&mut self, column: &str, f: F) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        let idx = position(self.columns, column).ok_or_else(|| TableError::missing(column))?;
        if let Some(Value::String(text)) = &mut self.cells[idx] {
            *text = f(text.as_str());
        }
        Ok(())
    }

    /// Rewrites every text cell in the row through `f`.
    pub fn map_all_text<F>(&mut self, mut f: F)
    where
        F: for<'s> FnMut(&'s str) -> Cow<'s, str>,
    {
        for cell in self.cells.iter_mut() {
            if let Some(Value::String(text)) = cell {
                let updated = match f(text.as_str()) {
                    Cow::Owned(value) => Some(value),
                    Cow::Borrowed(value) if value != text.as_str() => Some(value.to_string()),
                    Cow::Borrowed(_) => None,
                };
                if let Some(value) = updated {
                    *text = value;
                }
            }
        }
    }
}

fn position(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c == name)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given schema.
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: Vec<S>) -> Self {
        Table {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from a schema and positional rows, checking that every
    /// row matches the schema width and that column names are unique.
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::duplicate(column.clone()));
            }
        }
        let mut table = Table {
            name: name.into(),
            columns,
            rows: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        position(&self.columns, name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::missing(name))
    }

    fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name.as_ref()) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(TableError::MissingColumn { columns: missing })
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowShape {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|cells| RowView {
            columns: &self.columns,
            cells,
        })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells[idx].as_ref())
    }

    /// Values of one column in row order.
    pub fn column_values(&self, column: &str) -> Result<impl Iterator<Item = Option<&Value>>> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(move |cells| cells[idx].as_ref()))
    }

    /// Replaces every value in `column` for which `predicate` holds.
    /// Returns the number of replaced cells.
    pub fn replace_column_values<P>(
        &mut self,
        column: &str,
        predicate: P,
        replacement: Replacement<'_>,
    ) -> Result<usize>
    where
        P: Fn(Option<&Value>) -> bool,
    {
        let idx = self.require_column(column)?;
        let mut replaced = 0usize;
        for row in &mut self.rows {
            if predicate(row[idx].as_ref()) {
                row[idx] = replacement.produce(row[idx].as_ref());
                replaced += 1;
            }
        }
        Ok(replaced)
    }

    /// Appends a column holding `default` in every row.
    pub fn add_column(&mut self, name: &str, default: Cell) -> Result<()> {
        self.add_column_with(name, |_, _| default.clone())
    }

    /// Appends a column whose values come from `generator(row, row_index)`.
    /// The generator sees each row as it was before the column existed.
    pub fn add_column_with<F>(&mut self, name: &str, mut generator: F) -> Result<()>
    where
        F: FnMut(RowView<'_>, usize) -> Cell,
    {
        if self.has_column(name) {
            return Err(TableError::duplicate(name));
        }
        let values = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, cells)| {
                generator(
                    RowView {
                        columns: &self.columns,
                        cells,
                    },
                    idx,
                )
            })
            .collect::<Vec<_>>();
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Adds `name` as a null column unless it already exists.
    pub fn ensure_column(&mut self, name: &str) -> Result<()> {
        if self.has_column(name) {
            return Ok(());
        }
        self.add_column(name, None)
    }

    pub fn remove_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let mut indices = self.require_columns(names)?;
        indices.sort_unstable();
        indices.dedup();
        for idx in indices.into_iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self.require_column(old)?;
        if self.has_column(new) {
            return Err(TableError::duplicate(new));
        }
        self.columns[idx] = new.to_string();
        Ok(())
    }

    /// Casts every value in `column` to `target`; empty values become null.
    pub fn cast_column(&mut self, column: &str, target: NumericType) -> Result<()> {
        let idx = self.require_column(column)?;
        for row in &mut self.rows {
            row[idx] = cast_value(column, row[idx].as_ref(), target)?;
        }
        Ok(())
    }

    /// Restricts the schema to exactly `keep`, in that order.
    pub fn update_columns<S: AsRef<str>>(&mut self, keep: &[S]) -> Result<()> {
        let indices = self.require_columns(keep)?;
        let mut seen = HashSet::with_capacity(keep.len());
        for name in keep {
            if !seen.insert(name.as_ref()) {
                return Err(TableError::duplicate(name.as_ref()));
            }
        }
        for row in &mut self.rows {
            let mut old = std::mem::take(row);
            *row = indices.iter().map(|idx| old[*idx].take()).collect();
        }
        self.columns = keep.iter().map(|name| name.as_ref().to_string()).collect();
        Ok(())
    }

    /// Drops every row whose value in `column` matches `predicate`.
    /// Returns the number of dropped rows.
    pub fn filter_rows<P>(&mut self, column: &str, predicate: P) -> Result<usize>
    where
        P: Fn(Option<&Value>) -> bool,
    {
        let idx = self.require_column(column)?;
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row[idx].as_ref()));
        Ok(before - self.rows.len())
    }

    /// Drops rows with an empty or missing value in `column`.
    pub fn filter_blank_rows(&mut self, column: &str) -> Result<usize> {
        self.filter_rows(column, is_blank)
    }

    /// Runs `f` over every row in order, stopping at the first error.
    pub fn try_for_each_row<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(RowMut<'_>) -> Result<()>,
    {
        for cells in self.rows.iter_mut() {
            f(RowMut {
                columns: &self.columns,
                cells,
            })?;
        }
        Ok(())
    }

    /// Independent deep copy of schema and rows.
    pub fn copy(&self) -> Table {
        self.clone()
    }
}
