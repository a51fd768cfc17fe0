//! Key-based joins and the split of cleaned tables into the star schema.
//!
//! The [`SchemaManifest`] names each output table, the cleaned table it is
//! projected from, and its ordered column list. The built-in manifest can be
//! replaced by a YAML file of the form:
//!
//! ```yaml
//! tables:
//!   - name: CRASH
//!     source: crashes
//!     columns: [CRASH_ID, RD_NO]
//! ```
//!
//! The `damage` source is not a single table: it is the inner join
//! `vehicles ⋈ (crashes ⋈ people)` on the case identifier.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result as AnyResult, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cleaning::CASE_COLUMN,
    data::{Cell, display_cell},
    error::{Result, TableError},
    table::Table,
};

/// Cleaned table an output table is projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestSource {
    Crashes,
    People,
    Vehicles,
    Damage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTable {
    pub name: String,
    pub source: ManifestSource,
    pub columns: Vec<String>,
}

impl ManifestTable {
    fn new(name: &str, source: ManifestSource, columns: &[&str]) -> Self {
        ManifestTable {
            name: name.to_string(),
            source,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Output file stem, e.g. `damage` for `DAMAGE`.
    pub fn file_stem(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub tables: Vec<ManifestTable>,
}

impl Default for SchemaManifest {
    fn default() -> Self {
        use ManifestSource::*;
        SchemaManifest {
            tables: vec![
                ManifestTable::new(
                    "CRASH",
                    Crashes,
                    &[
                        "CRASH_ID",
                        "RD_NO",
                        "CRASH_DATE",
                        "POSTED_SPEED_LIMIT",
                        "TRAFFIC_CONTROL_DEVICE",
                        "DEVICE_CONDITION",
                        "WEATHER_CONDITION",
                        "LIGHTING_CONDITION",
                        "FIRST_CRASH_TYPE",
                        "TRAFFICWAY_TYPE",
                        "ALIGNMENT",
                        "ROADWAY_SURFACE_COND",
                        "ROAD_DEFECT",
                        "REPORT_TYPE",
                        "CRASH_TYPE",
                        "PRIM_CONTRIBUTORY_CAUSE",
                        "SEC_CONTRIBUTORY_CAUSE",
                    ],
                ),
                ManifestTable::new(
                    "DATE",
                    Crashes,
                    &[
                        "DATE_ID",
                        "CRASH_TIME",
                        "CRASH_PERIOD",
                        "CRASH_DAY",
                        "CRASH_MONTH",
                        "CRASH_YEAR",
                        "CRASH_DAY_OF_WEEK",
                        "CRASH_SEASON",
                        "DATE_POLICE_NOTIFIED",
                    ],
                ),
                ManifestTable::new(
                    "LOCATION",
                    Crashes,
                    &[
                        "LOCATION_ID",
                        "STREET_NO",
                        "STREET_DIRECTION",
                        "STREET_NAME",
                        "BEAT_OF_OCCURRENCE",
                        "LATITUDE",
                        "LONGITUDE",
                        "LOCATION_POINT",
                    ],
                ),
                ManifestTable::new(
                    "INJURY",
                    Crashes,
                    &[
                        "INJURY_ID",
                        "MOST_SEVERE_INJURY",
                        "INJURIES_TOTAL",
                        "INJURIES_FATAL",
                        "INJURIES_INCAPACITATING",
                        "INJURIES_NON_INCAPACITATING",
                        "INJURIES_REPORTED_NOT_EVIDENT",
                        "INJURIES_NO_INDICATION",
                    ],
                ),
                ManifestTable::new(
                    "PERSON",
                    People,
                    &[
                        "PERSON_ID",
                        "PERSON_TYPE",
                        "CRASH_DATE",
                        "CITY",
                        "STATE",
                        "SEX",
                        "AGE",
                        "SAFETY_EQUIPMENT",
                        "AIRBAG_DEPLOYED",
                        "EJECTION",
                        "INJURY_CLASSIFICATION",
                        "DRIVER_ACTION",
                        "DRIVER_VISION",
                        "PHYSICAL_CONDITION",
                        "BAC_RESULT",
                        "DAMAGE_CATEGORY",
                    ],
                ),
                ManifestTable::new(
                    "VEHICLE",
                    Vehicles,
                    &[
                        "VEHICLE_ID",
                        "CRASH_DATE",
                        "UNIT_NO",
                        "UNIT_TYPE",
                        "MAKE",
                        "MODEL",
                        "LIC_PLATE_STATE",
                        "VEHICLE_YEAR",
                        "VEHICLE_DEFECT",
                        "VEHICLE_TYPE",
                        "VEHICLE_USE",
                        "TRAVEL_DIRECTION",
                        "MANEUVER",
                        "OCCUPANT_CNT",
                        "FIRST_CONTACT_POINT",
                    ],
                ),
                ManifestTable::new(
                    "DAMAGE",
                    Damage,
                    &[
                        "DAMAGE_COST",
                        "NUM_UNITS",
                        "CRASH_ID",
                        "DATE_ID",
                        "LOCATION_ID",
                        "INJURY_ID",
                        "PERSON_ID",
                        "VEHICLE_ID",
                    ],
                ),
            ],
        }
    }
}

impl SchemaManifest {
    pub fn load(path: &Path) -> AnyResult<Self> {
        let file = File::open(path).with_context(|| format!("Opening manifest file {path:?}"))?;
        let manifest: SchemaManifest = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing manifest YAML {path:?}"))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> AnyResult<()> {
        ensure!(!self.tables.is_empty(), "Manifest must declare at least one table");
        let mut names = HashSet::with_capacity(self.tables.len());
        for table in &self.tables {
            ensure!(
                names.insert(table.name.to_lowercase()),
                "Manifest declares table '{}' more than once",
                table.name
            );
            ensure!(
                !table.columns.is_empty(),
                "Manifest table '{}' has no columns",
                table.name
            );
            let mut columns = HashSet::with_capacity(table.columns.len());
            for column in &table.columns {
                ensure!(
                    columns.insert(column.as_str()),
                    "Manifest table '{}' lists column '{column}' twice",
                    table.name
                );
            }
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&ManifestTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Inner join of `left` and `right` on `on`.
///
/// Rows follow `right`'s order; a right row without a matching key in `left`
/// is dropped. Duplicate keys in `left` resolve to the last such row. Output
/// columns are `left`'s schema followed by `right`'s remaining columns; on a
/// name collision the column keeps its left position and takes right's value.
pub fn join(left: &Table, right: &Table, on: &str) -> Result<Table> {
    let left_key = left.column_index(on).ok_or_else(|| TableError::missing(on))?;
    let right_key = right.column_index(on).ok_or_else(|| TableError::missing(on))?;

    let lookup: HashMap<String, usize> = left
        .rows()
        .enumerate()
        .map(|(idx, row)| (display_cell(row.cells()[left_key].as_ref()), idx))
        .collect();

    let mut columns = left.columns().to_vec();
    // Destination of each right column in the joined row; `None` for the key.
    let mut targets = Vec::with_capacity(right.columns().len());
    for (idx, name) in right.columns().iter().enumerate() {
        if idx == right_key {
            targets.push(None);
        } else if let Some(existing) = left.column_index(name) {
            targets.push(Some(existing));
        } else {
            targets.push(Some(columns.len()));
            columns.push(name.clone());
        }
    }

    let mut rows = Vec::new();
    for row in right.rows() {
        let key = display_cell(row.cells()[right_key].as_ref());
        let Some(&left_idx) = lookup.get(&key) else {
            continue;
        };
        let mut joined: Vec<Cell> = left
            .row(left_idx)
            .map(|left_row| left_row.cells().to_vec())
            .unwrap_or_default();
        joined.resize(columns.len(), None);
        for (cell, target) in row.cells().iter().zip(&targets) {
            if let Some(target) = target {
                joined[*target] = cell.clone();
            }
        }
        rows.push(joined);
    }
    debug!(
        "Joined '{}' ({} row(s)) with '{}' ({} row(s)) on '{on}': {} row(s)",
        left.name(),
        left.len(),
        right.name(),
        right.len(),
        rows.len()
    );
    Table::from_rows(format!("{}_{}", left.name(), right.name()), columns, rows)
}

/// New table with exactly `columns`, in order. Columns the source lacks are
/// filled with nulls; everything else is dropped. The source is untouched.
pub fn project<S: AsRef<str>>(table: &Table, name: &str, columns: &[S]) -> Result<Table> {
    let mut projected = table.copy();
    projected.set_name(name);
    let mut absent = 0usize;
    for column in columns {
        if !projected.has_column(column.as_ref()) {
            projected.add_column(column.as_ref(), None)?;
            absent += 1;
        }
    }
    if absent > 0 {
        debug!("Projection '{name}' filled {absent} absent column(s) with nulls");
    }
    projected.update_columns(columns)?;
    Ok(projected)
}

/// The three cleaned tables the star schema is built from.
#[derive(Debug, Clone, Copy)]
pub struct CleanedTables<'a> {
    pub crashes: &'a Table,
    pub people: &'a Table,
    pub vehicles: &'a Table,
}

impl CleanedTables<'_> {
    /// `vehicles ⋈ (crashes ⋈ people)` on the case identifier.
    pub fn damage(&self) -> Result<Table> {
        let crashes_people = join(self.crashes, self.people, CASE_COLUMN)?;
        let mut merged = join(self.vehicles, &crashes_people, CASE_COLUMN)?;
        merged.set_name("damage");
        Ok(merged)
    }
}

/// Projects one manifest entry. `damage` is the pre-built fact join, required
/// only for [`ManifestSource::Damage`] entries.
pub fn reshape(
    sources: CleanedTables<'_>,
    damage: Option<&Table>,
    entry: &ManifestTable,
) -> Result<Table> {
    let built;
    let source = match entry.source {
        ManifestSource::Crashes => sources.crashes,
        ManifestSource::People => sources.people,
        ManifestSource::Vehicles => sources.vehicles,
        ManifestSource::Damage => match damage {
            Some(table) => table,
            None => {
                built = sources.damage()?;
                &built
            }
        },
    };
    project(source, &entry.file_stem(), &entry.columns)
}
