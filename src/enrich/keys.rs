//! Positional surrogate keys for the star-schema tables.

use crate::{data::Value, error::Result, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityPrefix {
    Crash,
    Date,
    Location,
    Injury,
    Person,
    Vehicle,
}

impl EntityPrefix {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityPrefix::Crash => "CRS",
            EntityPrefix::Date => "DT",
            EntityPrefix::Location => "LCT",
            EntityPrefix::Injury => "NJR",
            EntityPrefix::Person => "PRS",
            EntityPrefix::Vehicle => "VHC",
        }
    }

    /// Column the key is written to.
    pub fn key_column(&self) -> &'static str {
        match self {
            EntityPrefix::Crash => "CRASH_ID",
            EntityPrefix::Date => "DATE_ID",
            EntityPrefix::Location => "LOCATION_ID",
            EntityPrefix::Injury => "INJURY_ID",
            EntityPrefix::Person => "PERSON_ID",
            EntityPrefix::Vehicle => "VEHICLE_ID",
        }
    }
}

/// `PREFIX_000001` for the first row.
pub fn surrogate_key(prefix: EntityPrefix, index: usize) -> String {
    format!("{}_{:06}", prefix.prefix(), index + 1)
}

/// Appends the entity's key column, numbered by row position.
pub fn add_surrogate_key(table: &mut Table, entity: EntityPrefix) -> Result<()> {
    table.add_column_with(entity.key_column(), |_, idx| {
        Some(Value::String(surrogate_key(entity, idx)))
    })
}
