//! City/state lookup with edit-distance correction of misspelled city names.

use std::collections::HashMap;

use crate::{
    data::display_cell,
    error::{Result, TableError},
    table::Table,
    transform::text::UNKNOWN,
};

pub const CITY_COLUMN: &str = "city";
pub const STATE_COLUMN: &str = "state_id";
pub const UNKNOWN_STATE: &str = "XX";
/// Largest edit distance accepted as a correction.
pub const MAX_EDIT_DISTANCE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityState {
    pub city: String,
    pub state: String,
}

impl CityState {
    pub fn unknown() -> Self {
        CityState {
            city: UNKNOWN.to_string(),
            state: UNKNOWN_STATE.to_string(),
        }
    }
}

/// Lower-cased city name → state, iterated in insertion order.
#[derive(Debug, Default)]
pub struct CityStateLookup {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl CityStateLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the lookup from a table with `city` and `state_id` columns.
    pub fn from_table(table: &Table) -> Result<Self> {
        for column in [CITY_COLUMN, STATE_COLUMN] {
            if !table.has_column(column) {
                return Err(TableError::missing(column));
            }
        }
        let mut lookup = Self::new();
        for row in table.rows() {
            lookup.insert(
                &display_cell(row.get(CITY_COLUMN)),
                &display_cell(row.get(STATE_COLUMN)),
            );
        }
        Ok(lookup)
    }

    /// A repeated city keeps its first position but takes the latest state.
    pub fn insert(&mut self, city: &str, state: &str) {
        let key = city.trim().to_lowercase();
        match self.index.get(&key) {
            Some(&idx) => self.entries[idx].1 = state.to_string(),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, state.to_string()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical upper-cased city and its state for `raw`.
    ///
    /// Exact case-insensitive matches win. Otherwise the known city with the
    /// smallest Levenshtein distance is taken (first in insertion order on
    /// ties) if it is within [`MAX_EDIT_DISTANCE`]; anything further away
    /// yields `("UNKNOWN", "XX")`.
    pub fn correct(&self, raw: &str) -> CityState {
        let needle = raw.trim().to_lowercase();
        if let Some(&idx) = self.index.get(&needle) {
            return self.canonical(idx);
        }
        let needle_len = needle.chars().count();
        let mut best: Option<(usize, usize)> = None;
        for (idx, (city, _)) in self.entries.iter().enumerate() {
            // Edit distance is at least the length difference.
            if let Some((_, distance)) = best
                && city.chars().count().abs_diff(needle_len) >= distance
            {
                continue;
            }
            let distance = strsim::levenshtein(&needle, city);
            if best.is_none_or(|(_, current)| distance < current) {
                best = Some((idx, distance));
            }
        }
        match best {
            Some((idx, distance)) if distance <= MAX_EDIT_DISTANCE => self.canonical(idx),
            _ => CityState::unknown(),
        }
    }

    fn canonical(&self, idx: usize) -> CityState {
        let (city, state) = &self.entries[idx];
        CityState {
            city: city.to_uppercase(),
            state: state.clone(),
        }
    }
}
