//! Police-beat geometry lookup, coordinate backfill, and geohash encoding.

use std::collections::HashMap;

use geo::{Centroid, Geometry, Point};
use wkt::TryFromWkt;

use crate::{
    data::{Value, as_number, display_cell},
    error::{Result, TableError},
    table::{RowMut, Table},
};

pub const BEAT_ID_COLUMN: &str = "BEAT_NUM";
pub const GEOMETRY_COLUMN: &str = "the_geom";
pub const GEOHASH_PRECISION: usize = 12;
const COORDINATE_DECIMALS: i32 = 6;

/// Beat identifier → centroid of the beat polygon, computed on insert.
#[derive(Debug, Default)]
pub struct BeatGeometryMap {
    centroids: HashMap<String, Point<f64>>,
}

impl BeatGeometryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from a table with `BEAT_NUM` and `the_geom` columns.
    /// Leading zeros are stripped from beat identifiers.
    pub fn from_table(table: &Table) -> Result<Self> {
        for column in [BEAT_ID_COLUMN, GEOMETRY_COLUMN] {
            if !table.has_column(column) {
                return Err(TableError::missing(column));
            }
        }
        let mut map = Self::new();
        for row in table.rows() {
            let beat = display_cell(row.get(BEAT_ID_COLUMN));
            let wkt = display_cell(row.get(GEOMETRY_COLUMN));
            map.insert(&beat, &wkt)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, beat: &str, wkt: &str) -> Result<()> {
        let key = beat.trim().trim_start_matches('0').to_string();
        let geometry = Geometry::<f64>::try_from_wkt_str(wkt).map_err(|err| TableError::Geometry {
            beat: beat.to_string(),
            message: err.to_string(),
        })?;
        let centroid = geometry.centroid().ok_or_else(|| TableError::Geometry {
            beat: beat.to_string(),
            message: "geometry has no centroid".to_string(),
        })?;
        self.centroids.insert(key, centroid);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// `(latitude, longitude)` of the beat's centroid, rounded to six places.
    pub fn centroid(&self, beat: &str) -> Option<(f64, f64)> {
        self.centroids.get(beat).map(|centroid| {
            (
                round_to(centroid.y(), COORDINATE_DECIMALS),
                round_to(centroid.x(), COORDINATE_DECIMALS),
            )
        })
    }
}

/// Normalizes a beat value from a crash row (`"0111"`, `"111.0"`) into a map key.
pub fn beat_key(value: &Value) -> Option<String> {
    let number = value.as_number()?;
    let key = (number.trunc() as i64).to_string();
    Some(key.trim_start_matches('0').to_string())
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fills blank latitude and longitude from the centroid of the row's beat.
/// Only rows where both coordinates are blank are touched; returns whether
/// the row was updated.
pub fn backfill_coordinates(
    row: &mut RowMut<'_>,
    beats: &BeatGeometryMap,
    latitude: &str,
    longitude: &str,
    beat: &str,
) -> Result<bool> {
    if !(row.is_blank(latitude) && row.is_blank(longitude)) {
        return Ok(false);
    }
    let Some((lat, lon)) = row
        .get(beat)
        .and_then(beat_key)
        .and_then(|key| beats.centroid(&key))
    else {
        return Ok(false);
    };
    row.set(latitude, Some(Value::Float(lat)))?;
    row.set(longitude, Some(Value::Float(lon)))?;
    Ok(true)
}

/// Encodes a coordinate pair at `precision` characters.
pub fn geohash(latitude: f64, longitude: f64, precision: usize) -> Result<String> {
    let invalid = || TableError::InvalidCoordinate {
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid());
    }
    geohash::encode(
        geohash::Coord {
            x: longitude,
            y: latitude,
        },
        precision,
    )
    .map_err(|_| invalid())
}

/// Geohash of two cells; both must hold numeric values.
pub fn geohash_cells(
    latitude: Option<&Value>,
    longitude: Option<&Value>,
    precision: usize,
) -> Result<String> {
    match (as_number(latitude), as_number(longitude)) {
        (Some(lat), Some(lon)) => geohash(lat, lon, precision),
        _ => Err(TableError::InvalidCoordinate {
            latitude: display_cell(latitude),
            longitude: display_cell(longitude),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "MULTIPOLYGON (((-87.7 41.9, -87.6 41.9, -87.6 42.0, -87.7 42.0, -87.7 41.9)))";

    fn crashes() -> Table {
        Table::from_rows(
            "crashes",
            vec!["BEAT_OF_OCCURRENCE".into(), "LATITUDE".into(), "LONGITUDE".into()],
            vec![
                vec![Some("0111.0".into()), Some("".into()), Some("".into())],
                vec![Some("111".into()), Some("41.5".into()), Some("".into())],
                vec![Some("999".into()), Some("".into()), Some("".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn centroid_is_rounded_and_keyed_without_leading_zeros() {
        let mut beats = BeatGeometryMap::new();
        beats.insert("0111", SQUARE).unwrap();
        assert_eq!(beats.centroid("111"), Some((41.95, -87.65)));
        assert!(beats.centroid("0111").is_none());
    }

    #[test]
    fn backfill_requires_both_coordinates_blank() {
        let mut beats = BeatGeometryMap::new();
        beats.insert("111", SQUARE).unwrap();
        let mut table = crashes();
        let mut filled = Vec::new();
        table
            .try_for_each_row(|mut row| {
                filled.push(backfill_coordinates(
                    &mut row,
                    &beats,
                    "LATITUDE",
                    "LONGITUDE",
                    "BEAT_OF_OCCURRENCE",
                )?);
                Ok(())
            })
            .unwrap();
        assert_eq!(filled, vec![true, false, false]);
        assert_eq!(table.value(0, "LATITUDE"), Some(&Value::Float(41.95)));
        assert_eq!(table.value(1, "LONGITUDE"), Some(&Value::from("")));
    }

    #[test]
    fn invalid_geometry_is_reported_with_beat() {
        let mut beats = BeatGeometryMap::new();
        let err = beats.insert("1", "POLYGON ((oops))").unwrap_err();
        assert!(matches!(err, TableError::Geometry { beat, .. } if beat == "1"));
    }

    #[test]
    fn geohash_is_deterministic_and_validates_input() {
        let first = geohash(41.881832, -87.623177, GEOHASH_PRECISION).unwrap();
        let second = geohash(41.881832, -87.623177, GEOHASH_PRECISION).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), GEOHASH_PRECISION);
        assert!(first.starts_with("dp3w"));
        let err = geohash_cells(Some(&Value::from("")), Some(&Value::from("1")), 12).unwrap_err();
        assert!(matches!(err, TableError::InvalidCoordinate { .. }));
    }
}
