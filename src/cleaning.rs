//! Cleaning pipelines for the three raw datasets.
//!
//! Each pipeline mutates its table in place: declarative replacement rules
//! first, then row filtering, enrichment, text normalization, numeric casts,
//! renames, and finally the surrogate key columns the star schema joins on.

use log::{debug, info};

use crate::{
    data::{NumericType, Value},
    enrich::{
        city::CityStateLookup,
        datetime::{CRASH_DATE_FORMAT, split_datetime},
        geo::{BeatGeometryMap, GEOHASH_PRECISION, backfill_coordinates, geohash_cells},
        injury::{InjuryIndex, assign_classification},
        keys::{EntityPrefix, add_surrogate_key},
        stats::CentralTendency,
    },
    error::Result,
    rules::{Condition, Fill, Rule, apply_rules},
    table::Table,
    transform::text::{
        UNKNOWN, clean_make_model, normalize_sentinel, replace_separators, strip_parenthetical,
        strip_quotes, strip_separators,
    },
};

/// Case identifier shared by crashes, people, and vehicles.
pub const CASE_COLUMN: &str = "RD_NO";

const SMALL_DAMAGE_CATEGORY: &str = "$500 OR LESS";
const SMALL_DAMAGE_COST: f64 = 250.0;

const CRASH_DROPPED_COLUMNS: [&str; 3] = ["CRASH_HOUR", "CRASH_MONTH", "INJURIES_UNKNOWN"];
const CRASH_SEPARATOR_COLUMNS: [&str; 9] = [
    "TRAFFICWAY_TYPE",
    "PRIM_CONTRIBUTORY_CAUSE",
    "SEC_CONTRIBUTORY_CAUSE",
    "ROAD_DEFECT",
    "LIGHTING_CONDITION",
    "FIRST_CRASH_TYPE",
    "MOST_SEVERE_INJURY",
    "ALIGNMENT",
    "ROADWAY_SURFACE_COND",
];
const CRASH_PARENTHETICAL_COLUMNS: [&str; 4] = [
    "TRAFFICWAY_TYPE",
    "REPORT_TYPE",
    "PRIM_CONTRIBUTORY_CAUSE",
    "SEC_CONTRIBUTORY_CAUSE",
];
const CRASH_INTEGER_COLUMNS: [&str; 8] = [
    "BEAT_OF_OCCURRENCE",
    "NUM_UNITS",
    "INJURIES_TOTAL",
    "INJURIES_FATAL",
    "INJURIES_INCAPACITATING",
    "INJURIES_NON_INCAPACITATING",
    "INJURIES_REPORTED_NOT_EVIDENT",
    "INJURIES_NO_INDICATION",
];

const PERSON_UNKNOWN_COLUMNS: [&str; 6] = [
    "SAFETY_EQUIPMENT",
    "AIRBAG_DEPLOYED",
    "EJECTION",
    "DRIVER_ACTION",
    "DRIVER_VISION",
    "PHYSICAL_CONDITION",
];
const PERSON_STRIPPED_SEPARATOR_COLUMNS: [&str; 3] =
    ["AIRBAG_DEPLOYED", "DAMAGE_CATEGORY", "BAC_RESULT"];
const PERSON_PARENTHETICAL_COLUMNS: [&str; 3] = ["CITY", "AIRBAG_DEPLOYED", "DRIVER_VISION"];

const VEHICLE_UNKNOWN_COLUMNS: [&str; 8] = [
    "MAKE",
    "MODEL",
    "VEHICLE_DEFECT",
    "VEHICLE_USE",
    "FIRST_CONTACT_POINT",
    "MANEUVER",
    "UNIT_TYPE",
    "VEHICLE_TYPE",
];
const VEHICLE_PARENTHETICAL_COLUMNS: [&str; 2] = ["VEHICLE_TYPE", "FIRST_CONTACT_POINT"];
const VEHICLE_INTEGER_COLUMNS: [&str; 3] = ["VEHICLE_YEAR", "OCCUPANT_CNT", "VEHICLE_ID"];
const OLDEST_VEHICLE_YEAR: i64 = 1886;
const NEWEST_VEHICLE_YEAR: i64 = 2018;

pub fn crash_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "POSTED_SPEED_LIMIT",
            Condition::DigitsAbove(70),
            Fill::Constant(Value::Integer(70)),
        ),
        Rule::new(
            "POSTED_SPEED_LIMIT",
            Condition::DigitsBelow(20),
            Fill::Constant(Value::Integer(20)),
        ),
        Rule::blank("REPORT_TYPE", UNKNOWN),
        Rule::blank("STREET_DIRECTION", "U"),
        Rule::blank("STREET_NAME", UNKNOWN),
        Rule::blank("MOST_SEVERE_INJURY", "NO INDICATION OF INJURY"),
        Rule::new("CRASH_DAY_OF_WEEK", Condition::WeekdayCode, Fill::WeekdayName),
    ]
}

pub fn person_rules() -> Vec<Rule> {
    let mut rules = vec![
        Rule::blank("VEHICLE_ID", Value::Integer(0)),
        Rule::blank("CITY", UNKNOWN),
        Rule::blank("STATE", "XX"),
        Rule::blank("SEX", "X"),
        Rule::new("SEX", Condition::Equals("U".into()), Fill::Constant("X".into())),
        Rule::impute("AGE", CentralTendency::Mean),
    ];
    rules.extend(
        PERSON_UNKNOWN_COLUMNS
            .iter()
            .map(|column| Rule::blank(*column, UNKNOWN)),
    );
    rules.push(Rule::blank("BAC_RESULT", "TEST NOT OFFERED"));
    rules
}

pub fn vehicle_rules() -> Vec<Rule> {
    let mut rules = vec![Rule::blank("VEHICLE_ID", Value::Integer(0))];
    rules.extend(
        VEHICLE_UNKNOWN_COLUMNS
            .iter()
            .map(|column| Rule::blank(*column, UNKNOWN)),
    );
    rules.extend([
        Rule::blank("LIC_PLATE_STATE", "XX"),
        Rule::blank("TRAVEL_DIRECTION", "U"),
        Rule::impute("VEHICLE_YEAR", CentralTendency::Mean),
        Rule::impute("OCCUPANT_CNT", CentralTendency::Mean),
        // Clamps run after the fill so an imputed year is also bounded.
        Rule::new(
            "VEHICLE_YEAR",
            Condition::NumberBelow(OLDEST_VEHICLE_YEAR as f64),
            Fill::Constant(Value::Integer(OLDEST_VEHICLE_YEAR)),
        ),
        Rule::new(
            "VEHICLE_YEAR",
            Condition::NumberAbove(NEWEST_VEHICLE_YEAR as f64),
            Fill::Constant(Value::Integer(NEWEST_VEHICLE_YEAR)),
        ),
    ]);
    rules
}

fn cast_integers(table: &mut Table, columns: &[&str]) -> Result<()> {
    for column in columns {
        table.cast_column(column, NumericType::Integer)?;
    }
    debug!("Cast {} column(s) to integer in '{}'", columns.len(), table.name());
    Ok(())
}

/// Cleans the crash table and adds the crash, date, location, and injury keys.
pub fn clean_crashes(table: &mut Table, beats: &BeatGeometryMap) -> Result<()> {
    apply_rules(table, &crash_rules())?;
    let dropped = table.filter_blank_rows("BEAT_OF_OCCURRENCE")?;
    debug!("Dropped {dropped} crash row(s) without a beat");
    table.remove_columns(&CRASH_DROPPED_COLUMNS)?;
    split_datetime(table, "CRASH_DATE", CRASH_DATE_FORMAT)?;
    table.ensure_column("LOCATION")?;

    let mut backfilled = 0usize;
    table.try_for_each_row(|mut row| {
        if backfill_coordinates(&mut row, beats, "LATITUDE", "LONGITUDE", "BEAT_OF_OCCURRENCE")? {
            backfilled += 1;
        }
        let location = geohash_cells(row.get("LATITUDE"), row.get("LONGITUDE"), GEOHASH_PRECISION)?;
        row.set("LOCATION", Some(Value::String(location)))?;
        for column in CRASH_SEPARATOR_COLUMNS {
            row.map_text(column, |value| {
                strip_quotes(&replace_separators(value, ";")).into_owned()
            })?;
        }
        for column in CRASH_PARENTHETICAL_COLUMNS {
            row.map_text(column, |value| strip_parenthetical(value).into_owned())?;
        }
        Ok(())
    })?;
    debug!("Backfilled coordinates for {backfilled} crash row(s) from beat centroids");

    cast_integers(table, &CRASH_INTEGER_COLUMNS)?;
    table.rename_column("LOCATION", "LOCATION_POINT")?;
    for entity in [
        EntityPrefix::Crash,
        EntityPrefix::Date,
        EntityPrefix::Location,
        EntityPrefix::Injury,
    ] {
        add_surrogate_key(table, entity)?;
    }
    info!("Cleaned {} crash row(s)", table.len());
    Ok(())
}

/// Cleans the person table. Injury classifications come from the already
/// loaded crash table through `injuries`.
pub fn clean_people(
    table: &mut Table,
    injuries: &InjuryIndex,
    cities: &CityStateLookup,
) -> Result<()> {
    apply_rules(table, &person_rules())?;
    assign_classification(table, injuries, CASE_COLUMN)?;

    let mut corrected = 0usize;
    table.try_for_each_row(|mut row| {
        if let Some(city) = row.get_str("CITY").filter(|city| *city != UNKNOWN) {
            let found = cities.correct(city);
            if found.city != city {
                corrected += 1;
            }
            row.set("CITY", Some(Value::String(found.city)))?;
            row.set("STATE", Some(Value::String(found.state)))?;
        }
        if row.get_str("DAMAGE_CATEGORY") == Some(SMALL_DAMAGE_CATEGORY) && row.is_blank("DAMAGE")
        {
            row.set("DAMAGE", Some(Value::Float(SMALL_DAMAGE_COST)))?;
        }
        for column in PERSON_STRIPPED_SEPARATOR_COLUMNS {
            row.map_text(column, |value| strip_separators(value).into_owned())?;
        }
        row.map_text("DRIVER_VISION", |value| {
            replace_separators(value, " OR").into_owned()
        })?;
        for column in PERSON_PARENTHETICAL_COLUMNS {
            row.map_text(column, |value| strip_parenthetical(value).into_owned())?;
        }
        Ok(())
    })?;
    debug!("Rewrote {corrected} city name(s) through the city lookup");

    cast_integers(table, &["AGE", "VEHICLE_ID"])?;
    table.rename_column("PERSON_ID", "PERSON")?;
    table.rename_column("VEHICLE_ID", "VEHICLE")?;
    table.rename_column("DAMAGE", "DAMAGE_COST")?;
    add_surrogate_key(table, EntityPrefix::Person)?;
    info!("Cleaned {} person row(s)", table.len());
    Ok(())
}

pub fn clean_vehicles(table: &mut Table) -> Result<()> {
    apply_rules(table, &vehicle_rules())?;
    table.try_for_each_row(|mut row| {
        row.map_all_text(normalize_sentinel);
        row.map_text("MAKE", clean_make_model)?;
        row.map_text("MODEL", clean_make_model)?;
        for column in VEHICLE_PARENTHETICAL_COLUMNS {
            row.map_text(column, |value| strip_parenthetical(value).into_owned())?;
        }
        Ok(())
    })?;
    cast_integers(table, &VEHICLE_INTEGER_COLUMNS)?;
    table.rename_column("VEHICLE_ID", "VEHICLE")?;
    add_surrogate_key(table, EntityPrefix::Vehicle)?;
    info!("Cleaned {} vehicle row(s)", table.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_lists_cover_expected_columns() {
        let columns: Vec<_> = person_rules().into_iter().map(|r| r.column).collect();
        assert!(columns.contains(&"AGE".to_string()));
        assert_eq!(columns.last().map(String::as_str), Some("BAC_RESULT"));
        assert_eq!(crash_rules().len(), 7);
        assert!(
            vehicle_rules()
                .iter()
                .any(|r| r.column == "LIC_PLATE_STATE")
        );
    }

    #[test]
    fn vehicle_rules_run_in_declared_order() {
        let columns: Vec<_> = vehicle_rules().into_iter().map(|r| r.column).collect();
        assert_eq!(
            columns,
            [
                "VEHICLE_ID",
                "MAKE",
                "MODEL",
                "VEHICLE_DEFECT",
                "VEHICLE_USE",
                "FIRST_CONTACT_POINT",
                "MANEUVER",
                "UNIT_TYPE",
                "VEHICLE_TYPE",
                "LIC_PLATE_STATE",
                "TRAVEL_DIRECTION",
                "VEHICLE_YEAR",
                "OCCUPANT_CNT",
                "VEHICLE_YEAR",
                "VEHICLE_YEAR",
            ]
        );
        let fills: Vec<_> = vehicle_rules().into_iter().map(|r| r.fill).collect();
        assert!(matches!(fills[11], Fill::CentralTendency(CentralTendency::Mean)));
        assert!(matches!(fills[13], Fill::Constant(Value::Integer(OLDEST_VEHICLE_YEAR))));
    }

    #[test]
    fn vehicle_sentinels_and_names_are_cleaned() {
        let columns = [
            "RD_NO",
            "VEHICLE_ID",
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
            "UNIT_TYPE",
        ];
        let row = |values: [&str; 14]| values.iter().map(|v| Some(Value::from(*v))).collect();
        let mut table = Table::from_rows(
            "vehicles",
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                row([
                    "JA1",
                    "",
                    "TOYOTA MOTOR COMPANY, LTD.",
                    "UNKNOWN/NA",
                    "",
                    "2030",
                    "UNKNOWN/NA",
                    "PASSENGER (CAR)",
                    "PERSONAL",
                    "",
                    "STRAIGHT AHEAD",
                    "1",
                    "FRONT (BUMPER)",
                    "DRIVER",
                ]),
                row([
                    "JA2", "7", "", "CIVIC", "IL", "", "NONE", "SUV", "", "N", "", "", "", "",
                ]),
            ],
        )
        .unwrap();
        clean_vehicles(&mut table).unwrap();
        assert_eq!(table.value(0, "MAKE"), Some(&Value::from("TOYOTA MOTOR COMPANY")));
        assert_eq!(table.value(0, "MODEL"), Some(&Value::from(UNKNOWN)));
        assert_eq!(table.value(0, "VEHICLE_DEFECT"), Some(&Value::from(UNKNOWN)));
        assert_eq!(table.value(0, "VEHICLE_TYPE"), Some(&Value::from("PASSENGER")));
        assert_eq!(table.value(0, "VEHICLE_YEAR"), Some(&Value::Integer(2018)));
        assert_eq!(table.value(0, "VEHICLE"), Some(&Value::Integer(0)));
        assert_eq!(table.value(1, "VEHICLE_YEAR"), Some(&Value::Integer(2018)));
        assert_eq!(table.value(1, "MAKE"), Some(&Value::from(UNKNOWN)));
        assert_eq!(table.value(1, "OCCUPANT_CNT"), Some(&Value::Integer(1)));
        assert_eq!(table.value(1, "VEHICLE_ID"), Some(&Value::from("VHC_000002")));
    }
}
