#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const CRASH_COLUMNS: [&str; 36] = [
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
    "DATE_POLICE_NOTIFIED",
    "PRIM_CONTRIBUTORY_CAUSE",
    "SEC_CONTRIBUTORY_CAUSE",
    "STREET_NO",
    "STREET_DIRECTION",
    "STREET_NAME",
    "BEAT_OF_OCCURRENCE",
    "NUM_UNITS",
    "MOST_SEVERE_INJURY",
    "INJURIES_TOTAL",
    "INJURIES_FATAL",
    "INJURIES_INCAPACITATING",
    "INJURIES_NON_INCAPACITATING",
    "INJURIES_REPORTED_NOT_EVIDENT",
    "INJURIES_NO_INDICATION",
    "INJURIES_UNKNOWN",
    "CRASH_HOUR",
    "CRASH_DAY_OF_WEEK",
    "CRASH_MONTH",
    "LATITUDE",
    "LONGITUDE",
    "LOCATION",
];

pub const PERSON_COLUMNS: [&str; 19] = [
    "PERSON_ID",
    "PERSON_TYPE",
    "RD_NO",
    "VEHICLE_ID",
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
    "DAMAGE",
];

pub const VEHICLE_COLUMNS: [&str; 17] = [
    "CRASH_UNIT_ID",
    "RD_NO",
    "CRASH_DATE",
    "UNIT_NO",
    "UNIT_TYPE",
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
];

/// One square beat, centroid (41.95, -87.65).
pub const BEAT_SQUARE: &str =
    "MULTIPOLYGON (((-87.7 41.9, -87.6 41.9, -87.6 42.0, -87.7 42.0, -87.7 41.9)))";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    /// Parent directories are created as needed.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Populates `raw/` and `external/` with a small, internally consistent
    /// crash dataset and returns the data directory.
    pub fn write_data_dir(&self) -> PathBuf {
        self.write_data_dir_with(b',')
    }

    /// Same dataset as [`TestWorkspace::write_data_dir`] with every input file
    /// separated by `delimiter`.
    pub fn write_data_dir_with(&self, delimiter: u8) -> PathBuf {
        let records = |columns: &[&str], rows: &[Vec<(&str, &str)>]| {
            records_with(columns, rows, delimiter)
        };
        self.write(
            "raw/Crashes.csv",
            &records(&CRASH_COLUMNS, &crash_rows()),
        );
        self.write(
            "raw/People.csv",
            &records(&PERSON_COLUMNS, &person_rows()),
        );
        self.write(
            "raw/Vehicles.csv",
            &records(&VEHICLE_COLUMNS, &vehicle_rows()),
        );
        self.write(
            "external/PoliceBeatDec2012_20241126.csv",
            &records(
                &["the_geom", "DISTRICT", "BEAT_NUM"],
                &[vec![("the_geom", BEAT_SQUARE), ("DISTRICT", "1"), ("BEAT_NUM", "0111")]],
            ),
        );
        self.write(
            "external/UScities.csv",
            &records(
                &["city", "state_id", "population"],
                &[
                    vec![("city", "Chicago"), ("state_id", "IL"), ("population", "2700000")],
                    vec![("city", "Evanston"), ("state_id", "IL"), ("population", "75000")],
                    vec![("city", "Gary"), ("state_id", "IN"), ("population", "69000")],
                ],
            ),
        );
        self.path().to_path_buf()
    }
}

/// Renders rows given as `(column, value)` pairs; unspecified columns are empty.
pub fn records(columns: &[&str], rows: &[Vec<(&str, &str)>]) -> String {
    records_with(columns, rows, b',')
}

pub fn records_with(columns: &[&str], rows: &[Vec<(&str, &str)>], delimiter: u8) -> String {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(columns).expect("write header");
    for row in rows {
        let values: HashMap<&str, &str> = row.iter().copied().collect();
        writer
            .write_record(columns.iter().map(|c| values.get(c).copied().unwrap_or("")))
            .expect("write row");
    }
    String::from_utf8(writer.into_inner().expect("flush csv")).expect("utf-8 csv")
}

pub fn crash_rows() -> Vec<Vec<(&'static str, &'static str)>> {
    vec![
        vec![
            ("RD_NO", "JA1"),
            ("CRASH_DATE", "03/15/2020 02:30:00 PM"),
            ("POSTED_SPEED_LIMIT", "85"),
            ("TRAFFICWAY_TYPE", "DIVIDED - W/MEDIAN (NOT RAISED)"),
            ("ROADWAY_SURFACE_COND", "SNOW, SLUSH"),
            ("REPORT_TYPE", "ON SCENE"),
            ("PRIM_CONTRIBUTORY_CAUSE", "\"UNSAFE\" SPEED (TOO FAST)"),
            ("STREET_NO", "100"),
            ("STREET_NAME", "STATE ST"),
            ("BEAT_OF_OCCURRENCE", "0111"),
            ("NUM_UNITS", "2"),
            ("MOST_SEVERE_INJURY", "FATAL"),
            ("INJURIES_TOTAL", "3"),
            ("INJURIES_FATAL", "1"),
            ("INJURIES_INCAPACITATING", "2"),
            ("INJURIES_NON_INCAPACITATING", "0"),
            ("INJURIES_REPORTED_NOT_EVIDENT", "0"),
            ("INJURIES_NO_INDICATION", "0"),
            ("CRASH_HOUR", "14"),
            ("CRASH_DAY_OF_WEEK", "1"),
            ("CRASH_MONTH", "3"),
            ("LATITUDE", "41.881832"),
            ("LONGITUDE", "-87.623177"),
            ("LOCATION", "POINT (-87.623177 41.881832)"),
        ],
        vec![
            ("RD_NO", "JA2"),
            ("CRASH_DATE", "12/01/2019 11:05:00 AM"),
            ("POSTED_SPEED_LIMIT", "5"),
            ("STREET_DIRECTION", "N"),
            ("BEAT_OF_OCCURRENCE", "111"),
            ("NUM_UNITS", "1"),
            ("INJURIES_TOTAL", "0"),
            ("INJURIES_FATAL", "0"),
            ("INJURIES_INCAPACITATING", "0"),
            ("INJURIES_NON_INCAPACITATING", "0"),
            ("INJURIES_REPORTED_NOT_EVIDENT", "0"),
            ("INJURIES_NO_INDICATION", "2"),
            ("CRASH_DAY_OF_WEEK", "7"),
        ],
        vec![
            ("RD_NO", "JA3"),
            ("CRASH_DATE", "not a date"),
            ("POSTED_SPEED_LIMIT", "30"),
        ],
    ]
}

pub fn person_rows() -> Vec<Vec<(&'static str, &'static str)>> {
    vec![
        vec![
            ("PERSON_ID", "O1"),
            ("PERSON_TYPE", "DRIVER"),
            ("RD_NO", "JA1"),
            ("VEHICLE_ID", "10"),
            ("CRASH_DATE", "03/15/2020 02:30:00 PM"),
            ("CITY", "chicago"),
            ("STATE", "IL"),
            ("SEX", "M"),
            ("AGE", "30"),
            ("AIRBAG_DEPLOYED", "DEPLOYED, FRONT"),
            ("DAMAGE_CATEGORY", "$500 OR LESS"),
        ],
        vec![
            ("PERSON_ID", "O2"),
            ("PERSON_TYPE", "DRIVER"),
            ("RD_NO", "JA2"),
            ("CRASH_DATE", "12/01/2019 11:05:00 AM"),
            ("CITY", "EVANSTNN"),
            ("SEX", "U"),
            ("DRIVER_VISION", "WINDSHIELD (WATER/ICE)"),
            ("DAMAGE_CATEGORY", "OVER $1,500"),
            ("DAMAGE", "1600"),
        ],
        vec![
            ("PERSON_ID", "O3"),
            ("PERSON_TYPE", "PASSENGER"),
            ("RD_NO", "JA9"),
            ("AGE", "50"),
        ],
    ]
}

pub fn vehicle_rows() -> Vec<Vec<(&'static str, &'static str)>> {
    vec![
        vec![
            ("CRASH_UNIT_ID", "1"),
            ("RD_NO", "JA1"),
            ("UNIT_NO", "1"),
            ("UNIT_TYPE", "DRIVER"),
            ("VEHICLE_ID", "10"),
            ("MAKE", "TOYOTA MOTOR COMPANY, LTD."),
            ("MODEL", "CAMRY"),
            ("LIC_PLATE_STATE", "IL"),
            ("VEHICLE_YEAR", "2015"),
            ("VEHICLE_TYPE", "PASSENGER"),
            ("OCCUPANT_CNT", "1"),
            ("FIRST_CONTACT_POINT", "FRONT (BUMPER)"),
        ],
        vec![
            ("CRASH_UNIT_ID", "2"),
            ("RD_NO", "JA2"),
            ("UNIT_NO", "1"),
            ("MAKE", "UNKNOWN/NA"),
            ("VEHICLE_YEAR", "2030"),
            ("OCCUPANT_CNT", "3"),
        ],
    ]
}

/// Reads a CSV file as header plus string rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("record").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

/// Value of `column` in `row` of a CSV read by [`read_csv`].
pub fn cell<'a>(headers: &[String], row: &'a [String], column: &str) -> &'a str {
    let idx = headers
        .iter()
        .position(|h| h == column)
        .unwrap_or_else(|| panic!("missing column {column}"));
    &row[idx]
}
