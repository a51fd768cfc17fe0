//! Data-directory layout and datastore credentials.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

pub const CREDENTIAL_KEYS: [&str; 4] = ["server", "db", "user", "pwd"];

/// Well-known file locations under a single data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataPaths { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_crashes(&self) -> PathBuf {
        self.root.join("raw").join("Crashes.csv")
    }

    pub fn raw_people(&self) -> PathBuf {
        self.root.join("raw").join("People.csv")
    }

    pub fn raw_vehicles(&self) -> PathBuf {
        self.root.join("raw").join("Vehicles.csv")
    }

    pub fn police_beats(&self) -> PathBuf {
        self.root
            .join("external")
            .join("PoliceBeatDec2012_20241126.csv")
    }

    pub fn us_cities(&self) -> PathBuf {
        self.root.join("external").join("UScities.csv")
    }

    pub fn cleaned_crashes(&self) -> PathBuf {
        self.root.join("cleaned").join("crashes_cleaned.csv")
    }

    pub fn cleaned_people(&self) -> PathBuf {
        self.root.join("cleaned").join("people_cleaned.csv")
    }

    pub fn cleaned_vehicles(&self) -> PathBuf {
        self.root.join("cleaned").join("vehicles_cleaned.csv")
    }

    pub fn splitted_dir(&self) -> PathBuf {
        self.root.join("splitted")
    }

    /// Star-schema file for a table stem such as `crash` or `damage`.
    pub fn splitted(&self, stem: &str) -> PathBuf {
        self.splitted_dir().join(format!("{stem}.csv"))
    }

    pub fn default_load_script(&self) -> PathBuf {
        self.root.join("sql").join("load.sql")
    }

    /// DDL run ahead of the load when present.
    pub fn default_schema_script(&self) -> PathBuf {
        self.root.join("sql").join("schema.sql")
    }
}

/// Datastore connection settings read from a flat JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub db: String,
    pub user: String,
    pub pwd: String,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self> {
        let values = read_key_values(path)?;
        Self::from_map(&values).with_context(|| format!("Reading credentials from {path:?}"))
    }

    pub fn from_map(values: &BTreeMap<String, String>) -> Result<Self> {
        let missing: Vec<&str> = CREDENTIAL_KEYS
            .iter()
            .copied()
            .filter(|key| !values.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "Missing credential key(s): {}",
                missing.join(", ")
            ));
        }
        let get = |key: &str| values.get(key).cloned().unwrap_or_default();
        Ok(Credentials {
            server: get("server"),
            db: get("db"),
            user: get("user"),
            pwd: get("pwd"),
        })
    }
}

/// Reads a flat JSON object of string keys and string values.
pub fn read_key_values(path: &Path) -> Result<BTreeMap<String, String>> {
    let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing key-value JSON {path:?}"))
}
