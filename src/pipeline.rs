//! Stage orchestration: raw → cleaned → star schema → SQL load script.
//!
//! Whole-table loads and stores run in parallel on the rayon pool. Mutation
//! of any single table stays on one thread, and the person pipeline waits
//! for the crash pipeline because injury classification reads cleaned
//! crashes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};
use rayon::prelude::*;

use crate::{
    cleaning::{CASE_COLUMN, clean_crashes, clean_people, clean_vehicles},
    config::{Credentials, DataPaths},
    enrich::{city::CityStateLookup, geo::BeatGeometryMap, injury::InjuryIndex},
    io_utils::{CsvOptions, read_table, write_table},
    load::{BulkSink, LOAD_ORDER, SqlScriptSink, load_table},
    reshape::{CleanedTables, ManifestSource, SchemaManifest, reshape},
    table::Table,
};

/// Runs `f` as a named stage, logging entry, completion, and failure.
pub fn run_stage<T, F>(name: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    info!("Running stage `{name}`");
    match f() {
        Ok(value) => {
            info!("Stage `{name}` completed");
            Ok(value)
        }
        Err(err) => {
            error!("Stage `{name}` failed: {err:#}");
            Err(err)
        }
    }
}

/// Reads every `(path, name)` pair in parallel, preserving input order.
fn read_tables<const N: usize>(
    sources: [(PathBuf, &str); N],
    options: CsvOptions,
) -> Result<[Table; N]> {
    let tables = sources
        .as_slice()
        .par_iter()
        .map(|(path, name)| {
            read_table(path, name, options).with_context(|| format!("Loading {name} from {path:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    tables
        .try_into()
        .map_err(|tables: Vec<Table>| anyhow!("Expected {N} tables but loaded {}", tables.len()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    pub crashes: usize,
    pub people: usize,
    pub vehicles: usize,
}

/// Cleans the three raw datasets and writes them under `cleaned/`.
pub fn clean(paths: &DataPaths, options: CsvOptions) -> Result<CleanSummary> {
    let [mut crashes, mut people, mut vehicles, beat_table, city_table] = run_stage("load raw", || {
        read_tables(
            [
                (paths.raw_crashes(), "crashes"),
                (paths.raw_people(), "people"),
                (paths.raw_vehicles(), "vehicles"),
                (paths.police_beats(), "police_beats"),
                (paths.us_cities(), "cities"),
            ],
            options,
        )
    })?;
    let beats = BeatGeometryMap::from_table(&beat_table).context("Building beat geometry map")?;
    let cities = CityStateLookup::from_table(&city_table).context("Building city lookup")?;
    debug!(
        "Loaded {} beat geometries and {} cities",
        beats.len(),
        cities.len()
    );

    let (crash_people, vehicle_result) = rayon::join(
        || -> Result<()> {
            run_stage("process crashes", || {
                clean_crashes(&mut crashes, &beats)?;
                write_table(&crashes, &paths.cleaned_crashes())
            })?;
            let injuries = InjuryIndex::from_crashes(&crashes, CASE_COLUMN)?;
            run_stage("process people", || {
                clean_people(&mut people, &injuries, &cities)?;
                write_table(&people, &paths.cleaned_people())
            })
        },
        || {
            run_stage("process vehicles", || {
                clean_vehicles(&mut vehicles)?;
                write_table(&vehicles, &paths.cleaned_vehicles())
            })
        },
    );
    crash_people?;
    vehicle_result?;

    let summary = CleanSummary {
        crashes: crashes.len(),
        people: people.len(),
        vehicles: vehicles.len(),
    };
    info!(
        "Cleaned {} crash, {} person, and {} vehicle row(s) into {:?}",
        summary.crashes,
        summary.people,
        summary.vehicles,
        paths.root().join("cleaned")
    );
    Ok(summary)
}

/// Projects the cleaned tables onto `manifest` and writes one file per entry
/// under `splitted/`. Returns `(file stem, row count)` in manifest order.
///
/// The cleaned files are read back the way [`write_table`] produced them,
/// so the raw-input delimiter and encoding do not apply here.
pub fn split(paths: &DataPaths, manifest: &SchemaManifest) -> Result<Vec<(String, usize)>> {
    let [crashes, people, vehicles] = run_stage("load cleaned", || {
        read_tables(
            [
                (paths.cleaned_crashes(), "crashes"),
                (paths.cleaned_people(), "people"),
                (paths.cleaned_vehicles(), "vehicles"),
            ],
            CsvOptions::default(),
        )
    })?;
    let sources = CleanedTables {
        crashes: &crashes,
        people: &people,
        vehicles: &vehicles,
    };

    run_stage("split star schema", || {
        let damage = if manifest
            .tables
            .iter()
            .any(|entry| entry.source == ManifestSource::Damage)
        {
            Some(sources.damage().context("Joining the damage fact table")?)
        } else {
            None
        };
        manifest
            .tables
            .par_iter()
            .map(|entry| -> Result<(String, usize)> {
                let table = reshape(sources, damage.as_ref(), entry)
                    .with_context(|| format!("Reshaping table '{}'", entry.name))?;
                let stem = entry.file_stem();
                write_table(&table, &paths.splitted(&stem))?;
                debug!("Wrote '{}' with {} row(s)", entry.name, table.len());
                Ok((stem, table.len()))
            })
            .collect()
    })
}

/// Renders the schema script (when given) followed by every star-schema
/// table in load order as a batched SQL script.
pub fn load(
    paths: &DataPaths,
    credentials: &Credentials,
    schema: Option<&Path>,
    output: &Path,
    batch_size: usize,
) -> Result<usize> {
    let tables = run_stage("load star schema", || {
        read_tables(
            LOAD_ORDER.map(|stem| (paths.splitted(stem), stem)),
            CsvOptions::default(),
        )
    })?;
    let mut sink = SqlScriptSink::create(output, credentials)?;
    if let Some(schema) = schema {
        run_stage("create schema", || {
            let script = fs::read_to_string(schema)
                .with_context(|| format!("Reading schema script {schema:?}"))?;
            sink.execute_script(&script)
                .with_context(|| format!("Executing schema script {schema:?}"))
        })?;
    }
    run_stage("populate database", || {
        let mut batches = 0usize;
        for table in &tables {
            batches += load_table(&mut sink, table, table.name(), batch_size)?;
        }
        sink.finish()?;
        info!("Wrote {batches} batch(es) for {} table(s) to {output:?}", tables.len());
        Ok(batches)
    })
}
