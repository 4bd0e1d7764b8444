//! Loading scraped JSON into the catalog.
//!
//! Every record is its own unit of work: a bad record is skipped and
//! counted, and a storage failure rolls back only that record.

use derive_more::Display;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{ensure_association, upsert_beer, upsert_brewery, AssociationOutcome, UpsertOutcome, Upserted};
use crate::classify::Classifier;
use crate::error::{Error, NormalizationError, Result};
use crate::normalize::{format_abv, normalize, normalize_brewery, BreweryInfo, NormalizedBeer, RawBeer, RawBrewery};
use crate::taxonomy::CategoryId;

/// A beer in a source file: either a full record or just its name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BeerEntry {
    Name(String),
    Record(RawBeer),
}

impl BeerEntry {
    fn into_raw(self) -> RawBeer {
        match self {
            BeerEntry::Name(name) => RawBeer::named(&name),
            BeerEntry::Record(raw) => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BreweryRef {
    Name(String),
    Record(RawBrewery),
}

impl BreweryRef {
    fn into_raw(self) -> RawBrewery {
        match self {
            BreweryRef::Name(name) => RawBrewery::named(&name),
            BreweryRef::Record(raw) => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BreweryDocument {
    #[serde(flatten)]
    pub brewery: RawBrewery,
    #[serde(default)]
    pub beers: Vec<BeerEntry>,
}

/// The layouts scrapers have written over time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImportDocument {
    /// `{"brewery": {...}, "beers": [...]}`
    BreweryWithBeers {
        brewery: BreweryRef,
        #[serde(default)]
        beers: Vec<BeerEntry>,
    },
    /// `{"breweries": [{..., "beers": [...]}]}`
    Breweries { breweries: Vec<BreweryDocument> },
    /// `{"beers": [...]}`, brewery unknown.
    BeersOnly { beers: Vec<BeerEntry> },
    /// A flat list of beer records, each naming its brewery.
    Records(Vec<BeerEntry>),
}

/// One beer with the brewery it should be attached to.
#[derive(Debug)]
pub struct SourceRecord {
    pub brewery: Option<RawBrewery>,
    pub beer: RawBeer,
}

fn with_fallback(brewery: Option<RawBrewery>, fallback: Option<&str>) -> Option<RawBrewery> {
    match brewery {
        Some(mut raw) => {
            if raw.name.is_none() {
                raw.name = fallback.map(str::to_owned);
            }
            Some(raw)
        }
        None => fallback.map(RawBrewery::named),
    }
}

impl ImportDocument {
    pub fn parse(text: &str) -> Result<ImportDocument> {
        Ok(serde_json::from_str(text)?)
    }

    /// Flattens the document into records. `fallback_brewery` names the
    /// brewery for records that do not carry one.
    pub fn into_records(self, fallback_brewery: Option<&str>) -> Vec<SourceRecord> {
        let attach = |brewery: Option<RawBrewery>, beers: Vec<BeerEntry>| {
            beers
                .into_iter()
                .map(|entry| SourceRecord {
                    brewery: brewery.clone(),
                    beer: entry.into_raw(),
                })
                .collect::<Vec<_>>()
        };

        match self {
            ImportDocument::BreweryWithBeers { brewery, beers } => {
                attach(with_fallback(Some(brewery.into_raw()), fallback_brewery), beers)
            }
            ImportDocument::Breweries { breweries } => breweries
                .into_iter()
                .flat_map(|doc| attach(Some(doc.brewery), doc.beers))
                .collect(),
            ImportDocument::BeersOnly { beers } => {
                attach(with_fallback(None, fallback_brewery), beers)
            }
            ImportDocument::Records(entries) => entries
                .into_iter()
                .map(BeerEntry::into_raw)
                .map(|beer| SourceRecord {
                    brewery: with_fallback(beer.inline_brewery(), fallback_brewery),
                    beer,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum SkipReason {
    #[display(fmt = "{}", _0)]
    Invalid(NormalizationError),

    #[display(fmt = "storage error: {}", _0)]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub name: Option<String>,
    pub reason: SkipReason,
}

/// Counts for one import run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub breweries_added: usize,
    pub breweries_updated: usize,
    pub beers_added: usize,
    pub beers_updated: usize,
    pub beers_unchanged: usize,
    pub associations_created: usize,
    pub skipped: Vec<SkippedRecord>,
    pub failed_files: Vec<PathBuf>,
}

struct StoredRecord {
    brewery: Upserted,
    beer: Upserted,
    association: AssociationOutcome,
}

impl ImportReport {
    pub fn records_skipped(&self) -> usize {
        self.skipped.len()
    }

    pub fn absorb(&mut self, other: ImportReport) {
        self.breweries_added += other.breweries_added;
        self.breweries_updated += other.breweries_updated;
        self.beers_added += other.beers_added;
        self.beers_updated += other.beers_updated;
        self.beers_unchanged += other.beers_unchanged;
        self.associations_created += other.associations_created;
        self.skipped.extend(other.skipped);
        self.failed_files.extend(other.failed_files);
    }

    fn skip(&mut self, name: Option<String>, reason: SkipReason) {
        warn!(
            "Skipping record '{}': {}",
            name.as_deref().unwrap_or("<unnamed>"),
            reason
        );
        self.skipped.push(SkippedRecord { name, reason });
    }

    fn count(&mut self, stored: &StoredRecord) {
        match stored.brewery.outcome {
            UpsertOutcome::Created => self.breweries_added += 1,
            UpsertOutcome::Updated => self.breweries_updated += 1,
            UpsertOutcome::Unchanged => {}
        }
        match stored.beer.outcome {
            UpsertOutcome::Created => self.beers_added += 1,
            UpsertOutcome::Updated => self.beers_updated += 1,
            UpsertOutcome::Unchanged => self.beers_unchanged += 1,
        }
        if stored.association == AssociationOutcome::Created {
            self.associations_created += 1;
        }
    }

    pub fn log_summary(&self, source: &str) {
        info!(
            "{}: {} beers added, {} updated, {} unchanged, {} skipped; {} breweries added, {} updated; {} associations created",
            source,
            self.beers_added,
            self.beers_updated,
            self.beers_unchanged,
            self.records_skipped(),
            self.breweries_added,
            self.breweries_updated,
            self.associations_created
        );
    }
}

fn store_record(
    conn: &mut SqliteConnection,
    brewery: &BreweryInfo,
    beer: &NormalizedBeer,
    category_id: CategoryId,
) -> Result<StoredRecord> {
    let stored_brewery = upsert_brewery(conn, brewery)?;
    let stored_beer = upsert_beer(conn, beer, category_id, stored_brewery.id)?;
    let association = ensure_association(conn, stored_beer.id, stored_brewery.id)?;

    Ok(StoredRecord {
        brewery: stored_brewery,
        beer: stored_beer,
        association,
    })
}

pub fn import_records<I>(conn: &mut SqliteConnection, classifier: &Classifier, records: I) -> ImportReport
where
    I: IntoIterator<Item = SourceRecord>,
{
    let mut report = ImportReport::default();

    for record in records {
        let beer = match normalize(&record.beer) {
            Ok(beer) => beer,
            Err(e) => {
                report.skip(record.beer.name.clone(), SkipReason::Invalid(e));
                continue;
            }
        };

        let brewery = match record
            .brewery
            .as_ref()
            .ok_or(NormalizationError::MissingBrewery)
            .and_then(normalize_brewery)
        {
            Ok(brewery) => brewery,
            Err(e) => {
                report.skip(Some(beer.name), SkipReason::Invalid(e));
                continue;
            }
        };

        let category_id = classifier.classify(&beer);
        let stored = conn.transaction::<_, Error, _>(|conn| {
            store_record(conn, &brewery, &beer, category_id)
        });

        match stored {
            Ok(stored) => {
                debug!(
                    "{:?} beer '{}' ({}) at '{}' (category {})",
                    stored.beer.outcome,
                    beer.name,
                    beer.abv.map(format_abv).unwrap_or_else(|| "ABV unknown".to_owned()),
                    brewery.name,
                    category_id
                );
                report.count(&stored);
            }
            Err(e) => report.skip(Some(beer.name), SkipReason::Storage(e.to_string())),
        }
    }

    report
}

/// Brewery name implied by a file name: `half_acre.json` is "half acre".
pub fn brewery_from_file_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.replace('_', " "))
        .filter(|name| !name.trim().is_empty())
}

pub fn import_file(conn: &mut SqliteConnection, classifier: &Classifier, path: &Path) -> Result<ImportReport> {
    let text = fs::read_to_string(path)?;
    let document = ImportDocument::parse(&text)?;
    let fallback = brewery_from_file_name(path);

    let report = import_records(conn, classifier, document.into_records(fallback.as_deref()));
    report.log_summary(&path.display().to_string());
    Ok(report)
}

/// Expands directories into their `*.json` files, sorted by name.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry_path = entry?.path();
            if entry_path.is_file() && entry_path.extension().map_or(false, |ext| ext == "json") {
                found.push(entry_path);
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

/// Imports every file in turn. A file that cannot be read or parsed is
/// logged and recorded in `failed_files`; the run carries on.
pub fn import_paths(conn: &mut SqliteConnection, classifier: &Classifier, paths: &[PathBuf]) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for file in expand_paths(paths)? {
        match import_file(conn, classifier, &file) {
            Ok(file_report) => report.absorb(file_report),
            Err(e) => {
                error!("Failed to import {}: {}", file.display(), e);
                report.failed_files.push(file);
            }
        }
    }

    Ok(report)
}
