//! The [`Gazetteer`]: building the index from place records and resolving
//! location strings against it.
//!
//! Building ("create") and querying ("serve") are separate phases over the
//! same index directory. A build replaces whatever was there; an opened
//! gazetteer never writes.
//!
//! ```rust,no_run
//! use toponym::{Gazetteer, OverrideMap, QueryPolicy, SearchConfig};
//!
//! let gazetteer = Gazetteer::open(
//!     toponym::default_index_dir(),
//!     OverrideMap::default(),
//!     SearchConfig::default(),
//! )?;
//! let outcome = gazetteer.search_location_with("Springfield", 5, QueryPolicy::KeywordFallback)?;
//! println!("{} of {} candidates", outcome.returned_count, outcome.total_available);
//! # Ok::<(), toponym::error::ToponymError>(())
//! ```

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use toponym_data_processing::{PlaceRecord, RawDataPaths, ReferenceTables, load_place_records};
use tracing::{info, instrument, warn};

use crate::{
    config::SearchConfig,
    document::DocumentBuilder,
    error::Result,
    index::{FieldMap, GazetteerIndex, IndexStore},
    search::{OverrideMap, QueryPolicy, QueryResolver, RankedSearch, SearchOutcome},
};

/// File written next to the index after a successful build.
pub const BUILD_INFO_FILE: &str = "build_info.json";

/// Summary of one index build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub generated_at: DateTime<Utc>,
    pub index_dir: PathBuf,
    /// Records handed to the builder.
    pub attempted: usize,
    pub indexed: usize,
    /// Records rejected by validation or sharing an id with an earlier record.
    pub skipped: usize,
    /// Indexed records without a country.
    pub top_level: usize,
    /// Rows of the place dump that never became records.
    pub malformed_rows: usize,
    pub countries: usize,
    pub admin1: usize,
    pub admin2: usize,
}

impl BuildReport {
    /// Read the report of the last build at `index_dir`.
    pub fn read(index_dir: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(index_dir.as_ref().join(BUILD_INFO_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(self.index_dir.join(BUILD_INFO_FILE), contents)?;
        Ok(())
    }
}

/// A read-only gazetteer index together with its override map and search
/// defaults. Cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    index: GazetteerIndex,
    overrides: OverrideMap,
    config: SearchConfig,
}

impl Gazetteer {
    /// Build the index at `index_dir` from `records`, replacing any previous
    /// build there.
    #[instrument(name = "Create gazetteer index", skip_all, fields(index_dir = %index_dir.as_ref().display()), level = "info")]
    pub fn create(
        index_dir: impl AsRef<Path>,
        tables: &ReferenceTables,
        records: &[PlaceRecord<'_>],
    ) -> Result<BuildReport> {
        Self::build(index_dir.as_ref(), tables, records, 0)
    }

    /// Load reference tables and places from GeoNames dumps, then build.
    #[instrument(name = "Create gazetteer index from raw data", skip_all, level = "info")]
    pub fn create_from_raw(paths: &RawDataPaths, index_dir: impl AsRef<Path>) -> Result<BuildReport> {
        let tables = ReferenceTables::load(paths)?;
        let load = load_place_records(&paths.places, &tables)?;
        Self::build(index_dir.as_ref(), &tables, &load.records, load.malformed_rows)
    }

    fn build(
        index_dir: &Path,
        tables: &ReferenceTables,
        records: &[PlaceRecord<'_>],
        malformed_rows: usize,
    ) -> Result<BuildReport> {
        let t_build = std::time::Instant::now();
        let batch = DocumentBuilder::new().build_batch(records);

        let mut handle = IndexStore::open_for_build(index_dir)?;
        let mut seen = AHashSet::with_capacity(batch.documents.len());
        let mut duplicates = 0usize;
        let mut top_level = 0usize;
        for document in &batch.documents {
            if !seen.insert(document.geoname_id.as_str()) {
                warn!(geoname_id = %document.geoname_id, "Skipping duplicate GeonameId");
                duplicates += 1;
                continue;
            }
            handle.add(document)?;
            top_level += usize::from(document.top_level);
        }
        let indexed = handle.close()?;

        let report = BuildReport {
            generated_at: Utc::now(),
            index_dir: index_dir.to_path_buf(),
            attempted: batch.attempted,
            indexed,
            skipped: batch.skipped + duplicates,
            top_level,
            malformed_rows,
            countries: tables.country_count(),
            admin1: tables.admin1_count(),
            admin2: tables.admin2_count(),
        };
        report.write()?;
        info!(
            attempted = report.attempted,
            indexed = report.indexed,
            skipped = report.skipped,
            elapsed_seconds = t_build.elapsed().as_secs_f32(),
            "Index build complete"
        );
        Ok(report)
    }

    /// Open a previously built index for querying.
    #[instrument(name = "Open gazetteer", skip_all, fields(index_dir = %index_dir.as_ref().display()), level = "info")]
    pub fn open(
        index_dir: impl AsRef<Path>,
        overrides: OverrideMap,
        config: SearchConfig,
    ) -> Result<Self> {
        let index = IndexStore::open_for_read(index_dir)?;
        let doc_count = index.num_docs()?;
        info!(doc_count, overrides = overrides.len(), policy = %config.policy, "Opened gazetteer index");
        if let Some(sample) = index.sample_document()? {
            info!(fields = sample.len(), "Fields of a sample document");
            for (position, line) in describe_fields(&sample).iter().enumerate() {
                info!("{}) {line}", position + 1);
            }
        } else {
            warn!("Gazetteer index is empty");
        }
        Ok(Self {
            index,
            overrides,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    pub fn doc_count(&self) -> Result<u64> {
        Ok(self.index.num_docs()?)
    }

    /// Resolver using this gazetteer's overrides and the given policy.
    pub fn resolver(&self, policy: QueryPolicy) -> QueryResolver<'_> {
        QueryResolver::new(&self.overrides, policy)
    }

    /// Run a raw query expression, population-ranked.
    pub fn search_index(
        &self,
        expr: &str,
        max_records: usize,
        want_total: bool,
    ) -> Result<SearchOutcome> {
        Ok(RankedSearch::new(&self.index).search(expr, max_records, want_total)?)
    }

    /// Resolve a location string with the configured defaults.
    pub fn search_location(&self, input: &str) -> Result<SearchOutcome> {
        self.search_location_with(input, self.config.max_records, self.config.policy)
    }

    #[instrument(name = "Search location", skip(self), level = "debug")]
    pub fn search_location_with(
        &self,
        input: &str,
        max_records: usize,
        policy: QueryPolicy,
    ) -> Result<SearchOutcome> {
        let strategies = self.resolver(policy).resolve(input);
        Ok(RankedSearch::new(&self.index).search_location(&strategies, max_records)?)
    }
}

/// `name:value` for every stored field, in field-name order.
fn describe_fields(document: &FieldMap) -> Vec<String> {
    document
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect()
}
