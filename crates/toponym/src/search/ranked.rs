use serde::Serialize;
use tracing::{debug, instrument};

use super::Result;
use crate::index::{FieldMap, GazetteerIndex, SortBy};

/// Reported as `total_available` when more matches may exist than were
/// returned and no full count was requested.
pub const UNKNOWN_TOTAL: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub records: Vec<FieldMap>,
    pub returned_count: usize,
    pub total_available: i64,
}

impl SearchOutcome {
    fn new(records: Vec<FieldMap>, total_available: i64) -> Self {
        Self {
            returned_count: records.len(),
            records,
            total_available,
        }
    }

    /// `GeonameId` of each returned record, in rank order.
    pub fn geoname_ids(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| r.get(crate::index::fields::GEONAME_ID))
            .map(String::as_str)
            .collect()
    }
}

/// Executes expressions with results ordered by population, largest first.
#[derive(Debug, Clone)]
pub struct RankedSearch<'a> {
    index: &'a GazetteerIndex,
    sort: SortBy,
}

impl<'a> RankedSearch<'a> {
    pub fn new(index: &'a GazetteerIndex) -> Self {
        Self {
            index,
            sort: SortBy::population_desc(),
        }
    }

    /// Run a single expression.
    ///
    /// Without `want_total` the reported total is the page size when the page
    /// came back short, and [`UNKNOWN_TOTAL`] otherwise.
    #[instrument(name = "Ranked search", skip(self), level = "debug")]
    pub fn search(&self, expr: &str, max_records: usize, want_total: bool) -> Result<SearchOutcome> {
        let hits = self
            .index
            .snapshot()?
            .query(expr, max_records, Some(&self.sort))?;

        let returned = hits.matches.len();
        let total_available = if want_total {
            hits.total as i64
        } else if returned < max_records {
            returned as i64
        } else {
            UNKNOWN_TOTAL
        };
        Ok(SearchOutcome::new(hits.matches, total_available))
    }

    /// Try each expression in order and return the first that matches
    /// anything. The reported total is the verified match count of that
    /// expression, or 0 when none matched.
    #[instrument(name = "Ranked location search", skip(self), level = "debug")]
    pub fn search_location(&self, strategies: &[String], max_records: usize) -> Result<SearchOutcome> {
        let snapshot = self.index.snapshot()?;
        for expr in strategies {
            let hits = snapshot.query(expr, max_records, Some(&self.sort))?;
            if hits.total > 0 {
                debug!(expr = %expr, total = hits.total, "Strategy matched");
                return Ok(SearchOutcome::new(hits.matches, hits.total as i64));
            }
            debug!(expr = %expr, "Strategy yielded no matches");
        }
        Ok(SearchOutcome::new(Vec::new(), 0))
    }
}
