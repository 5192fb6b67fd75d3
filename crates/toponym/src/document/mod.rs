//! Flattening of place records into indexable documents.
//!
//! A document carries the place's own identity plus display strings for
//! every ancestor, an `AncestorsNames` trail used for hierarchical queries,
//! and a `Name` field that lists alternate spellings and codes in a single
//! trailing parenthetical group.

use itertools::Itertools;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::index::fields;
use toponym_data_processing::PlaceRecord;

static STATE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,5}$").expect("state code pattern is valid"));

/// Verbose official country names and the searchable form they are indexed
/// under. Matched on prefix.
const COUNTRY_NAME_REWRITES: [(&str, &str); 2] = [
    ("United Kingdom of ", "United Kingdom (Great Britain, UK)"),
    ("United Arab Emirates", "United Arab Emirates (UAE)"),
];

const TRAIL_SEPARATOR: &str = ", ";

/// The flattened projection of one [`PlaceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedDocument {
    pub geoname_id: String,
    pub class: String,
    pub code: String,
    pub population: i64,
    pub latitude: String,
    pub longitude: String,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub ancestors_names: Option<String>,
    /// Ids of the county, state and country ancestors. The continent id is
    /// not part of the trail and the trail itself is not indexed.
    pub ancestor_ids: Option<String>,
    /// Canonical, possibly rewritten, name.
    pub name: String,
    pub alternate_names: Vec<String>,
    pub top_level: bool,
}

impl IndexedDocument {
    /// The searchable `Name` value: `"<name> (<alt>, <alt>)"`, or just the
    /// name when there are no alternates.
    pub fn name_field(&self) -> String {
        if self.alternate_names.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.alternate_names.join(TRAIL_SEPARATOR))
        }
    }

    /// Every indexed field with its stored string value, in schema order.
    /// Absent ancestors are omitted.
    pub fn stored_fields(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            (fields::GEONAME_ID, self.geoname_id.clone()),
            (fields::CLASS, self.class.clone()),
            (fields::CODE, self.code.clone()),
            (fields::POPULATION, self.population.to_string()),
            (fields::LATITUDE, self.latitude.clone()),
            (fields::LONGITUDE, self.longitude.clone()),
        ];
        let optional = [
            (fields::COUNTY, &self.county),
            (fields::STATE, &self.state),
            (fields::COUNTRY, &self.country),
            (fields::CONTINENT, &self.continent),
            (fields::ANCESTORS_NAMES, &self.ancestors_names),
        ];
        out.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.clone().map(|v| (name, v))),
        );
        out.push((fields::NAME, self.name_field()));
        out
    }
}

/// Outcome of building documents for a whole batch of records.
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
    pub documents: Vec<IndexedDocument>,
    pub attempted: usize,
    pub skipped: usize,
    pub top_level: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBuilder;

impl DocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Flatten one record. Never fails: missing or odd ancestor data only
    /// results in fewer fields.
    pub fn build(&self, record: &PlaceRecord<'_>) -> IndexedDocument {
        let mut name = record.name.clone();
        let mut alternates = Vec::new();
        let mut trail_names = Vec::new();
        let mut trail_ids = Vec::new();

        if !eq_ignore_case(&record.name, &record.ascii_name) && !record.ascii_name.is_empty() {
            alternates.push(record.ascii_name.clone());
        }

        let county = record.county.map(|county| {
            trail_names.push(county.name.clone());
            trail_ids.push(county.geoname_id.to_string());
            county.name.clone()
        });

        let state = record.state.map(|state| {
            let mut display = state.name.clone();
            if let Some(short) = state.short_code().filter(|c| STATE_CODE.is_match(c)) {
                display = format!("{display} ({short})");
                if record.feature.is_first_order_admin() {
                    alternates.push(short.to_string());
                }
            }
            trail_names.push(display.clone());
            trail_ids.push(state.geoname_id.to_string());
            display
        });

        let mut country_display = None;
        let mut continent = None;
        if let Some(country) = record.country {
            let display = if record.feature.is_country() {
                if !eq_ignore_case(&name, &country.name) {
                    match rewrite_country_name(&name) {
                        Some(rewritten) => {
                            debug!(from = %name, to = rewritten, "Rewrote country name");
                            name = rewritten.to_string();
                        }
                        None => alternates.push(country.name.clone()),
                    }
                }
                alternates.push(country.iso.clone());
                alternates.push(country.iso3.clone());
                country.name.clone()
            } else {
                format!("{} ({}, {})", country.name, country.iso, country.iso3)
            };
            trail_names.push(display.clone());
            trail_ids.push(country.geoname_id.to_string());
            if country.continent.is_known() {
                trail_names.push(country.continent.name.to_string());
                continent = Some(country.continent.name.to_string());
            }
            country_display = Some(display);
        }

        let has_country = record.country.is_some();
        let document = IndexedDocument {
            geoname_id: record.geoname_id.to_string(),
            class: record.feature.class.clone(),
            code: record.feature.code.clone(),
            population: record.population,
            latitude: record.latitude.to_string(),
            longitude: record.longitude.to_string(),
            county,
            state,
            country: country_display,
            continent,
            ancestors_names: has_country.then(|| trail_names.join(TRAIL_SEPARATOR)),
            ancestor_ids: has_country.then(|| trail_ids.join(TRAIL_SEPARATOR)),
            name,
            alternate_names: alternates,
            top_level: !has_country,
        };

        if document.top_level {
            let listing = document
                .stored_fields()
                .into_iter()
                .map(|(field, value)| format!("{field}:{value}"))
                .join(TRAIL_SEPARATOR);
            warn!(geoname_id = %document.geoname_id, "Top-level record without country: {listing}");
        }
        document
    }

    /// Validate and build every record in parallel. Invalid records are
    /// logged and counted, never fatal.
    #[instrument(name = "Build documents", skip_all, fields(records = records.len()))]
    pub fn build_batch(&self, records: &[PlaceRecord<'_>]) -> DocumentBatch {
        let built: Vec<Option<IndexedDocument>> = records
            .par_iter()
            .map(|record| match record.validate() {
                Ok(()) => Some(self.build(record)),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid place record");
                    None
                }
            })
            .collect();

        let attempted = built.len();
        let documents: Vec<IndexedDocument> = built.into_iter().flatten().collect();
        let top_level = documents.iter().filter(|d| d.top_level).count();
        let batch = DocumentBatch {
            skipped: attempted - documents.len(),
            attempted,
            top_level,
            documents,
        };
        info!(
            attempted = batch.attempted,
            built = batch.documents.len(),
            skipped = batch.skipped,
            top_level = batch.top_level,
            "Built documents"
        );
        batch
    }
}

fn rewrite_country_name(name: &str) -> Option<&'static str> {
    COUNTRY_NAME_REWRITES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, rewritten)| *rewritten)
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use toponym_data_processing::{AdminDivision, Continent, Country, FeatureType};

    fn admin(code: &str, name: &str, id: u32) -> AdminDivision {
        AdminDivision {
            code: code.into(),
            name: name.into(),
            ascii_name: name.into(),
            geoname_id: id,
        }
    }

    fn country(iso: &str, iso3: &str, name: &str, id: u32, continent: Continent) -> Country {
        Country {
            iso: iso.into(),
            iso3: iso3.into(),
            name: name.into(),
            area: 1.0,
            population: 1,
            geoname_id: id,
            continent,
        }
    }

    fn place<'t>(
        id: u32,
        name: &str,
        feature: FeatureType,
        county: Option<&'t AdminDivision>,
        state: Option<&'t AdminDivision>,
        country: Option<&'t Country>,
    ) -> PlaceRecord<'t> {
        PlaceRecord {
            geoname_id: id,
            name: name.into(),
            ascii_name: name.into(),
            feature,
            population: 100,
            latitude: 1.5,
            longitude: -2.25,
            county,
            state,
            country,
        }
    }

    #[test]
    fn test_city_with_full_chain() {
        let sangamon = admin("US.IL.167", "Sangamon County", 4250541);
        let illinois = admin("US.IL", "Illinois", 4896861);
        let us = country("US", "USA", "United States", 6252001, Continent::NORTH_AMERICA);
        let record = place(
            4250542,
            "Springfield",
            FeatureType::new("P", "PPLA"),
            Some(&sangamon),
            Some(&illinois),
            Some(&us),
        );

        let doc = DocumentBuilder::new().build(&record);
        assert_eq!(doc.state.as_deref(), Some("Illinois (IL)"));
        assert_eq!(doc.country.as_deref(), Some("United States (US, USA)"));
        assert_eq!(doc.continent.as_deref(), Some("North America"));
        assert_eq!(
            doc.ancestors_names.as_deref(),
            Some("Sangamon County, Illinois (IL), United States (US, USA), North America")
        );
        assert_eq!(doc.ancestor_ids.as_deref(), Some("4250541, 4896861, 6252001"));
        assert_eq!(doc.name_field(), "Springfield");
        assert!(!doc.top_level);
    }

    #[test]
    fn test_trail_ends_with_country_then_continent() {
        let fr = country("FR", "FRA", "France", 3017382, Continent::EUROPE);
        let idf = admin("FR.11", "Île-de-France", 3012874);
        let records = [
            place(1, "Lyon", FeatureType::new("P", "PPLA"), None, None, Some(&fr)),
            place(2, "Paris", FeatureType::new("P", "PPLC"), None, Some(&idf), Some(&fr)),
            place(3, "France", FeatureType::new("A", "PCLI"), None, None, Some(&fr)),
        ];
        for record in &records {
            let doc = DocumentBuilder::new().build(record);
            let trail = doc.ancestors_names.unwrap();
            let country = doc.country.unwrap();
            assert!(trail.ends_with(&format!("{country}, Europe")), "{trail}");
        }
    }

    #[test]
    fn test_numeric_state_code_is_not_appended() {
        let fr = country("FR", "FRA", "France", 3017382, Continent::EUROPE);
        let idf = admin("FR.11", "Île-de-France", 3012874);
        let doc = DocumentBuilder::new().build(&place(
            3012874,
            "Île-de-France",
            FeatureType::new("A", "ADM1"),
            None,
            Some(&idf),
            Some(&fr),
        ));
        assert_eq!(doc.state.as_deref(), Some("Île-de-France"));
        assert!(doc.alternate_names.is_empty());
    }

    #[test]
    fn test_state_record_lists_its_code() {
        let us = country("US", "USA", "United States", 6252001, Continent::NORTH_AMERICA);
        let illinois = admin("US.IL", "Illinois", 4896861);
        let doc = DocumentBuilder::new().build(&place(
            4896861,
            "Illinois",
            FeatureType::new("A", "ADM1"),
            None,
            Some(&illinois),
            Some(&us),
        ));
        assert_eq!(doc.name_field(), "Illinois (IL)");
    }

    #[test]
    fn test_ascii_name_becomes_alternate() {
        let mut record = place(2, "Zürich", FeatureType::new("P", "PPLA"), None, None, None);
        record.ascii_name = "Zurich".into();
        let doc = DocumentBuilder::new().build(&record);
        assert_eq!(doc.name_field(), "Zürich (Zurich)");

        record.ascii_name = "ZÜRICH".into();
        assert_eq!(
            DocumentBuilder::new().build(&record).name_field(),
            "Zürich",
            "case-insensitive equal names add no alternate"
        );
    }

    #[test]
    fn test_united_kingdom_rewrite() {
        let gb = country("GB", "GBR", "United Kingdom", 2635167, Continent::EUROPE);
        let doc = DocumentBuilder::new().build(&place(
            2635167,
            "United Kingdom of Great Britain and Northern Ireland",
            FeatureType::new("A", "PCLI"),
            None,
            None,
            Some(&gb),
        ));
        assert_eq!(doc.name, "United Kingdom (Great Britain, UK)");
        assert_eq!(doc.alternate_names, vec!["GB", "GBR"]);
        assert_eq!(doc.name_field(), "United Kingdom (Great Britain, UK) (GB, GBR)");
        assert_eq!(doc.country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn test_country_record_without_rewrite_lists_canonical_name() {
        let fr = country("FR", "FRA", "France", 3017382, Continent::EUROPE);
        let doc = DocumentBuilder::new().build(&place(
            3017382,
            "Republic of France",
            FeatureType::new("A", "PCLI"),
            None,
            None,
            Some(&fr),
        ));
        assert_eq!(doc.name_field(), "Republic of France (France, FR, FRA)");

        let ae = country("AE", "ARE", "United Arab Emirates", 290557, Continent::ASIA);
        let doc = DocumentBuilder::new().build(&place(
            290557,
            "United Arab Emirates",
            FeatureType::new("A", "PCLI"),
            None,
            None,
            Some(&ae),
        ));
        assert_eq!(doc.name_field(), "United Arab Emirates (AE, ARE)");
    }

    #[test]
    fn test_unknown_continent_is_left_off_the_trail() {
        let xk = country("XK", "XKX", "Kosovo", 831053, Continent::UNKNOWN);
        let doc = DocumentBuilder::new().build(&place(
            1,
            "Pristina",
            FeatureType::new("P", "PPLC"),
            None,
            None,
            Some(&xk),
        ));
        assert_eq!(doc.ancestors_names.as_deref(), Some("Kosovo (XK, XKX)"));
        assert_eq!(doc.continent, None);
    }

    #[test]
    fn test_top_level_record() {
        let doc = DocumentBuilder::new().build(&place(
            6255149,
            "North America",
            FeatureType::new("L", "CONT"),
            None,
            None,
            None,
        ));
        assert!(doc.top_level);
        assert_eq!(doc.ancestors_names, None);
        assert_eq!(doc.country, None);
        let names: Vec<_> = doc.stored_fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["GeonameId", "Class", "Code", "Population", "Latitude", "Longitude", "Name"]
        );
    }

    #[test]
    fn test_batch_skips_invalid_records() {
        let us = country("US", "USA", "United States", 6252001, Continent::NORTH_AMERICA);
        let ontario = admin("CA.ON", "Ontario", 6093943);
        let records = vec![
            place(1, "Springfield", FeatureType::new("P", "PPL"), None, None, Some(&us)),
            place(2, "Toronto", FeatureType::new("P", "PPL"), None, Some(&ontario), Some(&us)),
            place(3, " ", FeatureType::new("P", "PPL"), None, None, Some(&us)),
            place(4, "Antarctica", FeatureType::new("L", "CONT"), None, None, None),
        ];
        let batch = DocumentBuilder::new().build_batch(&records);
        assert_eq!(batch.attempted, 4);
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.top_level, 1);
        let ids: Vec<_> = batch.documents.iter().map(|d| d.geoname_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }
}
