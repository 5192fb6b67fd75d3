//! Lookup tables and place-record assembly built from the raw files.

use ahash::AHashMap as HashMap;
use tracing::{info, instrument};

use super::error::Result;
use crate::model::{AdminDivision, Continent, Country};
use crate::raw::{RawDataPaths, load_admin_table, load_country_table};

mod place_records;

pub use place_records::{PlaceLoad, load_place_records};

/// Read-only lookups the rest of the system resolves ancestors against.
///
/// Constructed once at startup and passed by reference; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    countries: HashMap<String, Country>,
    admin1: HashMap<String, AdminDivision>,
    admin2: HashMap<String, AdminDivision>,
}

impl ReferenceTables {
    pub fn new(
        countries: impl IntoIterator<Item = Country>,
        admin1: impl IntoIterator<Item = AdminDivision>,
        admin2: impl IntoIterator<Item = AdminDivision>,
    ) -> Self {
        Self {
            countries: countries.into_iter().map(|c| (c.iso.clone(), c)).collect(),
            admin1: admin1.into_iter().map(|a| (a.code.clone(), a)).collect(),
            admin2: admin2.into_iter().map(|a| (a.code.clone(), a)).collect(),
        }
    }

    #[instrument(name = "Load reference tables", skip_all, level = "info")]
    pub fn load(paths: &RawDataPaths) -> Result<Self> {
        let tables = Self {
            countries: load_country_table(&paths.country_info)?,
            admin1: load_admin_table(&paths.admin1_codes)?,
            admin2: load_admin_table(&paths.admin2_codes)?,
        };
        info!(
            countries = tables.countries.len(),
            admin1 = tables.admin1.len(),
            admin2 = tables.admin2.len(),
            "Finished loading admin and country lookups"
        );
        Ok(tables)
    }

    pub fn country(&self, iso: &str) -> Option<&Country> {
        self.countries.get(iso)
    }

    pub fn admin1(&self, code: &str) -> Option<&AdminDivision> {
        self.admin1.get(code)
    }

    pub fn admin2(&self, code: &str) -> Option<&AdminDivision> {
        self.admin2.get(code)
    }

    pub fn continent(&self, code: &str) -> Option<Continent> {
        Continent::from_code(code)
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn admin1_count(&self) -> usize {
        self.admin1.len()
    }

    pub fn admin2_count(&self) -> usize {
        self.admin2.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::create_test_data;

    #[test]
    fn test_load_reference_tables() {
        let data = create_test_data().unwrap();
        let tables = ReferenceTables::load(&data.paths).unwrap();

        assert_eq!(tables.country_count(), 4);
        assert!(tables.admin1_count() >= 5);
        assert!(tables.admin2_count() >= 3);
        assert_eq!(tables.country("AE").map(|c| c.iso3.as_str()), Some("ARE"));
        assert_eq!(
            tables.admin1("US.MO").map(|a| a.name.as_str()),
            Some("Missouri")
        );
        assert_eq!(tables.continent("OC"), Some(Continent::OCEANIA));
        assert!(tables.country("ZZ").is_none());
    }

    #[test]
    fn test_new_keys_by_code() {
        let tables = ReferenceTables::new(
            [],
            [AdminDivision {
                code: "US.IL".into(),
                name: "Illinois".into(),
                ascii_name: "Illinois".into(),
                geoname_id: 4896861,
            }],
            [],
        );
        assert!(tables.admin1("US.IL").is_some());
        assert!(tables.admin2("US.IL").is_none());
    }
}
