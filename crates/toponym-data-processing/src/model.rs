//! Typed gazetteer entities: continents, countries, admin divisions and the
//! place records built on top of them.

use serde::Serialize;
use thiserror::Error;

/// One of the seven GeoNames continents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Continent {
    pub id: i64,
    pub name: &'static str,
}

impl Continent {
    pub const AFRICA: Self = Self::new(6255146, "Africa");
    pub const ASIA: Self = Self::new(6255147, "Asia");
    pub const EUROPE: Self = Self::new(6255148, "Europe");
    pub const NORTH_AMERICA: Self = Self::new(6255149, "North America");
    pub const SOUTH_AMERICA: Self = Self::new(6255150, "South America");
    pub const OCEANIA: Self = Self::new(6255151, "Oceania");
    pub const ANTARCTICA: Self = Self::new(6255152, "Antarctica");

    /// Placeholder for countries whose continent code is not one of the seven.
    pub const UNKNOWN: Self = Self::new(-1, "");

    const fn new(id: i64, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Looks up a continent by its two-letter GeoNames code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "AF" => Some(Self::AFRICA),
            "AS" => Some(Self::ASIA),
            "EU" => Some(Self::EUROPE),
            "NA" => Some(Self::NORTH_AMERICA),
            "SA" => Some(Self::SOUTH_AMERICA),
            "OC" => Some(Self::OCEANIA),
            "AN" => Some(Self::ANTARCTICA),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.id >= 0
    }
}

/// A row of the GeoNames country table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    /// ISO 3166 alpha-2 code, the lookup key.
    pub iso: String,
    pub iso3: String,
    pub name: String,
    pub area: f64,
    pub population: i64,
    pub geoname_id: u32,
    pub continent: Continent,
}

/// A first- or second-level administrative division, keyed by a dotted
/// hierarchical code such as `US.IL` or `US.IL.167`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminDivision {
    pub code: String,
    pub name: String,
    pub ascii_name: String,
    pub geoname_id: u32,
}

impl AdminDivision {
    /// The segment following the country prefix: `IL` for `US.IL`.
    pub fn short_code(&self) -> Option<&str> {
        self.code.split('.').nth(1).filter(|s| !s.is_empty())
    }

    /// The country prefix: `US` for `US.IL`.
    pub fn country_code(&self) -> Option<&str> {
        self.code
            .split_once('.')
            .map(|(cc, _)| cc)
            .filter(|cc| !cc.is_empty())
    }
}

/// GeoNames feature class and code, e.g. `A`/`PCLI` for an independent country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureType {
    pub class: String,
    pub code: String,
}

impl FeatureType {
    pub fn new(class: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            code: code.into(),
        }
    }

    pub fn is_country(&self) -> bool {
        self.class == "A" && self.code == "PCLI"
    }

    pub fn is_first_order_admin(&self) -> bool {
        self.class == "A" && self.code == "ADM1"
    }
}

/// Why a place record was rejected before indexing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record {0} has an empty name")]
    EmptyName(u32),
    #[error("record {geoname_id} has a state code '{code}' that is not '<country>.<state>'")]
    MalformedStateCode { geoname_id: u32, code: String },
    #[error("record {geoname_id} has state '{code}' outside its country '{iso}'")]
    StateOutsideCountry {
        geoname_id: u32,
        code: String,
        iso: String,
    },
    #[error("record {0} references a country without ISO codes")]
    CountryWithoutIso(u32),
}

/// One gazetteer entry with its ancestor chain resolved against the
/// reference tables it borrows from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRecord<'t> {
    pub geoname_id: u32,
    pub name: String,
    pub ascii_name: String,
    pub feature: FeatureType,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub county: Option<&'t AdminDivision>,
    pub state: Option<&'t AdminDivision>,
    pub country: Option<&'t Country>,
}

impl PlaceRecord<'_> {
    /// Records without a country are continent-scale entities.
    pub fn is_top_level(&self) -> bool {
        self.country.is_none()
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyName(self.geoname_id));
        }
        if let Some(country) = self.country
            && (country.iso.is_empty() || country.iso3.is_empty())
        {
            return Err(RecordError::CountryWithoutIso(self.geoname_id));
        }
        if let Some(state) = self.state {
            let (Some(cc), Some(_)) = (state.country_code(), state.short_code()) else {
                return Err(RecordError::MalformedStateCode {
                    geoname_id: self.geoname_id,
                    code: state.code.clone(),
                });
            };
            if let Some(country) = self.country
                && country.iso != cc
            {
                return Err(RecordError::StateOutsideCountry {
                    geoname_id: self.geoname_id,
                    code: state.code.clone(),
                    iso: country.iso.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn illinois() -> AdminDivision {
        AdminDivision {
            code: "US.IL".into(),
            name: "Illinois".into(),
            ascii_name: "Illinois".into(),
            geoname_id: 4896861,
        }
    }

    fn united_states() -> Country {
        Country {
            iso: "US".into(),
            iso3: "USA".into(),
            name: "United States".into(),
            area: 9629091.0,
            population: 327167434,
            geoname_id: 6252001,
            continent: Continent::NORTH_AMERICA,
        }
    }

    fn record<'t>(state: Option<&'t AdminDivision>, country: Option<&'t Country>) -> PlaceRecord<'t> {
        PlaceRecord {
            geoname_id: 4250542,
            name: "Springfield".into(),
            ascii_name: "Springfield".into(),
            feature: FeatureType::new("P", "PPLA"),
            population: 116250,
            latitude: 39.80172,
            longitude: -89.64371,
            county: None,
            state,
            country,
        }
    }

    #[test]
    fn test_continent_codes() {
        assert_eq!(Continent::from_code("EU"), Some(Continent::EUROPE));
        assert_eq!(Continent::from_code("AN").map(|c| c.id), Some(6255152));
        assert_eq!(Continent::from_code("XX"), None);
        assert!(!Continent::UNKNOWN.is_known());
    }

    #[test]
    fn test_admin_short_code() {
        assert_eq!(illinois().short_code(), Some("IL"));
        assert_eq!(illinois().country_code(), Some("US"));

        let county = AdminDivision {
            code: "US.IL.167".into(),
            ..illinois()
        };
        assert_eq!(county.short_code(), Some("IL"));

        let broken = AdminDivision {
            code: "USIL".into(),
            ..illinois()
        };
        assert_eq!(broken.short_code(), None);
        assert_eq!(broken.country_code(), None);
    }

    #[test]
    fn test_feature_type_checks() {
        assert!(FeatureType::new("A", "PCLI").is_country());
        assert!(FeatureType::new("A", "ADM1").is_first_order_admin());
        assert!(!FeatureType::new("P", "PCLI").is_country());
    }

    #[test]
    fn test_validate_accepts_consistent_chain() {
        let state = illinois();
        let country = united_states();
        assert_eq!(record(Some(&state), Some(&country)).validate(), Ok(()));
        assert!(record(None, None).is_top_level());
    }

    #[test]
    fn test_validate_rejects_broken_chain() {
        let state = AdminDivision {
            code: "IL".into(),
            ..illinois()
        };
        let country = united_states();
        assert!(matches!(
            record(Some(&state), Some(&country)).validate(),
            Err(RecordError::MalformedStateCode { .. })
        ));

        let foreign = AdminDivision {
            code: "CA.ON".into(),
            ..illinois()
        };
        assert!(matches!(
            record(Some(&foreign), Some(&country)).validate(),
            Err(RecordError::StateOutsideCountry { .. })
        ));

        let no_iso = Country {
            iso3: String::new(),
            ..united_states()
        };
        assert_eq!(
            record(None, Some(&no_iso)).validate(),
            Err(RecordError::CountryWithoutIso(4250542))
        );

        let mut unnamed = record(None, None);
        unnamed.name = "  ".into();
        assert_eq!(unnamed.validate(), Err(RecordError::EmptyName(4250542)));
    }
}
