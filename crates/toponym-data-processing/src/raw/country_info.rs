use std::path::Path;

use ahash::AHashMap as HashMap;
use itertools::izip;
use polars::prelude::*;
use tracing::{debug, warn};

use super::{Result, geonames_csv_reader};
use crate::{Continent, Country, DataError};

const FILE: &str = "countryInfo.txt";

const COUNTRY_INFO_SCHEMA: [(PlSmallStr, DataType); 19] = [
    (PlSmallStr::from_static("ISO"), DataType::String),
    (PlSmallStr::from_static("ISO3"), DataType::String),
    (PlSmallStr::from_static("ISO_Numeric"), DataType::String),
    (PlSmallStr::from_static("fips"), DataType::String),
    (PlSmallStr::from_static("Country"), DataType::String),
    (PlSmallStr::from_static("Capital"), DataType::String),
    (PlSmallStr::from_static("Area"), DataType::Float64),
    (PlSmallStr::from_static("Population"), DataType::Int64),
    (PlSmallStr::from_static("Continent"), DataType::String),
    (PlSmallStr::from_static("tld"), DataType::String),
    (PlSmallStr::from_static("CurrencyCode"), DataType::String),
    (PlSmallStr::from_static("CurrencyName"), DataType::String),
    (PlSmallStr::from_static("Phone"), DataType::String),
    (
        PlSmallStr::from_static("Postal_Code_Format"),
        DataType::String,
    ),
    (
        PlSmallStr::from_static("Postal_Code_Regex"),
        DataType::String,
    ),
    (PlSmallStr::from_static("Languages"), DataType::String),
    (PlSmallStr::from_static("geonameId"), DataType::UInt32),
    (PlSmallStr::from_static("neighbours"), DataType::String),
    (
        PlSmallStr::from_static("EquivalentFipsCode"),
        DataType::String,
    ),
];

pub fn get_country_info_df(path: impl AsRef<Path>) -> Result<LazyFrame> {
    Ok(geonames_csv_reader(path, &COUNTRY_INFO_SCHEMA)
        .finish()?
        .select([
            col("ISO"),
            col("ISO3"),
            col("Country"),
            col("Area"),
            col("Population"),
            col("Continent"),
            col("geonameId"),
        ]))
}

/// Builds the country lookup keyed by ISO alpha-2 code.
pub fn load_country_table(path: impl AsRef<Path>) -> Result<HashMap<String, Country>> {
    let df = get_country_info_df(path)?.collect()?;

    let iso_series = df.column("ISO")?.str()?;
    let iso3_series = df.column("ISO3")?.str()?;
    let name_series = df.column("Country")?.str()?;
    let area_series = df.column("Area")?.f64()?;
    let population_series = df.column("Population")?.i64()?;
    let continent_series = df.column("Continent")?.str()?;
    let geoname_id_series = df.column("geonameId")?.u32()?;

    let mut countries = HashMap::with_capacity(df.height());
    for (iso, iso3, name, area, population, continent_code, gid) in izip!(
        iso_series,
        iso3_series,
        name_series,
        area_series,
        population_series,
        continent_series,
        geoname_id_series
    ) {
        let iso = iso.ok_or(DataError::MissingValue {
            file: FILE,
            column: "ISO",
        })?;
        let geoname_id = gid.ok_or(DataError::MissingValue {
            file: FILE,
            column: "geonameId",
        })?;
        let continent = match continent_code.and_then(Continent::from_code) {
            Some(continent) => continent,
            None => {
                warn!(iso, continent_code = ?continent_code, "Unknown continent code");
                Continent::UNKNOWN
            }
        };
        countries.insert(
            iso.to_string(),
            Country {
                iso: iso.to_string(),
                iso3: iso3.unwrap_or_default().to_string(),
                name: name.unwrap_or_default().to_string(),
                area: area.unwrap_or_default(),
                population: population.unwrap_or_default(),
                geoname_id,
                continent,
            },
        );
    }
    debug!(count = countries.len(), "Countries loaded");
    Ok(countries)
}
