use std::path::Path;

use polars::prelude::*;

use super::{Result, geonames_csv_reader};

const ALL_COUNTRIES_SCHEMA: [(PlSmallStr, DataType); 19] = [
    (PlSmallStr::from_static("geonameId"), DataType::String),
    (PlSmallStr::from_static("name"), DataType::String),
    (PlSmallStr::from_static("asciiname"), DataType::String),
    (PlSmallStr::from_static("alternatenames"), DataType::String),
    (PlSmallStr::from_static("latitude"), DataType::String),
    (PlSmallStr::from_static("longitude"), DataType::String),
    (PlSmallStr::from_static("feature_class"), DataType::String),
    (PlSmallStr::from_static("feature_code"), DataType::String),
    (PlSmallStr::from_static("admin0_code"), DataType::String),
    (PlSmallStr::from_static("cc2"), DataType::String),
    (PlSmallStr::from_static("admin1_code"), DataType::String),
    (PlSmallStr::from_static("admin2_code"), DataType::String),
    (PlSmallStr::from_static("admin3_code"), DataType::String),
    (PlSmallStr::from_static("admin4_code"), DataType::String),
    (PlSmallStr::from_static("population"), DataType::String),
    (PlSmallStr::from_static("elevation"), DataType::String),
    (PlSmallStr::from_static("dem"), DataType::String),
    (PlSmallStr::from_static("timezone"), DataType::String),
    (PlSmallStr::from_static("modification_date"), DataType::String),
];

/// Reads a GeoNames place dump (`allCountries.txt` or one of the `citiesNNN.txt` extracts).
///
/// Numeric columns stay as text so that one bad row cannot fail the whole
/// frame; they are parsed row by row in [`crate::load_place_records`].
pub fn get_all_countries_df(path: impl AsRef<Path>) -> Result<LazyFrame> {
    Ok(geonames_csv_reader(path, &ALL_COUNTRIES_SCHEMA)
        .finish()?
        .select([
            col("geonameId"),
            col("name"),
            col("asciiname"),
            col("latitude"),
            col("longitude"),
            col("feature_class"),
            col("feature_code"),
            col("admin0_code"),
            col("admin1_code"),
            col("admin2_code"),
            col("population"),
        ]))
}
