use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use polars::prelude::*;
use tracing::{info, instrument, warn};

#[cfg(feature = "download_data")]
pub mod fetch;

pub(crate) mod admin_codes;
pub(crate) mod all_countries;
pub(crate) mod country_info;

pub use super::error::Result;
pub use admin_codes::load_admin_table;
pub use country_info::load_country_table;

const COUNTRY_INFO_FILE: &str = "countryInfo.txt";
const ADMIN1_CODES_FILE: &str = "admin1CodesASCII.txt";
const ADMIN2_CODES_FILE: &str = "admin2Codes.txt";

/// Which GeoNames place dump feeds the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceSource {
    /// Every GeoNames feature, roughly 13 million rows.
    AllCountries,
    #[default]
    Cities15000,
    Cities5000,
    Cities1000,
    Cities500,
}

impl PlaceSource {
    fn stem(self) -> &'static str {
        match self {
            Self::AllCountries => "allCountries",
            Self::Cities15000 => "cities15000",
            Self::Cities5000 => "cities5000",
            Self::Cities1000 => "cities1000",
            Self::Cities500 => "cities500",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.stem())
    }

    pub fn archive_url(self) -> String {
        format!("https://download.geonames.org/export/dump/{}.zip", self.stem())
    }
}

impl fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl FromStr for PlaceSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allcountries" | "all" => Ok(Self::AllCountries),
            "cities15000" => Ok(Self::Cities15000),
            "cities5000" => Ok(Self::Cities5000),
            "cities1000" => Ok(Self::Cities1000),
            "cities500" => Ok(Self::Cities500),
            other => Err(format!("unknown place source '{other}'")),
        }
    }
}

/// Locations of the four tab-separated inputs of an index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataPaths {
    pub country_info: PathBuf,
    pub admin1_codes: PathBuf,
    pub admin2_codes: PathBuf,
    pub places: PathBuf,
}

impl RawDataPaths {
    /// Standard GeoNames file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, source: PlaceSource) -> Self {
        let dir = dir.as_ref();
        Self {
            country_info: dir.join(COUNTRY_INFO_FILE),
            admin1_codes: dir.join(ADMIN1_CODES_FILE),
            admin2_codes: dir.join(ADMIN2_CODES_FILE),
            places: dir.join(source.file_name()),
        }
    }

    pub fn with_places(mut self, places: impl Into<PathBuf>) -> Self {
        self.places = places.into();
        self
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            &self.country_info,
            &self.admin1_codes,
            &self.admin2_codes,
            &self.places,
        ]
    }

    pub fn missing(&self) -> Vec<&Path> {
        self.all().into_iter().filter(|p| !p.exists()).collect()
    }
}

/// Locate the raw GeoNames files under `<DATA_DIR>/raw/`.
///
/// Missing files are downloaded when the `download_data` feature is enabled;
/// otherwise the first missing file is reported as an error.
#[instrument(name = "Get GeoNames raw data", level = "info")]
pub fn get_raw_data(source: PlaceSource) -> Result<RawDataPaths> {
    let raw_dir = crate::get_data_dir().join("raw");
    info!("Checking for raw data in: {}", raw_dir.display());
    let paths = RawDataPaths::in_dir(&raw_dir, source);

    let missing = paths.missing();
    if missing.is_empty() {
        info!("Found existing raw data files");
        return Ok(paths);
    }
    warn!(?missing, "Raw data files not found");

    #[cfg(feature = "download_data")]
    {
        info!("Attempting to download raw data as download_data feature is enabled.");
        fetch::download_raw_data(&paths, source)?;
        Ok(paths)
    }
    #[cfg(not(feature = "download_data"))]
    {
        warn!("Download_data feature is disabled. Cannot download missing files.");
        Err(crate::DataError::RequiredFileNotFound(
            missing[0].to_path_buf(),
        ))
    }
}

/// Tab-separated, header-less reader shared by every GeoNames file.
///
/// Quoting is disabled since names may contain bare `"` characters, and
/// `#` lines are comments.
pub(crate) fn geonames_csv_reader(
    path: impl AsRef<Path>,
    schema: &[(PlSmallStr, DataType)],
) -> LazyCsvReader {
    LazyCsvReader::new(path)
        .with_separator(b'\t')
        .with_has_header(false)
        .with_quote_char(None)
        .with_comment_prefix(Some(PlSmallStr::from_static("#")))
        .with_schema(Some(Schema::from_iter(schema.iter().cloned()).into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::create_test_data;
    use crate::tests_utils::write_lines;
    use crate::{Continent, DataError};

    #[test]
    fn test_load_country_table_skips_comments() {
        let data = create_test_data().unwrap();
        let countries = load_country_table(&data.paths.country_info).unwrap();

        assert_eq!(countries.len(), 4);
        let us = &countries["US"];
        assert_eq!(us.iso3, "USA");
        assert_eq!(us.name, "United States");
        assert_eq!(us.geoname_id, 6252001);
        assert_eq!(us.continent, Continent::NORTH_AMERICA);
        assert_eq!(countries["GB"].continent, Continent::EUROPE);
    }

    #[test]
    fn test_load_country_table_unknown_continent() {
        let file = write_lines(&[
            "XK\tXKX\t0\tKV\tKosovo\tPristina\t10908.0\t1845300\tZZ\t\tEUR\tEuro\t\t\t\tsq,sr\t831053\tRS,AL,MK,ME\t",
        ]);
        let countries = load_country_table(file.path()).unwrap();
        assert_eq!(countries["XK"].continent, Continent::UNKNOWN);
    }

    #[test]
    fn test_load_country_table_malformed_numeric_is_fatal() {
        let file = write_lines(&[
            "US\tUSA\t840\tUS\tUnited States\tWashington\tlots\t327167434\tNA\t.us\tUSD\tDollar\t1\t\t\ten-US\t6252001\tCA,MX\t",
        ]);
        let result = load_country_table(file.path());
        assert!(matches!(result, Err(DataError::Polars(_))));
    }

    #[test]
    fn test_load_admin_tables() {
        let data = create_test_data().unwrap();
        let admin1 = load_admin_table(&data.paths.admin1_codes).unwrap();
        let admin2 = load_admin_table(&data.paths.admin2_codes).unwrap();

        let illinois = &admin1["US.IL"];
        assert_eq!(illinois.name, "Illinois");
        assert_eq!(illinois.geoname_id, 4896861);
        assert_eq!(admin1["FR.11"].ascii_name, "Ile-de-France");
        assert_eq!(admin2["US.IL.167"].name, "Sangamon County");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_admin_table("/definitely/not/here/admin1CodesASCII.txt");
        assert!(result.is_err());
    }

    #[test]
    fn test_raw_data_paths_layout() {
        let paths = RawDataPaths::in_dir("/data/raw", PlaceSource::Cities500);
        assert_eq!(paths.places, PathBuf::from("/data/raw/cities500.txt"));
        assert_eq!(paths.admin1_codes, PathBuf::from("/data/raw/admin1CodesASCII.txt"));
        assert_eq!(paths.missing().len(), 4);
    }

    #[test]
    fn test_place_source_parsing() {
        assert_eq!("allCountries".parse(), Ok(PlaceSource::AllCountries));
        assert_eq!("cities1000".parse(), Ok(PlaceSource::Cities1000));
        assert!("villages".parse::<PlaceSource>().is_err());
        assert_eq!(
            PlaceSource::Cities15000.archive_url(),
            "https://download.geonames.org/export/dump/cities15000.zip"
        );
    }
}
