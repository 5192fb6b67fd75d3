use std::path::Path;

use ahash::AHashMap as HashMap;
use itertools::izip;
use polars::prelude::*;
use tracing::debug;

use super::{Result, geonames_csv_reader};
use crate::{AdminDivision, DataError};

const FILE: &str = "admin codes";

const ADMIN_CODES_SCHEMA: [(PlSmallStr, DataType); 4] = [
    (PlSmallStr::from_static("code"), DataType::String),
    (PlSmallStr::from_static("name"), DataType::String),
    (PlSmallStr::from_static("asciiname"), DataType::String),
    (PlSmallStr::from_static("geonameId"), DataType::UInt32),
];

/// Reads `admin1CodesASCII.txt` or `admin2Codes.txt`; both share one layout.
pub fn get_admin_codes_df(path: impl AsRef<Path>) -> Result<LazyFrame> {
    Ok(geonames_csv_reader(path, &ADMIN_CODES_SCHEMA).finish()?)
}

pub fn load_admin_table(path: impl AsRef<Path>) -> Result<HashMap<String, AdminDivision>> {
    let df = get_admin_codes_df(path)?.collect()?;

    let code_series = df.column("code")?.str()?;
    let name_series = df.column("name")?.str()?;
    let asciiname_series = df.column("asciiname")?.str()?;
    let geoname_id_series = df.column("geonameId")?.u32()?;

    let mut divisions = HashMap::with_capacity(df.height());
    for (code, name, asciiname, gid) in
        izip!(code_series, name_series, asciiname_series, geoname_id_series)
    {
        let code = code.ok_or(DataError::MissingValue {
            file: FILE,
            column: "code",
        })?;
        let geoname_id = gid.ok_or(DataError::MissingValue {
            file: FILE,
            column: "geonameId",
        })?;
        let name = name.unwrap_or_default();
        divisions.insert(
            code.to_string(),
            AdminDivision {
                code: code.to_string(),
                name: name.to_string(),
                ascii_name: asciiname.unwrap_or(name).to_string(),
                geoname_id,
            },
        );
    }
    debug!(count = divisions.len(), "Admin divisions loaded");
    Ok(divisions)
}
