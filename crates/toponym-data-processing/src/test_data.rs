//! Small GeoNames-shaped fixture files for tests and examples.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::TempDir;
use tracing::info;

use super::error::Result;
use crate::raw::{PlaceSource, RawDataPaths};

/// Fixture files living in a temporary directory that is removed on drop.
#[derive(Debug)]
pub struct TestData {
    pub dir: TempDir,
    pub paths: RawDataPaths,
}

const COUNTRY_INFO_ROWS: [&str; 4] = [
    "US\tUSA\t840\tUS\tUnited States\tWashington\t9629091\t327167434\tNA\t.us\tUSD\tDollar\t1\t\t\ten-US,es-US\t6252001\tCA,MX\t",
    "GB\tGBR\t826\tUK\tUnited Kingdom\tLondon\t244820\t66488991\tEU\t.uk\tGBP\tPound\t44\t\t\ten-GB\t2635167\tIE\t",
    "AE\tARE\t784\tAE\tUnited Arab Emirates\tAbu Dhabi\t82880\t9630959\tAS\t.ae\tAED\tDirham\t971\t\t\tar-AE\t290557\tSA,OM\t",
    "FR\tFRA\t250\tFR\tFrance\tParis\t547030\t66987244\tEU\t.fr\tEUR\tEuro\t33\t\t\tfr-FR\t3017382\tCH,DE\t",
];

const ADMIN1_ROWS: [&str; 6] = [
    "US.IL\tIllinois\tIllinois\t4896861",
    "US.MO\tMissouri\tMissouri\t4398678",
    "US.MA\tMassachusetts\tMassachusetts\t6254926",
    "FR.11\tÎle-de-France\tIle-de-France\t3012874",
    "AE.03\tDubai\tDubai\t292224",
    "GB.ENG\tEngland\tEngland\t6269131",
];

const ADMIN2_ROWS: [&str; 5] = [
    "US.IL.167\tSangamon County\tSangamon County\t4250541",
    "US.MO.077\tGreene County\tGreene County\t4391812",
    "US.MA.013\tHampden County\tHampden County\t4938757",
    "FR.11.75\tParis\tParis\t2968815",
    "GB.ENG.GLA\tGreater London\tGreater London\t2648110",
];

/// (id, name, asciiname, lat, lon, class, code, country, admin1, admin2, population)
type PlaceRow = (
    u32,
    &'static str,
    &'static str,
    f64,
    f64,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
);

const PLACE_ROWS: [PlaceRow; 16] = [
    (6255149, "North America", "North America", 46.07323, -100.54688, "L", "CONT", "", "", "", 0),
    (6252001, "United States", "United States", 39.76, -98.5, "A", "PCLI", "US", "00", "", 327167434),
    (
        2635167,
        "United Kingdom of Great Britain and Northern Ireland",
        "United Kingdom of Great Britain and Northern Ireland",
        54.75844,
        -2.69531,
        "A",
        "PCLI",
        "GB",
        "00",
        "",
        66488991,
    ),
    (290557, "United Arab Emirates", "United Arab Emirates", 23.75, 54.5, "A", "PCLI", "AE", "00", "", 9630959),
    (3017382, "Republic of France", "Republic of France", 46.0, 2.0, "A", "PCLI", "FR", "00", "", 66987244),
    (4896861, "Illinois", "Illinois", 40.00032, -89.25037, "A", "ADM1", "US", "IL", "", 12830632),
    (4398678, "Missouri", "Missouri", 38.25031, -92.50046, "A", "ADM1", "US", "MO", "", 6126452),
    (6254926, "Massachusetts", "Massachusetts", 42.36565, -71.10832, "A", "ADM1", "US", "MA", "", 6547629),
    (3012874, "Île-de-France", "Ile-de-France", 48.5, 2.5, "A", "ADM1", "FR", "11", "", 12278210),
    (4250541, "Sangamon County", "Sangamon County", 39.75817, -89.65927, "A", "ADM2", "US", "IL", "167", 197465),
    (4250542, "Springfield", "Springfield", 39.80172, -89.64371, "P", "PPLA", "US", "IL", "167", 116250),
    (4409896, "Springfield", "Springfield", 37.21533, -93.29824, "P", "PPLA2", "US", "MO", "077", 169176),
    (4951788, "Springfield", "Springfield", 42.10148, -72.58981, "P", "PPLA2", "US", "MA", "013", 155929),
    (2988507, "Paris", "Paris", 48.85341, 2.3488, "P", "PPLC", "FR", "11", "75", 2138551),
    (292223, "Dubai", "Dubai", 25.07725, 55.30927, "P", "PPLA", "AE", "03", "", 1137347),
    (2643743, "London", "London", 51.50853, -0.12574, "P", "PPLC", "GB", "ENG", "GLA", 7556900),
];

/// Writes the four fixture files into a fresh temporary directory.
pub fn create_test_data() -> Result<TestData> {
    let dir = TempDir::new()?;
    let paths = RawDataPaths::in_dir(dir.path(), PlaceSource::AllCountries);
    info!(dir = ?dir.path(), "Creating test data");

    write_rows(
        &paths.country_info,
        ["# GeoNames country table fixture", "#ISO\tISO3\tISO-Numeric\tfips\tCountry"]
            .into_iter()
            .chain(COUNTRY_INFO_ROWS),
    )?;
    write_rows(&paths.admin1_codes, ADMIN1_ROWS)?;
    write_rows(&paths.admin2_codes, ADMIN2_ROWS)?;

    let place_lines: Vec<String> = PLACE_ROWS.iter().map(place_line).collect();
    write_rows(&paths.places, place_lines.iter().map(String::as_str))?;

    Ok(TestData { dir, paths })
}

fn place_line(row: &PlaceRow) -> String {
    let (id, name, ascii, lat, lon, class, code, cc, a1, a2, population) = *row;
    format!(
        "{id}\t{name}\t{ascii}\t\t{lat}\t{lon}\t{class}\t{code}\t{cc}\t\t{a1}\t{a2}\t\t\t{population}\t\t0\tUTC\t2024-01-01"
    )
}

fn write_rows<'a>(path: &Path, rows: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_files_exist() {
        let data = create_test_data().unwrap();
        assert!(data.paths.missing().is_empty());

        let places = std::fs::read_to_string(&data.paths.places).unwrap();
        assert_eq!(places.lines().count(), PLACE_ROWS.len());
        assert!(places.lines().all(|l| l.split('\t').count() == 19));
    }
}
