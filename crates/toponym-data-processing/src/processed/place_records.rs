use std::path::Path;
use std::str::FromStr;

use itertools::izip;
use tracing::{debug, info, instrument, warn};

use super::ReferenceTables;
use crate::error::Result;
use crate::model::{FeatureType, PlaceRecord};
use crate::raw::all_countries::get_all_countries_df;

/// Place records read from a dump, plus how many rows could not be used.
#[derive(Debug, Clone, Default)]
pub struct PlaceLoad<'t> {
    pub records: Vec<PlaceRecord<'t>>,
    /// Rows without an id or a name, or with a numeric field that does not parse.
    pub malformed_rows: usize,
}

/// Reads a GeoNames place dump and resolves each row's county, state and
/// country against `tables`.
#[instrument(name = "Load place records", skip_all, fields(path = %path.as_ref().display()), level = "info")]
pub fn load_place_records<'t>(
    path: impl AsRef<Path>,
    tables: &'t ReferenceTables,
) -> Result<PlaceLoad<'t>> {
    let df = get_all_countries_df(path.as_ref())?.collect()?;

    let geoname_id_series = df.column("geonameId")?.str()?;
    let name_series = df.column("name")?.str()?;
    let asciiname_series = df.column("asciiname")?.str()?;
    let latitude_series = df.column("latitude")?.str()?;
    let longitude_series = df.column("longitude")?.str()?;
    let class_series = df.column("feature_class")?.str()?;
    let code_series = df.column("feature_code")?.str()?;
    let admin0_series = df.column("admin0_code")?.str()?;
    let admin1_series = df.column("admin1_code")?.str()?;
    let admin2_series = df.column("admin2_code")?.str()?;
    let population_series = df.column("population")?.str()?;

    let mut load = PlaceLoad {
        records: Vec::with_capacity(df.height()),
        malformed_rows: 0,
    };
    let mut unresolved_states = 0usize;

    for (gid, name, asciiname, lat, lon, class, code, cc, a1, a2, population) in izip!(
        geoname_id_series,
        name_series,
        asciiname_series,
        latitude_series,
        longitude_series,
        class_series,
        code_series,
        admin0_series,
        admin1_series,
        admin2_series,
        population_series
    ) {
        let (Some(geoname_id), Some(name)) = (gid.and_then(|g| g.trim().parse::<u32>().ok()), name)
        else {
            load.malformed_rows += 1;
            continue;
        };
        let (Some(latitude), Some(longitude), Some(population)) = (
            parse_or_default::<f64>(lat),
            parse_or_default::<f64>(lon),
            parse_or_default::<i64>(population),
        ) else {
            warn!(geoname_id, name, "Skipping place row with unparseable numeric field");
            load.malformed_rows += 1;
            continue;
        };

        let country = cc.and_then(|cc| tables.country(cc));
        let state = match (cc, a1) {
            (Some(cc), Some(a1)) => {
                let state = tables.admin1(&format!("{cc}.{a1}"));
                if state.is_none() && a1 != "00" {
                    unresolved_states += 1;
                }
                state
            }
            _ => None,
        };
        let county = match (cc, a1, a2) {
            (Some(cc), Some(a1), Some(a2)) => tables.admin2(&format!("{cc}.{a1}.{a2}")),
            _ => None,
        };

        load.records.push(PlaceRecord {
            geoname_id,
            name: name.to_string(),
            ascii_name: asciiname.unwrap_or(name).to_string(),
            feature: FeatureType::new(class.unwrap_or_default(), code.unwrap_or_default()),
            population,
            latitude,
            longitude,
            county,
            state,
            country,
        });
    }

    if load.malformed_rows > 0 {
        warn!(
            malformed_rows = load.malformed_rows,
            "Skipped malformed place rows"
        );
    }
    debug!(unresolved_states, "Rows whose admin1 code had no lookup entry");
    info!(records = load.records.len(), "Place records loaded");
    Ok(load)
}

/// Empty cells read as the type's default; `None` means the cell holds text
/// that is not a `T`.
fn parse_or_default<T: FromStr + Default>(raw: Option<&str>) -> Option<T> {
    match raw.map(str::trim) {
        None | Some("") => Some(T::default()),
        Some(value) => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::create_test_data;
    use crate::tests_utils::write_lines;

    #[test]
    fn test_ancestors_are_resolved() {
        let data = create_test_data().unwrap();
        let tables = ReferenceTables::load(&data.paths).unwrap();
        let load = load_place_records(&data.paths.places, &tables).unwrap();

        assert_eq!(load.malformed_rows, 0);
        let springfield = load
            .records
            .iter()
            .find(|r| r.name == "Springfield" && r.state.is_some_and(|s| s.code == "US.IL"))
            .expect("Springfield, Illinois should be loaded");
        assert_eq!(springfield.county.map(|c| c.name.as_str()), Some("Sangamon County"));
        assert_eq!(springfield.country.map(|c| c.iso.as_str()), Some("US"));
        assert_eq!(springfield.population, 116250);

        let continent = load
            .records
            .iter()
            .find(|r| r.feature.code == "CONT")
            .expect("continent row should be loaded");
        assert!(continent.is_top_level());
    }

    #[test]
    fn test_rows_without_name_are_counted() {
        let data = create_test_data().unwrap();
        let tables = ReferenceTables::load(&data.paths).unwrap();
        let file = write_lines(&[
            "1\tSomewhere\tSomewhere\t\t1.0\t2.0\tP\tPPL\tUS\t\tIL\t\t\t\t10\t\t0\tAmerica/Chicago\t2020-01-01",
            "2\t\t\t\t1.0\t2.0\tP\tPPL\tUS\t\tIL\t\t\t\t10\t\t0\tAmerica/Chicago\t2020-01-01",
        ]);
        let load = load_place_records(file.path(), &tables).unwrap();
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.malformed_rows, 1);
        assert_eq!(load.records[0].state.map(|s| s.name.as_str()), Some("Illinois"));
        assert!(load.records[0].county.is_none());
    }

    #[test]
    fn test_unparseable_numbers_skip_only_their_row() {
        let data = create_test_data().unwrap();
        let tables = ReferenceTables::load(&data.paths).unwrap();
        let valid = load_place_records(&data.paths.places, &tables).unwrap();

        let mut contents = std::fs::read_to_string(&data.paths.places).unwrap();
        contents.push_str(
            "9\tBadPopulation\tBadPopulation\t\t1.0\t2.0\tP\tPPL\tUS\t\tIL\t\t\t\tnot_a_number\t\t0\tAmerica/Chicago\t2020-01-01\n",
        );
        contents.push_str(
            "10\tBadLatitude\tBadLatitude\t\tnorth\t2.0\tP\tPPL\tUS\t\tIL\t\t\t\t5\t\t0\tAmerica/Chicago\t2020-01-01\n",
        );
        contents.push_str(
            "eleven\tBadId\tBadId\t\t1.0\t2.0\tP\tPPL\tUS\t\tIL\t\t\t\t5\t\t0\tAmerica/Chicago\t2020-01-01\n",
        );
        std::fs::write(&data.paths.places, contents).unwrap();

        let load = load_place_records(&data.paths.places, &tables).unwrap();
        assert_eq!(load.malformed_rows, 3);
        assert_eq!(load.records.len(), valid.records.len());
        assert!(load.records.iter().all(|r| !r.name.starts_with("Bad")));
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or_default::<i64>(None), Some(0));
        assert_eq!(parse_or_default::<i64>(Some("")), Some(0));
        assert_eq!(parse_or_default::<i64>(Some(" 42 ")), Some(42));
        assert_eq!(parse_or_default::<f64>(Some("-12.5")), Some(-12.5));
        assert_eq!(parse_or_default::<i64>(Some("not_a_number")), None);
    }
}
