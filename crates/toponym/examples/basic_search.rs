//! Basic gazetteer usage
//!
//! This example builds a small index from fixture files and runs a few
//! location searches against it:
//! - hierarchical input with comma-separated ancestors
//! - ambiguous names ranked by population
//! - the keyword policy for comma-free multi-word input

use toponym::{
    Gazetteer, OverrideMap, QueryPolicy, SearchConfigBuilder, SearchOutcome,
    data_processing::create_test_data,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data = create_test_data()?;
    let index_dir = tempfile::tempdir()?;
    let report = Gazetteer::create_from_raw(&data.paths, index_dir.path())?;
    println!("Indexed {} of {} records", report.indexed, report.attempted);

    let config = SearchConfigBuilder::curated().max_records(3).build();
    let gazetteer = Gazetteer::open(index_dir.path(), OverrideMap::default(), config)?;

    println!("\nSearching for 'Springfield, Illinois, USA':");
    print_outcome(&gazetteer.search_location("Springfield, Illinois, USA")?);

    println!("\nSearching for 'Springfield':");
    print_outcome(&gazetteer.search_location("Springfield")?);

    println!("\nKeyword search for 'Springfield Illinois':");
    print_outcome(&gazetteer.search_location_with(
        "Springfield Illinois",
        3,
        QueryPolicy::KeywordFallback,
    )?);

    Ok(())
}

fn print_outcome(outcome: &SearchOutcome) {
    for (i, record) in outcome.records.iter().enumerate() {
        println!(
            "  {}. {} [{}] - Population: {}, Ancestors: {}",
            i + 1,
            record.get("Name").map_or("Unknown", String::as_str),
            record.get("GeonameId").map_or("?", String::as_str),
            record.get("Population").map_or("0", String::as_str),
            record.get("AncestorsNames").map_or("-", String::as_str),
        );
    }
    println!(
        "  {} returned, {} available",
        outcome.returned_count, outcome.total_available
    );
}
