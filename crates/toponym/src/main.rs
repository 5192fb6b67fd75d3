//! toponym - build and query a GeoNames gazetteer index
//!
//! - Build the index from the GeoNames dumps (downloaded on demand)
//!   $ toponym create --source cities15000
//!
//! - Build from files already on disk
//!   $ toponym create --data-dir ./raw --places ./raw/US.txt
//!
//! - Serve it over HTTP
//!   $ toponym serve --listen 0.0.0.0:8080 --overrides overrides.tsv
//!
//! - Resolve one location from the terminal
//!   $ toponym query "Springfield, Illinois, USA" --records 3
use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use toponym::{
    Gazetteer, OverrideMap, QueryPolicy, SearchConfigBuilder,
    data_processing::{PlaceSource, RawDataPaths, get_raw_data},
    init_logging, server,
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "toponym")]
#[command(about = "Resolve free-text place references against a GeoNames gazetteer")]
struct CliArgs {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value_t = Level::INFO)]
    log_level: Level,

    /// Index directory (defaults to <DATA_DIR>/tantivy_indexes/gazetteer)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index, replacing any previous build
    Create {
        /// Directory holding countryInfo.txt, admin1CodesASCII.txt and admin2Codes.txt.
        /// Without it the files are looked up (and fetched) under <DATA_DIR>/raw
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// GeoNames place dump to index
        #[arg(long, default_value_t = PlaceSource::default())]
        source: PlaceSource,

        /// Use this place file instead of the dump named by --source
        #[arg(long)]
        places: Option<PathBuf>,
    },
    /// Serve the index over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Resolve a single location and print the result as JSON
    Query {
        location: String,

        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    /// Tab-separated `label<TAB>geonameId` override file
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Maximum records per result
    #[arg(long, default_value_t = 1)]
    records: usize,

    /// Query policy: curated or keyword
    #[arg(long, default_value_t = QueryPolicy::default())]
    mode: QueryPolicy,

    /// Count every match rather than reporting -1 for full pages
    #[arg(long)]
    total: bool,
}

impl SearchArgs {
    fn open(&self, index_dir: PathBuf) -> anyhow::Result<Gazetteer> {
        let overrides = match &self.overrides {
            Some(path) => OverrideMap::load(path)
                .with_context(|| format!("loading overrides from {}", path.display()))?,
            None => OverrideMap::default(),
        };
        let config = SearchConfigBuilder::new()
            .policy(self.mode)
            .max_records(self.records)
            .count_total(self.total)
            .build();
        Ok(Gazetteer::open(index_dir, overrides, config)?)
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level)?;

    let index_dir = args.index_dir.unwrap_or_else(toponym::default_index_dir);

    match args.command {
        Commands::Create {
            data_dir,
            source,
            places,
        } => {
            let mut paths = match data_dir {
                Some(dir) => RawDataPaths::in_dir(dir, source),
                None => get_raw_data(source)?,
            };
            if let Some(places) = places {
                paths = paths.with_places(places);
            }
            let missing = paths.missing();
            if !missing.is_empty() {
                bail!("missing input files: {missing:?}");
            }
            let report = Gazetteer::create_from_raw(&paths, &index_dir)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Serve { listen, search } => {
            let gazetteer = search.open(index_dir)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(gazetteer, listen))?;
        }

        Commands::Query { location, search } => {
            let gazetteer = search.open(index_dir)?;
            let outcome = gazetteer.search_location(&location)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
