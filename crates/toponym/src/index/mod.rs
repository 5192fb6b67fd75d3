//! Tantivy-backed storage for gazetteer documents.
//!
//! The index has a single schema: exact-match key fields (identifiers,
//! feature codes, coordinates), an `i64` population field usable for
//! sorting, and a set of analyzed text fields that carry the place name and
//! its ancestor chain. Text fields are analyzed with a tokenizer registered
//! under [`TOKENIZER_NAME`] on both the build and the read side.
//!
//! Writing goes through an exclusive [`IndexWriteHandle`]; reading goes
//! through [`ReadSnapshot`]s, a fresh one per query.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use error::IndexError;
use error::Result;
use tantivy::{
    Index, IndexReader, IndexWriter, Order, ReloadPolicy, Searcher, TantivyDocument,
    collector::{Count, TopDocs},
    query::{AllQuery, Query, QueryParser},
    schema::{
        Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, SchemaBuilder,
        TextFieldIndexing, TextOptions, Value,
    },
    tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer},
};
use tracing::{debug, info, instrument, warn};

use crate::{document::IndexedDocument, gazetteer::BUILD_INFO_FILE};

/// Field names as they appear in query expressions and in returned records.
pub mod fields {
    pub const GEONAME_ID: &str = "GeonameId";
    pub const CLASS: &str = "Class";
    pub const CODE: &str = "Code";
    pub const POPULATION: &str = "Population";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const COUNTY: &str = "County";
    pub const STATE: &str = "State";
    pub const COUNTRY: &str = "Country";
    pub const CONTINENT: &str = "Continent";
    pub const ANCESTORS_NAMES: &str = "AncestorsNames";
    pub const NAME: &str = "Name";
}

/// Name the gazetteer analyzer is registered under.
pub const TOKENIZER_NAME: &str = "gazetteer";

/// Words dropped by the analyzer, both at index time and at query time.
pub const STOP_WORDS: [&str; 21] = [
    "a", "and", "are", "but", "by", "for", "if", "into", "not", "such", "that", "the", "their",
    "then", "there", "these", "they", "this", "was", "will", "with",
];

const WRITER_HEAP_BYTES: usize = 100_000_000;
const META_FILE: &str = "meta.json";
const MAX_TOKEN_LEN: usize = 60;

/// A stored document as returned to callers: field name to string value.
pub type FieldMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Key,
    Numeric,
    Text,
}

const FIELD_LAYOUT: [(&str, FieldKind); 12] = [
    (fields::GEONAME_ID, FieldKind::Key),
    (fields::CLASS, FieldKind::Key),
    (fields::CODE, FieldKind::Key),
    (fields::POPULATION, FieldKind::Numeric),
    (fields::LATITUDE, FieldKind::Key),
    (fields::LONGITUDE, FieldKind::Key),
    (fields::COUNTY, FieldKind::Text),
    (fields::STATE, FieldKind::Text),
    (fields::COUNTRY, FieldKind::Text),
    (fields::CONTINENT, FieldKind::Text),
    (fields::ANCESTORS_NAMES, FieldKind::Text),
    (fields::NAME, FieldKind::Text),
];

fn gazetteer_schema() -> Schema {
    let mut schema_builder = SchemaBuilder::new();

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default()
        .set_indexing_options(text_indexing)
        .set_stored();
    let population_options = NumericOptions::default()
        .set_stored()
        .set_indexed()
        .set_fast();

    for (name, kind) in FIELD_LAYOUT {
        match kind {
            FieldKind::Key => schema_builder.add_text_field(name, STRING | STORED),
            FieldKind::Numeric => schema_builder.add_i64_field(name, population_options.clone()),
            FieldKind::Text => schema_builder.add_text_field(name, text_options.clone()),
        };
    }
    schema_builder.build()
}

fn gazetteer_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(
            STOP_WORDS.iter().map(|w| (*w).to_string()),
        ))
        .build()
}

fn register_analyzer(index: &Index) {
    index
        .tokenizers()
        .register(TOKENIZER_NAME, gazetteer_analyzer());
}

/// An existing `path` may be wiped only if it is an empty directory or the
/// output of an earlier build.
fn is_replaceable(path: &Path) -> std::io::Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    if path.join(META_FILE).exists() || path.join(BUILD_INFO_FILE).exists() {
        return Ok(true);
    }
    Ok(std::fs::read_dir(path)?.next().is_none())
}

/// Resolved handles for every field of the schema.
#[derive(Debug, Clone)]
struct IndexFields {
    by_position: Vec<(&'static str, FieldKind, Field)>,
}

impl IndexFields {
    fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        let by_position = FIELD_LAYOUT
            .iter()
            .map(|&(name, kind)| Ok((name, kind, schema.get_field(name)?)))
            .collect::<tantivy::Result<Vec<_>>>()?;
        Ok(Self { by_position })
    }

    fn get(&self, name: &str) -> Option<Field> {
        self.by_position
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, f)| *f)
    }

    fn to_field_map(&self, doc: &TantivyDocument) -> FieldMap {
        self.by_position
            .iter()
            .filter_map(|&(name, kind, field)| {
                let value = doc.get_first(field)?;
                let rendered = match kind {
                    FieldKind::Numeric => value.as_i64().map(|v| v.to_string()),
                    FieldKind::Key | FieldKind::Text => value.as_str().map(str::to_string),
                }?;
                Some((name.to_string(), rendered))
            })
            .collect()
    }
}

/// Entry points for building and opening the on-disk index.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStore;

impl IndexStore {
    /// Start a fresh build at `path`.
    ///
    /// A previous build at `path` is removed first, so repeated builds from
    /// the same input yield the same content. A directory holding anything
    /// other than an index is left alone and reported as
    /// [`IndexError::ForeignDirectory`]. The returned handle is the only
    /// writer; dropping it without [`IndexWriteHandle::close`] discards the
    /// uncommitted documents.
    #[instrument(name = "Open index for build", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_for_build(path: impl AsRef<Path>) -> Result<IndexWriteHandle> {
        let path = path.as_ref();
        if path.exists() {
            if !is_replaceable(path)? {
                return Err(IndexError::ForeignDirectory {
                    path: path.to_path_buf(),
                });
            }
            info!("Removing existing index directory");
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;

        let index = Index::create_in_dir(path, gazetteer_schema())?;
        register_analyzer(&index);
        let fields = IndexFields::from_schema(&index.schema())?;
        let writer: IndexWriter = index.writer(WRITER_HEAP_BYTES)?;

        Ok(IndexWriteHandle {
            writer,
            fields,
            path: path.to_path_buf(),
            added: 0,
        })
    }

    /// Open an existing index for querying.
    ///
    /// Fails with [`IndexError::Unavailable`] when nothing was built at
    /// `path` or what is there does not carry the gazetteer schema.
    #[instrument(name = "Open index for read", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_for_read(path: impl AsRef<Path>) -> Result<GazetteerIndex> {
        let path = path.as_ref();
        let unavailable = |reason: String| IndexError::Unavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.join(META_FILE).exists() {
            return Err(unavailable("no index has been built here".into()));
        }
        let index = Index::open_in_dir(path).map_err(|e| unavailable(e.to_string()))?;
        register_analyzer(&index);
        let fields = IndexFields::from_schema(&index.schema())
            .map_err(|e| unavailable(format!("incompatible schema: {e}")))?;
        let name_field = fields
            .get(fields::NAME)
            .ok_or_else(|| unavailable("incompatible schema: no Name field".into()))?;
        let parser = QueryParser::for_index(&index, vec![name_field]);

        Ok(GazetteerIndex {
            index,
            fields,
            parser,
            path: path.to_path_buf(),
        })
    }
}

/// Exclusive write access to an index being built.
pub struct IndexWriteHandle {
    writer: IndexWriter,
    fields: IndexFields,
    path: PathBuf,
    added: usize,
}

impl std::fmt::Debug for IndexWriteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriteHandle")
            .field("path", &self.path)
            .field("added", &self.added)
            .finish()
    }
}

impl IndexWriteHandle {
    pub fn add(&mut self, document: &IndexedDocument) -> Result<()> {
        let mut doc = TantivyDocument::default();
        for (name, value) in document.stored_fields() {
            let Some(field) = self.fields.get(name) else {
                continue;
            };
            if name == fields::POPULATION {
                doc.add_i64(field, document.population);
            } else {
                doc.add_text(field, &value);
            }
        }
        self.writer.add_document(doc)?;
        self.added += 1;
        Ok(())
    }

    pub fn added(&self) -> usize {
        self.added
    }

    /// Commit everything added so far and release the writer.
    #[instrument(name = "Commit index", skip_all, fields(path = %self.path.display(), docs = self.added))]
    pub fn close(self) -> Result<usize> {
        let mut writer = self.writer;
        writer.commit()?;
        writer.wait_merging_threads()?;
        info!("Index committed");
        Ok(self.added)
    }
}

/// An opened, read-only gazetteer index.
#[derive(Clone)]
pub struct GazetteerIndex {
    index: Index,
    fields: IndexFields,
    parser: QueryParser,
    path: PathBuf,
}

impl std::fmt::Debug for GazetteerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazetteerIndex")
            .field("path", &self.path)
            .finish()
    }
}

impl GazetteerIndex {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A point-in-time view of the committed index.
    pub fn snapshot(&self) -> Result<ReadSnapshot<'_>> {
        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(ReadSnapshot {
            searcher: reader.searcher(),
            owner: self,
        })
    }

    pub fn num_docs(&self) -> Result<u64> {
        Ok(self.snapshot()?.searcher.num_docs())
    }

    /// Any one stored document, used to report the field layout at startup.
    pub fn sample_document(&self) -> Result<Option<FieldMap>> {
        let snapshot = self.snapshot()?;
        let top = snapshot
            .searcher
            .search(&AllQuery, &TopDocs::with_limit(1))?;
        top.first()
            .map(|(_, address)| snapshot.load(*address))
            .transpose()
    }
}

/// How hits are ordered before the limit is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    pub field: &'static str,
    pub descending: bool,
}

impl SortBy {
    pub fn population_desc() -> Self {
        Self {
            field: fields::POPULATION,
            descending: true,
        }
    }
}

/// Result of one query: the returned documents and how many matched overall.
#[derive(Debug, Clone, Default)]
pub struct QueryHits {
    pub matches: Vec<FieldMap>,
    pub total: usize,
}

/// Searcher over a fixed set of committed segments.
pub struct ReadSnapshot<'a> {
    searcher: Searcher,
    owner: &'a GazetteerIndex,
}

impl ReadSnapshot<'_> {
    fn parse(&self, expr: &str) -> Result<Box<dyn Query>> {
        self.owner
            .parser
            .parse_query(expr)
            .map_err(|source| IndexError::InvalidQuery {
                query: expr.to_string(),
                source,
            })
    }

    fn load(&self, address: tantivy::DocAddress) -> Result<FieldMap> {
        let doc = self.searcher.doc::<TantivyDocument>(address)?;
        Ok(self.owner.fields.to_field_map(&doc))
    }

    /// Run `expr` and return up to `limit` documents, optionally sorted on a
    /// numeric fast field, together with the total match count.
    #[instrument(name = "Query index", skip(self), level = "debug")]
    pub fn query(&self, expr: &str, limit: usize, sort: Option<&SortBy>) -> Result<QueryHits> {
        let query = self.parse(expr)?;

        if limit == 0 {
            let total = self.searcher.search(&*query, &Count)?;
            return Ok(QueryHits {
                matches: Vec::new(),
                total,
            });
        }

        let t_search = std::time::Instant::now();
        let (total, addresses) = match sort {
            Some(sort) => {
                let order = if sort.descending {
                    Order::Desc
                } else {
                    Order::Asc
                };
                let top = TopDocs::with_limit(limit).order_by_fast_field::<i64>(sort.field, order);
                let (total, docs) = self.searcher.search(&*query, &(Count, top))?;
                (total, docs.into_iter().map(|(_, a)| a).collect::<Vec<_>>())
            }
            None => {
                let top = TopDocs::with_limit(limit);
                let (total, docs) = self.searcher.search(&*query, &(Count, top))?;
                (total, docs.into_iter().map(|(_, a)| a).collect::<Vec<_>>())
            }
        };
        debug!(
            total,
            returned = addresses.len(),
            search_execution_seconds = t_search.elapsed().as_secs_f32(),
            "Tantivy search execution complete"
        );

        let matches = addresses
            .into_iter()
            .map(|address| self.load(address))
            .collect::<Result<Vec<_>>>()?;
        if matches.iter().any(|m| m.is_empty()) {
            warn!(expr, "Retrieved a document without stored fields");
        }
        Ok(QueryHits { matches, total })
    }

    /// Number of documents matching `expr`.
    pub fn count(&self, expr: &str) -> Result<usize> {
        let query = self.parse(expr)?;
        Ok(self.searcher.search(&*query, &Count)?)
    }
}

mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("Index unavailable at {}: {reason}", path.display())]
        Unavailable { path: PathBuf, reason: String },
        #[error("Refusing to build over {}: it is neither empty nor a gazetteer index", path.display())]
        ForeignDirectory { path: PathBuf },
        #[error("Invalid query '{query}': {source}")]
        InvalidQuery {
            query: String,
            source: tantivy::query::QueryParserError,
        },
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
    }
    pub type Result<T> = std::result::Result<T, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::tokenizer::TokenStream;

    fn tokens(text: &str) -> Vec<String> {
        let mut analyzer = gazetteer_analyzer();
        let mut stream = analyzer.token_stream(text);
        let mut out = Vec::new();
        while let Some(token) = stream.next() {
            out.push(token.text.clone());
        }
        out
    }

    #[test]
    fn test_analyzer_lowercases_and_drops_stop_words() {
        assert_eq!(
            tokens("The Republic of France"),
            vec!["republic", "of", "france"]
        );
        assert_eq!(
            tokens("Illinois (IL), United States (US, USA)"),
            vec!["illinois", "il", "united", "states", "us", "usa"]
        );
        assert!(tokens("this and that").is_empty());
    }

    #[test]
    fn test_schema_layout() {
        let schema = gazetteer_schema();
        for (name, _) in FIELD_LAYOUT {
            assert!(schema.get_field(name).is_ok(), "missing field {name}");
        }
        let population = schema.get_field(fields::POPULATION).unwrap();
        assert!(schema.get_field_entry(population).is_fast());
        assert!(schema.get_field_entry(population).is_stored());
    }

    #[test]
    fn test_build_leaves_foreign_directory_alone() {
        let dir = tempfile::tempdir().unwrap();
        let precious = dir.path().join("precious.txt");
        std::fs::write(&precious, "keep me").unwrap();

        let err = IndexStore::open_for_build(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::ForeignDirectory { .. }));
        assert_eq!(std::fs::read_to_string(&precious).unwrap(), "keep me");

        let file_err = IndexStore::open_for_build(&precious).unwrap_err();
        assert!(matches!(file_err, IndexError::ForeignDirectory { .. }));
    }

    #[test]
    fn test_build_replaces_empty_dir_and_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        IndexStore::open_for_build(dir.path()).unwrap().close().unwrap();
        assert!(dir.path().join(META_FILE).exists());

        std::fs::write(dir.path().join(BUILD_INFO_FILE), "{}").unwrap();
        let handle = IndexStore::open_for_build(dir.path()).unwrap();
        assert_eq!(handle.close().unwrap(), 0);
        assert!(!dir.path().join(BUILD_INFO_FILE).exists());
    }

    #[test]
    fn test_open_for_read_without_build_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexStore::open_for_read(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Unavailable { .. }));
    }
}
