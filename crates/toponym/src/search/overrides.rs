use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap as HashMap;
use toponym_data_processing::DataError;
use tracing::{debug, info, instrument};

use super::Result;

/// Curated labels that resolve straight to a known `GeonameId`.
///
/// Keys are matched exactly (case-sensitive) against trimmed input.
#[derive(Debug, Clone, Default)]
pub struct OverrideMap {
    entries: HashMap<String, String>,
}

impl OverrideMap {
    /// Read a `label<TAB>geonameId` file. Lines that do not split into
    /// exactly two non-empty fields are skipped.
    #[instrument(name = "Load overrides", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DataError::RequiredFileNotFound(path.to_path_buf()).into());
        }
        let reader = BufReader::new(File::open(path).map_err(DataError::from)?);

        let mut entries = HashMap::new();
        let mut skipped = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(DataError::from)?;
            match parse_line(&line) {
                Some((label, id)) => {
                    entries.insert(label.to_string(), id.to_string());
                }
                None => {
                    debug!(line = line_no + 1, content = %line, "Skipping malformed override line");
                    skipped += 1;
                }
            }
        }
        info!(entries = entries.len(), skipped, "Loaded override map");
        Ok(Self { entries })
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OverrideMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into().trim().to_string(), v.into().trim().to_string()))
                .collect(),
        }
    }
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.trim().split('\t');
    let (label, id, rest) = (parts.next()?, parts.next()?, parts.next());
    let (label, id) = (label.trim(), id.trim());
    (rest.is_none() && !label.is_empty() && !id.is_empty()).then_some((label, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchError;
    use std::io::Write;

    #[test]
    fn test_load_skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "New York City\t5128581").unwrap();
        writeln!(file, "  Washington, D.C.\t4140963  ").unwrap();
        writeln!(file, "just a label").unwrap();
        writeln!(file, "too\tmany\tfields").unwrap();
        writeln!(file).unwrap();
        file.flush().unwrap();

        let overrides = OverrideMap::load(file.path()).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("New York City"), Some("5128581"));
        assert_eq!(overrides.get(" Washington, D.C. "), Some("4140963"));
        assert_eq!(overrides.get("new york city"), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverrideMap::load(dir.path().join("overrides.tsv")).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Overrides(DataError::RequiredFileNotFound(_))
        ));
    }

    #[test]
    fn test_from_iter_trims() {
        let overrides: OverrideMap = [(" USA ", "6252001")].into_iter().collect();
        assert_eq!(overrides.get("USA"), Some("6252001"));
        assert!(OverrideMap::default().is_empty());
    }
}
