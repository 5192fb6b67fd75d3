use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::OverrideMap;
use crate::index::fields;

/// An expression that parses fine but can never match a document.
pub const SENTINEL_EXPRESSION: &str = "Name:NOTAVALIDLOCATIONNAME";

/// Which strategies [`QueryResolver`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPolicy {
    /// Override lookup, then hierarchical decomposition. Comma-free input
    /// only searches `Name` with the whole string.
    #[default]
    Curated,
    /// Hierarchical decomposition, then for comma-free multi-word input an
    /// OR of one `Name` clause per word. Overrides are not consulted.
    KeywordFallback,
}

impl FromStr for QueryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curated" => Ok(Self::Curated),
            "keyword" | "keyword_fallback" => Ok(Self::KeywordFallback),
            other => Err(format!(
                "unknown query policy '{other}', expected 'curated' or 'keyword'"
            )),
        }
    }
}

impl fmt::Display for QueryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Curated => write!(f, "curated"),
            Self::KeywordFallback => write!(f, "keyword"),
        }
    }
}

/// Builds query expressions from raw location text.
#[derive(Debug, Clone, Copy)]
pub struct QueryResolver<'a> {
    overrides: &'a OverrideMap,
    policy: QueryPolicy,
}

impl<'a> QueryResolver<'a> {
    pub fn new(overrides: &'a OverrideMap, policy: QueryPolicy) -> Self {
        Self { overrides, policy }
    }

    pub fn policy(&self) -> QueryPolicy {
        self.policy
    }

    /// Expressions to try in order. Never empty: when nothing usable is left
    /// of the input the result is [`SENTINEL_EXPRESSION`].
    #[instrument(name = "Resolve query", skip(self), fields(policy = %self.policy), level = "debug")]
    pub fn resolve(&self, input: &str) -> Vec<String> {
        let trimmed = input.trim();

        if self.policy == QueryPolicy::Curated
            && let Some(id) = self.overrides.get(trimmed)
        {
            debug!(id, "Override matched");
            return vec![clause(fields::GEONAME_ID, id)];
        }

        let mut strategies = Vec::with_capacity(2);
        strategies.extend(hierarchical_expression(trimmed));
        if self.policy == QueryPolicy::KeywordFallback {
            strategies.extend(keyword_expression(trimmed));
        }
        if strategies.is_empty() {
            strategies.push(SENTINEL_EXPRESSION.to_string());
        }
        debug!(?strategies, "Resolved query strategies");
        strategies
    }
}

fn clause(field: &str, value: &str) -> String {
    format!("{field}:\"{value}\"")
}

/// `"a, b, c"` becomes `Name:"a" AND AncestorsNames:"b" AND AncestorsNames:"c"`.
fn hierarchical_expression(input: &str) -> Option<String> {
    let mut parts = input.split(',').map(str::trim).filter(|p| !p.is_empty());
    let first = parts.next()?;
    let mut expr = clause(fields::NAME, first);
    for ancestor in parts {
        expr.push_str(" AND ");
        expr.push_str(&clause(fields::ANCESTORS_NAMES, ancestor));
    }
    Some(expr)
}

fn keyword_expression(input: &str) -> Option<String> {
    if input.contains(',') {
        return None;
    }
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    Some(
        words
            .into_iter()
            .map(|w| clause(fields::NAME, w))
            .join(" OR "),
    )
}
