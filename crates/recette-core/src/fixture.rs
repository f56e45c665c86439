//! Fixture corpus: route → ordered list of test cases
//!
//! ```yaml
//! /search:
//!   - request: "?q=8+bd+du+port&type=address"
//!     results:
//!       firstResult: {id: ABC123}
//!       nbResult: 1
//!   - request: "?q=xx&lat=200"
//!     results:
//!       error: {code: 400}
//! ```
//!
//! Only the document skeleton is validated here. Predicate values are kept
//! as raw JSON and judged by the assertion engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::assertion::PredicateKind;
use crate::route::Route;

/// Parsed fixture document, in document order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub groups: Vec<RouteCases>,
}

/// All cases declared under one route key.
#[derive(Debug, Clone)]
pub struct RouteCases {
    pub route: Route,
    pub cases: Vec<TestCase>,
}

/// One fixture entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub route: Route,
    /// Query string / path suffix appended to the route
    pub request: String,
    pub expected_status: ExpectedStatus,
    pub predicates: Predicates,
}

/// Fixture-level `status` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedStatus {
    #[default]
    Success,
    /// Known failure: the case is reported as skipped unless it carries an
    /// `error.code` check.
    Fail,
}

impl ExpectedStatus {
    fn from_fixture(value: Option<&str>) -> Self {
        match value {
            Some("fail") => Self::Fail,
            _ => Self::Success,
        }
    }
}

/// What the orchestrator does with a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Request must fail with exactly this HTTP status
    ClientError(u16),
    /// Known failure, not executed
    KnownFailure,
    /// Request must succeed and satisfy the predicates
    Results,
}

/// The `results` block of a fixture. Values stay raw until evaluation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicates {
    pub first_result: Option<Value>,
    pub only: Option<Value>,
    pub has_properties: Option<Value>,
    pub many: Option<Value>,
    pub including: Option<Value>,
    pub nb_result: Option<Value>,
    /// `{code: 400}` selects the error-path check
    pub error: Option<Value>,
    /// Keys that are not predicates (reported by the dry run)
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

impl Predicates {
    /// Configured predicates, in evaluation order.
    #[must_use]
    pub fn configured(&self) -> Vec<(PredicateKind, &Value)> {
        [
            (PredicateKind::FirstResult, &self.first_result),
            (PredicateKind::Only, &self.only),
            (PredicateKind::HasProperties, &self.has_properties),
            (PredicateKind::Many, &self.many),
            (PredicateKind::Including, &self.including),
            (PredicateKind::NbResult, &self.nb_result),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.as_ref().map(|v| (kind, v)))
        .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configured().is_empty()
    }

    /// HTTP status requested by `error.code`, if any.
    #[must_use]
    pub fn expected_error_code(&self) -> Option<u16> {
        self.error
            .as_ref()
            .and_then(|e| e.get("code"))
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }
}

impl TestCase {
    /// Stable case identifier: route followed by request.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}{}", self.route.path(), self.request)
    }

    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        self.route.url(base_url, &self.request)
    }

    /// An explicit `error.code` wins over `status: fail`.
    #[must_use]
    pub fn expectation(&self) -> Expectation {
        if let Some(code) = self.predicates.expected_error_code() {
            Expectation::ClientError(code)
        } else if self.expected_status == ExpectedStatus::Fail {
            Expectation::KnownFailure
        } else {
            Expectation::Results
        }
    }
}

#[derive(Deserialize)]
struct RawCase {
    request: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Option<Predicates>,
}

impl Corpus {
    /// Load a fixture document from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid corpus.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::Io(path.to_path_buf(), e.to_string()))?;
        let document = parse_document(path, &content)?;
        Self::from_value(document)
    }

    /// Build a corpus from an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError::Format`] if the root is not a mapping of routes
    /// to sequences, or [`CorpusError::Case`] if an entry is not a case.
    pub fn from_value(document: Value) -> Result<Self, CorpusError> {
        let Value::Object(routes) = document else {
            return Err(CorpusError::Format(format!(
                "document root must be a mapping of routes to case lists, got {}",
                type_name(&document)
            )));
        };

        let mut groups = Vec::with_capacity(routes.len());
        for (key, entries) in routes {
            let Value::Array(entries) = entries else {
                return Err(CorpusError::Format(format!(
                    "route '{key}' must map to a sequence of cases, got {}",
                    type_name(&entries)
                )));
            };

            let route = Route::parse(&key);
            let mut cases = Vec::with_capacity(entries.len());
            for (index, entry) in entries.into_iter().enumerate() {
                let raw: RawCase =
                    serde_json::from_value(entry).map_err(|e| CorpusError::Case {
                        route: key.clone(),
                        index,
                        message: e.to_string(),
                    })?;
                cases.push(TestCase {
                    route: route.clone(),
                    request: raw.request,
                    expected_status: ExpectedStatus::from_fixture(raw.status.as_deref()),
                    predicates: raw.results.unwrap_or_default(),
                });
            }
            groups.push(RouteCases { route, cases });
        }

        Ok(Self { groups })
    }

    /// Keep only the listed route keys. An empty list keeps everything.
    #[must_use]
    pub fn retain_routes(mut self, routes: &[String]) -> Self {
        if !routes.is_empty() {
            self.groups
                .retain(|g| routes.iter().any(|r| r == g.route.path()));
        }
        self
    }

    /// All cases, in document order.
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a fixture document from YAML or JSON.
///
/// Extension decides first (`.yaml`/`.yml`/`.json`), then content sniffing
/// (leading `{` → JSON, otherwise YAML).
fn parse_document(path: &Path, content: &str) -> Result<Value, CorpusError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let as_json = match ext.as_str() {
        "json" => true,
        "yaml" | "yml" => false,
        _ => content.trim_start().starts_with('{'),
    };

    if as_json {
        serde_json::from_str(content).map_err(|e| CorpusError::Parse(format!("Invalid JSON: {e}")))
    } else {
        serde_yml::from_str(content).map_err(|e| CorpusError::Parse(format!("Invalid YAML: {e}")))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Malformed corpus: {0}")]
    Format(String),
    #[error("Malformed case {route}[{index}]: {message}")]
    Case {
        route: String,
        index: usize,
        message: String,
    },
}
