//! Dry run plan types and corpus validation
//!
//! Describes what a run *would* do without sending any requests.
//! Used for pre-flight validation and CI previews.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Config;
use crate::fixture::{Corpus, Expectation, ExpectedStatus};

// ── Plan types ──

/// Complete dry run plan: cases, counts, and validation results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DryRunPlan {
    /// Resolved base URL, if any source provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-case plan, in corpus order
    pub cases: Vec<CasePlan>,
    /// Cases in the corpus
    pub total_cases: usize,
    /// Cases that would send a request
    pub executable: usize,
    /// Known failures that would be skipped
    pub skipped: usize,
    /// Config/corpus validation results
    pub validations: Vec<Validation>,
}

/// Plan for a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CasePlan {
    /// Route followed by request, e.g. "/search?q=paris"
    pub identifier: String,
    /// Full URL (absent when no base URL is configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// "results", "error 400", or "skip"
    pub expectation: String,
    /// Configured predicate names
    pub predicates: Vec<String>,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

impl Validation {
    fn new(check: &str, status: ValidationStatus, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status,
            message: message.into(),
        }
    }
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ── Config validation ──

/// Patterns that suggest a placeholder value rather than a real credential.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-api-key",
    "YOUR_API_KEY",
    "your-token",
    "YOUR_TOKEN",
    "CHANGEME",
    "changeme",
    "placeholder",
    "REPLACE_ME",
];

/// Validate config and produce validation results.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<Validation> {
    let mut checks = Vec::new();

    if config.fixtures.exists() {
        checks.push(Validation::new(
            "fixtures",
            ValidationStatus::Ok,
            format!("fixtures: {} (exists)", config.fixtures.display()),
        ));
    } else {
        checks.push(Validation::new(
            "fixtures",
            ValidationStatus::Error,
            format!("fixtures: {} (not found)", config.fixtures.display()),
        ));
    }

    if config.timeout_secs == 0 {
        checks.push(Validation::new(
            "timeout",
            ValidationStatus::Error,
            "timeout_secs: 0 (every request would time out)",
        ));
    } else {
        checks.push(Validation::new(
            "timeout",
            ValidationStatus::Ok,
            format!("timeout_secs: {}", config.timeout_secs),
        ));
    }

    match config.base_url() {
        Ok(url) if url.starts_with("http://") || url.starts_with("https://") => {
            checks.push(Validation::new(
                "base_url",
                ValidationStatus::Ok,
                format!("base_url: {url}"),
            ));
        }
        Ok(url) => checks.push(Validation::new(
            "base_url",
            ValidationStatus::Warning,
            format!("base_url: {url} (missing http:// or https:// prefix)"),
        )),
        Err(e) => checks.push(Validation::new(
            "base_url",
            ValidationStatus::Error,
            format!("base_url: {e}"),
        )),
    }

    let mut header_issues = Vec::new();
    for (key, value) in &config.headers {
        if value.contains('<') && value.contains('>') {
            header_issues.push(format!("{key}: contains '<...>' placeholder"));
        } else if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| value.contains(**p)) {
            header_issues.push(format!("{key}: contains '{pattern}', may be a placeholder"));
        }
    }
    if header_issues.is_empty() {
        checks.push(Validation::new(
            "headers",
            ValidationStatus::Ok,
            format!("headers: {} configured", config.headers.len()),
        ));
    } else {
        for issue in header_issues {
            checks.push(Validation::new("headers", ValidationStatus::Warning, issue));
        }
    }

    checks
}

// ── Corpus validation ──

/// Validate fixture cases: duplicates, unknown keys, contradictory flags.
#[must_use]
pub fn validate_corpus(corpus: &Corpus) -> Vec<Validation> {
    let mut checks = Vec::new();

    if corpus.is_empty() {
        checks.push(Validation::new(
            "corpus",
            ValidationStatus::Warning,
            "corpus: no cases declared",
        ));
    } else {
        checks.push(Validation::new(
            "corpus",
            ValidationStatus::Ok,
            format!(
                "corpus: {} cases across {} routes",
                corpus.len(),
                corpus.groups.len()
            ),
        ));
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for case in corpus.cases() {
        *seen.entry(case.identifier()).or_default() += 1;
    }
    let mut duplicates: Vec<_> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for (identifier, count) in duplicates {
        checks.push(Validation::new(
            "duplicates",
            ValidationStatus::Warning,
            format!("{identifier}: declared {count} times"),
        ));
    }

    for case in corpus.cases() {
        for key in case.predicates.unknown.keys() {
            checks.push(Validation::new(
                "predicates",
                ValidationStatus::Warning,
                format!("{}: unknown predicate '{key}' is ignored", case.identifier()),
            ));
        }
        if case.predicates.error.is_some() && case.predicates.expected_error_code().is_none() {
            checks.push(Validation::new(
                "predicates",
                ValidationStatus::Warning,
                format!(
                    "{}: 'error' has no numeric 'code', case runs as a success check",
                    case.identifier()
                ),
            ));
        }
        match case.expectation() {
            Expectation::ClientError(code) if !case.predicates.is_empty() => {
                checks.push(Validation::new(
                    "predicates",
                    ValidationStatus::Warning,
                    format!(
                        "{}: expects HTTP {code}, its predicates are never evaluated",
                        case.identifier()
                    ),
                ));
            }
            _ => {}
        }
        if case.predicates.first_result.is_some() && case.route.identity_field().is_none() {
            checks.push(Validation::new(
                "predicates",
                ValidationStatus::Warning,
                format!(
                    "{}: route {} has no identity field, 'firstResult' is not checked",
                    case.identifier(),
                    case.route
                ),
            ));
        }
        if case.expected_status == ExpectedStatus::Fail
            && case.expectation() == Expectation::KnownFailure
            && !case.predicates.is_empty()
        {
            checks.push(Validation::new(
                "status",
                ValidationStatus::Warning,
                format!(
                    "{}: marked 'status: fail', its predicates are never evaluated",
                    case.identifier()
                ),
            ));
        }
    }

    checks
}

impl DryRunPlan {
    /// Build the plan for `corpus` under `config`.
    #[must_use]
    pub fn build(config: &Config, corpus: &Corpus) -> Self {
        let base_url = config.base_url().ok().map(str::to_string);

        let cases: Vec<CasePlan> = corpus
            .cases()
            .map(|case| CasePlan {
                identifier: case.identifier(),
                url: base_url.as_deref().map(|b| case.url(b)),
                expectation: match case.expectation() {
                    Expectation::ClientError(code) => format!("error {code}"),
                    Expectation::KnownFailure => "skip".into(),
                    Expectation::Results => "results".into(),
                },
                predicates: case
                    .predicates
                    .configured()
                    .into_iter()
                    .map(|(kind, _)| kind.as_str().to_string())
                    .collect(),
            })
            .collect();

        let skipped = cases.iter().filter(|c| c.expectation == "skip").count();
        let mut validations = validate_config(config);
        validations.extend(validate_corpus(corpus));

        Self {
            base_url,
            total_cases: cases.len(),
            executable: cases.len() - skipped,
            skipped,
            cases,
            validations,
        }
    }

    /// Record an extra validation (e.g. a corpus that failed to load).
    pub fn push_validation(&mut self, check: &str, status: ValidationStatus, message: String) {
        self.validations.push(Validation::new(check, status, message));
    }

    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Dry run: {} cases, {} requests planned, {} skipped\n",
            self.total_cases, self.executable, self.skipped,
        ));

        for case in &self.cases {
            let predicates = if case.predicates.is_empty() {
                String::from("-")
            } else {
                case.predicates.join(", ")
            };
            lines.push(format!(
                "  {} [{}] {predicates}",
                case.identifier, case.expectation
            ));
        }
        if !self.cases.is_empty() {
            lines.push(String::new());
        }

        lines.push("Validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    /// Returns true if any validation has Error status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }

    /// Returns true if any validation has Warning status.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(base_url: Option<&str>) -> Config {
        Config {
            base_url: base_url.map(String::from),
            fixtures: "nonexistent.yaml".into(),
            ..Config::default()
        }
    }

    fn corpus(document: serde_json::Value) -> Corpus {
        Corpus::from_value(document).unwrap()
    }

    fn find<'a>(checks: &'a [Validation], check: &str) -> Vec<&'a Validation> {
        checks.iter().filter(|c| c.check == check).collect()
    }

    // ── config ──

    #[test]
    fn missing_base_url_is_error() {
        let checks = validate_config(&config(None));
        assert_eq!(find(&checks, "base_url")[0].status, ValidationStatus::Error);
    }

    #[test]
    fn base_url_without_scheme_warns() {
        let checks = validate_config(&config(Some("localhost:3000")));
        assert_eq!(
            find(&checks, "base_url")[0].status,
            ValidationStatus::Warning
        );
    }

    #[test]
    fn fixtures_not_found() {
        let checks = validate_config(&config(Some("http://localhost:3000")));
        assert_eq!(find(&checks, "fixtures")[0].status, ValidationStatus::Error);
    }

    #[test]
    fn zero_timeout_is_error() {
        let mut cfg = config(Some("http://localhost:3000"));
        cfg.timeout_secs = 0;
        let checks = validate_config(&cfg);
        let timeout = find(&checks, "timeout");
        assert_eq!(timeout[0].status, ValidationStatus::Error);
        assert!(timeout[0].message.contains("timeout_secs: 0"));

        let checks = validate_config(&config(Some("http://localhost:3000")));
        assert_eq!(find(&checks, "timeout")[0].status, ValidationStatus::Ok);
    }

    #[test]
    fn placeholder_header_warns() {
        let mut cfg = config(Some("http://localhost:3000"));
        cfg.headers.insert("X-API-Key".into(), "<your key>".into());
        let checks = validate_config(&cfg);
        assert_eq!(find(&checks, "headers")[0].status, ValidationStatus::Warning);
    }

    // ── corpus ──

    #[test]
    fn duplicate_identifiers_warn() {
        let checks = validate_corpus(&corpus(json!({
            "/search": [{"request": "?q=a"}, {"request": "?q=a"}, {"request": "?q=b"}],
        })));
        let dups = find(&checks, "duplicates");
        assert_eq!(dups.len(), 1);
        assert!(dups[0].message.contains("/search?q=a: declared 2 times"));
    }

    #[test]
    fn unknown_predicate_warns() {
        let checks = validate_corpus(&corpus(json!({
            "/search": [{"request": "?q=a", "results": {"nbresult": 1}}],
        })));
        assert!(find(&checks, "predicates")[0].message.contains("'nbresult'"));
    }

    #[test]
    fn known_failure_with_predicates_warns() {
        let checks = validate_corpus(&corpus(json!({
            "/search": [{"request": "?q=a", "status": "fail", "results": {"nbResult": 1}}],
        })));
        assert_eq!(find(&checks, "status").len(), 1);
    }

    #[test]
    fn error_case_with_predicates_warns() {
        let checks = validate_corpus(&corpus(json!({
            "/reverse": [
                {"request": "?lat=200", "results": {"error": {"code": 400}, "nbResult": 0}},
                {"request": "?lat=300", "results": {"error": {"code": 400}}},
            ],
        })));
        let warnings = find(&checks, "predicates");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].status, ValidationStatus::Warning);
        assert!(warnings[0].message.starts_with("/reverse?lat=200: expects HTTP 400"));
    }

    #[test]
    fn first_result_without_identity_field_warns() {
        let checks = validate_corpus(&corpus(json!({
            "/": [{"request": "", "results": {"firstResult": {"version": "2.1"}}}],
            "/search": [{"request": "?q=a", "results": {"firstResult": {"id": "x"}}}],
        })));
        let warnings = find(&checks, "predicates");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'firstResult' is not checked"));
    }

    #[test]
    fn empty_corpus_warns() {
        let checks = validate_corpus(&Corpus::default());
        assert_eq!(find(&checks, "corpus")[0].status, ValidationStatus::Warning);
    }

    // ── plan ──

    #[test]
    fn build_plan_counts_cases() {
        let plan = DryRunPlan::build(
            &config(Some("http://localhost:3000/")),
            &corpus(json!({
                "/search": [
                    {"request": "?q=a", "results": {"firstResult": {"id": "x"}, "nbResult": 1}},
                    {"request": "?q=", "results": {"error": {"code": 400}}},
                    {"request": "?q=b", "status": "fail"},
                ],
            })),
        );
        assert_eq!(plan.total_cases, 3);
        assert_eq!(plan.executable, 2);
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(
            plan.cases[0].url.as_deref(),
            Some("http://localhost:3000/search?q=a")
        );
        assert_eq!(plan.cases[0].predicates, vec!["firstResult", "nbResult"]);
        assert_eq!(plan.cases[1].expectation, "error 400");
        assert_eq!(plan.cases[2].expectation, "skip");
    }

    #[test]
    fn plan_terminal_output() {
        let plan = DryRunPlan::build(
            &config(Some("http://localhost:3000")),
            &corpus(json!({"/completion": [{"request": "?text=Par", "results": {"many": {"city": ["Paris"]}}}]})),
        );
        let text = plan.to_terminal();
        assert!(text.contains("1 cases, 1 requests planned, 0 skipped"));
        assert!(text.contains("/completion?text=Par [results] many"));
        assert!(text.contains("[ERROR] fixtures: nonexistent.yaml (not found)"));
        assert!(plan.has_errors());
    }

    #[test]
    fn pushed_validation_counts() {
        let mut plan = DryRunPlan::build(&config(Some("http://h")), &Corpus::default());
        assert!(plan.has_warnings());
        plan.push_validation("corpus", ValidationStatus::Error, "parse error".into());
        assert!(plan.has_errors());
    }
}
