//! Per-case outcomes and the aggregated run report

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::assertion::Disagreement;
use crate::fixture::TestCase;

/// Result of one fixture case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Why a case failed - determines exit code grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One or more predicates disagreed
    AssertionMismatch,
    /// Non-2xx where success was expected, or the wrong error status
    ClientError,
    /// 2xx where an error status was expected
    UnexpectedSuccess,
    /// Body carried a top-level `error` field while predicates were configured
    ServiceError,
    /// Body was not JSON or lacked the route's collection
    MalformedResponse,
    /// Connection failure or timeout
    Transport,
}

impl FailureKind {
    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AssertionMismatch => "Predicate mismatch",
            Self::ClientError => "Unexpected HTTP status",
            Self::UnexpectedSuccess => "Expected an error status, request succeeded",
            Self::ServiceError => "Service reported an error",
            Self::MalformedResponse => "Malformed response body",
            Self::Transport => "Transport failure",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Structured failure of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaseFailure {
    pub kind: FailureKind,
    /// HTTP status received, when a response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub message: String,
}

impl CaseFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

/// One request/response pair, kept for dumps and reproductions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Exchange {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub elapsed_ms: u64,
    /// Response body (truncated for large responses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Outcome of one fixture case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outcome {
    /// Route followed by request, e.g. `/search?q=paris`
    pub identifier: String,
    pub route: String,
    pub request: String,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CaseFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disagreements: Vec<Disagreement>,
    /// Records the predicates were evaluated against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    /// Free-form remark (skip reason, service error message)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Exchange>,
}

impl Outcome {
    fn base(case: &TestCase, status: CaseStatus) -> Self {
        Self {
            identifier: case.identifier(),
            route: case.route.path().to_string(),
            request: case.request.clone(),
            status,
            failure: None,
            disagreements: Vec::new(),
            record_count: None,
            note: None,
            exchange: None,
        }
    }

    #[must_use]
    pub fn passed(case: &TestCase) -> Self {
        Self::base(case, CaseStatus::Passed)
    }

    #[must_use]
    pub fn skipped(case: &TestCase, reason: impl Into<String>) -> Self {
        Self::base(case, CaseStatus::Skipped).with_note(reason)
    }

    #[must_use]
    pub fn failed(case: &TestCase, failure: CaseFailure) -> Self {
        let mut outcome = Self::base(case, CaseStatus::Failed);
        outcome.failure = Some(failure);
        outcome
    }

    /// Pass when `disagreements` is empty, otherwise an assertion failure.
    #[must_use]
    pub fn judged(case: &TestCase, disagreements: Vec<Disagreement>) -> Self {
        if disagreements.is_empty() {
            return Self::passed(case);
        }
        let summary = format!(
            "{} predicate disagreement{}",
            disagreements.len(),
            if disagreements.len() == 1 { "" } else { "s" }
        );
        let mut outcome = Self::failed(
            case,
            CaseFailure::new(FailureKind::AssertionMismatch, summary),
        );
        outcome.disagreements = disagreements;
        outcome
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub const fn with_record_count(mut self, count: usize) -> Self {
        self.record_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_exchange(mut self, exchange: Exchange) -> Self {
        self.exchange = Some(exchange);
        self
    }

    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}

/// All outcomes of a run plus counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    #[must_use]
    pub fn new(base_url: impl Into<String>, outcomes: Vec<Outcome>) -> Self {
        let count = |s: CaseStatus| outcomes.iter().filter(|o| o.status == s).count();
        Self {
            base_url: base_url.into(),
            total: outcomes.len(),
            passed: count(CaseStatus::Passed),
            failed: count(CaseStatus::Failed),
            skipped: count(CaseStatus::Skipped),
            outcomes,
        }
    }

    /// Cases that were actually sent (not skipped).
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.passed + self.failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == CaseStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::PredicateKind;
    use crate::fixture::{ExpectedStatus, Predicates};
    use crate::route::Route;

    fn case() -> TestCase {
        TestCase {
            route: Route::Search,
            request: "?q=paris".into(),
            expected_status: ExpectedStatus::Success,
            predicates: Predicates::default(),
        }
    }

    fn disagreement() -> Disagreement {
        Disagreement {
            predicate: PredicateKind::NbResult,
            field: None,
            record: None,
            expected: serde_json::json!(1),
            actual: Some(serde_json::json!(2)),
            message: "expected 1 results, got 2".into(),
        }
    }

    #[test]
    fn judged_without_disagreements_passes() {
        let outcome = Outcome::judged(&case(), vec![]);
        assert_eq!(outcome.status, CaseStatus::Passed);
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.identifier, "/search?q=paris");
    }

    #[test]
    fn judged_with_disagreements_fails() {
        let outcome = Outcome::judged(&case(), vec![disagreement()]);
        assert_eq!(outcome.status, CaseStatus::Failed);
        assert_eq!(outcome.failure_kind(), Some(FailureKind::AssertionMismatch));
        assert_eq!(
            outcome.failure.as_ref().map(|f| f.message.as_str()),
            Some("1 predicate disagreement")
        );
    }

    #[test]
    fn skipped_carries_reason() {
        let outcome = Outcome::skipped(&case(), "known failure");
        assert_eq!(outcome.status, CaseStatus::Skipped);
        assert_eq!(outcome.note.as_deref(), Some("known failure"));
    }

    #[test]
    fn report_counts() {
        let outcomes = vec![
            Outcome::passed(&case()),
            Outcome::judged(&case(), vec![disagreement()]),
            Outcome::skipped(&case(), "known failure"),
            Outcome::failed(
                &case(),
                CaseFailure::new(FailureKind::Transport, "connection refused"),
            ),
        ];
        let report = RunReport::new("http://localhost:3000", outcomes);
        assert_eq!(report.total, 4);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.executed(), 3);
        assert_eq!(report.failures().count(), 2);
    }

    #[test]
    fn outcome_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Outcome::passed(&case())).unwrap();
        assert_eq!(json["status"], "passed");
        assert!(json.get("failure").is_none());
        assert!(json.get("disagreements").is_none());
    }

    #[test]
    fn failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::UnexpectedSuccess).unwrap();
        assert_eq!(json, "\"unexpected_success\"");
    }
}
