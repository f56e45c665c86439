//! Test orchestrator: corpus → one outcome per case → run report
//!
//! Cases run sequentially in corpus order. A failing case never stops the
//! run; only client construction can fail before the first request.

use tracing::{debug, info, warn};

use recette_core::assertion::evaluate;
use recette_core::fixture::{Corpus, Expectation, TestCase};
use recette_core::projector::{project_response, service_error};
use recette_core::{CaseFailure, CaseStatus, Config, FailureKind, Outcome, RunReport};

use crate::executor::{ExecError, Executor, RunnerError};

/// Drives every case through execute → unwrap → project → assert.
#[derive(Debug)]
pub struct Orchestrator {
    executor: Executor,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &Config) -> Result<Self, RunnerError> {
        Ok(Self {
            executor: Executor::new(base_url, config)?,
        })
    }

    /// Run the whole corpus.
    #[must_use]
    pub fn run(&self, corpus: &Corpus) -> RunReport {
        let mut outcomes = Vec::with_capacity(corpus.len());

        for group in &corpus.groups {
            let start = outcomes.len();
            for case in &group.cases {
                outcomes.push(self.run_case(case));
            }

            let ran = &outcomes[start..];
            let count = |s: CaseStatus| ran.iter().filter(|o| o.status == s).count();
            info!(
                route = %group.route,
                passed = count(CaseStatus::Passed),
                failed = count(CaseStatus::Failed),
                skipped = count(CaseStatus::Skipped),
                "route finished"
            );
        }

        RunReport::new(self.executor.base_url(), outcomes)
    }

    /// Run one case. Always yields exactly one outcome.
    #[must_use]
    pub fn run_case(&self, case: &TestCase) -> Outcome {
        let outcome = match case.expectation() {
            Expectation::KnownFailure => Outcome::skipped(case, "known failure (status: fail)"),
            Expectation::ClientError(code) => self.expect_client_error(case, code),
            Expectation::Results => self.expect_results(case),
        };

        match outcome.status {
            CaseStatus::Failed => {
                if let Some(failure) = &outcome.failure {
                    warn!(case = %outcome.identifier, kind = ?failure.kind, "{}", failure.message);
                }
            }
            status => debug!(case = %outcome.identifier, %status, "case finished"),
        }
        outcome
    }

    fn expect_client_error(&self, case: &TestCase, code: u16) -> Outcome {
        let execution = self.executor.execute(case);
        let outcome = match execution.result {
            Err(ExecError::Client { status, .. }) if status == code => {
                Outcome::passed(case).with_note(format!("HTTP {code} as expected"))
            }
            Err(ExecError::Client { status, message }) => Outcome::failed(
                case,
                CaseFailure::new(
                    FailureKind::ClientError,
                    format!("expected HTTP {code}, got {status}: {message}"),
                )
                .with_status(status),
            ),
            Err(ExecError::Transport(message)) => {
                Outcome::failed(case, CaseFailure::new(FailureKind::Transport, message))
            }
            Ok(_) | Err(ExecError::Decode { .. }) => {
                let status = execution.exchange.status_code.unwrap_or_default();
                Outcome::failed(
                    case,
                    CaseFailure::new(
                        FailureKind::UnexpectedSuccess,
                        format!("expected HTTP {code}, got {status}"),
                    )
                    .with_status(status),
                )
            }
        };
        outcome.with_exchange(execution.exchange)
    }

    fn expect_results(&self, case: &TestCase) -> Outcome {
        let execution = self.executor.execute(case);
        let outcome = match execution.result {
            Err(ExecError::Transport(message)) => {
                Outcome::failed(case, CaseFailure::new(FailureKind::Transport, message))
            }
            Err(ExecError::Client { status, message }) => Outcome::failed(
                case,
                CaseFailure::new(FailureKind::ClientError, format!("HTTP {status}: {message}"))
                    .with_status(status),
            ),
            Err(ExecError::Decode { status, message }) => Outcome::failed(
                case,
                CaseFailure::new(
                    FailureKind::MalformedResponse,
                    format!("invalid JSON: {message}"),
                )
                .with_status(status),
            ),
            Ok(body) => judge(case, &body),
        };
        outcome.with_exchange(execution.exchange)
    }
}

/// Judge a parsed success body against the case's predicates.
fn judge(case: &TestCase, body: &serde_json::Value) -> Outcome {
    if let Some(message) = service_error(body) {
        let message = format!("Error: {message}");
        if case.predicates.is_empty() {
            return Outcome::passed(case).with_note(message);
        }
        return Outcome::failed(case, CaseFailure::new(FailureKind::ServiceError, message));
    }

    match project_response(body, &case.route) {
        Ok(records) => {
            let disagreements = evaluate(&case.route, &records, &case.predicates);
            Outcome::judged(case, disagreements).with_record_count(records.len())
        }
        Err(e) => Outcome::failed(
            case,
            CaseFailure::new(FailureKind::MalformedResponse, e.to_string()),
        ),
    }
}
