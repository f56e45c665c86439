//! Verdict policy - turns a run report into a pass/fail verdict and exit code

use std::collections::BTreeMap;

use super::{FailureKind, RunReport};

/// Exit code when at least one case failed.
pub const EXIT_FAILED: i32 = 1;
/// Exit code when every failure was a transport failure (service unreachable).
pub const EXIT_UNREACHABLE: i32 = 2;

/// Policy for judging a run
#[derive(Debug, Clone, Default)]
pub struct VerdictPolicy {
    /// Accept a run where no case was executed
    pub allow_empty: bool,
}

impl VerdictPolicy {
    /// Determine the verdict from a run report.
    ///
    /// PASS requires at least one executed case (unless `allow_empty`) and
    /// zero failed cases. Skipped cases never count either way.
    #[must_use]
    pub fn verdict(&self, report: &RunReport) -> Verdict {
        let executed = report.executed();

        if report.failed == 0 {
            if executed == 0 && !self.allow_empty {
                return Verdict {
                    status: VerdictStatus::Fail,
                    exit_code: EXIT_FAILED,
                    reason: "No cases were executed (pass --allow-empty to accept)".to_string(),
                };
            }
            return Verdict {
                status: VerdictStatus::Pass,
                exit_code: 0,
                reason: pass_reason(executed, report.skipped),
            };
        }

        let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        for kind in report.failures().filter_map(|o| o.failure_kind()) {
            *by_kind.entry(kind_label(kind)).or_default() += 1;
        }
        let transport_only = report
            .failures()
            .all(|o| o.failure_kind() == Some(FailureKind::Transport));

        let breakdown = by_kind
            .iter()
            .map(|(label, count)| format!("{count} {label}"))
            .collect::<Vec<_>>()
            .join(", ");

        Verdict {
            status: VerdictStatus::Fail,
            exit_code: if transport_only {
                EXIT_UNREACHABLE
            } else {
                EXIT_FAILED
            },
            reason: format!("{} of {executed} cases failed ({breakdown})", report.failed),
        }
    }
}

fn pass_reason(executed: usize, skipped: usize) -> String {
    if skipped == 0 {
        format!("All {executed} cases passed")
    } else {
        format!("All {executed} cases passed ({skipped} skipped)")
    }
}

const fn kind_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::AssertionMismatch => "assertion",
        FailureKind::ClientError | FailureKind::UnexpectedSuccess => "status",
        FailureKind::ServiceError => "service error",
        FailureKind::MalformedResponse => "malformed",
        FailureKind::Transport => "transport",
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ExpectedStatus, Predicates, TestCase};
    use crate::route::Route;
    use crate::verdict::{CaseFailure, Outcome};

    fn case() -> TestCase {
        TestCase {
            route: Route::Completion,
            request: "?text=Par".into(),
            expected_status: ExpectedStatus::Success,
            predicates: Predicates::default(),
        }
    }

    fn failed(kind: FailureKind) -> Outcome {
        Outcome::failed(&case(), CaseFailure::new(kind, "boom"))
    }

    fn report(outcomes: Vec<Outcome>) -> RunReport {
        RunReport::new("http://localhost", outcomes)
    }

    #[test]
    fn all_passed_is_pass() {
        let v = VerdictPolicy::default().verdict(&report(vec![
            Outcome::passed(&case()),
            Outcome::passed(&case()),
        ]));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
        assert_eq!(v.reason, "All 2 cases passed");
    }

    #[test]
    fn skipped_cases_do_not_fail_the_run() {
        let v = VerdictPolicy::default().verdict(&report(vec![
            Outcome::passed(&case()),
            Outcome::skipped(&case(), "known failure"),
        ]));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.reason, "All 1 cases passed (1 skipped)");
    }

    #[test]
    fn nothing_executed_is_fail() {
        let v = VerdictPolicy::default()
            .verdict(&report(vec![Outcome::skipped(&case(), "known failure")]));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, EXIT_FAILED);
        assert!(v.reason.contains("No cases were executed"));
    }

    #[test]
    fn nothing_executed_allowed() {
        let policy = VerdictPolicy { allow_empty: true };
        let v = policy.verdict(&report(vec![]));
        assert_eq!(v.status, VerdictStatus::Pass);

        let v = policy.verdict(&report(vec![Outcome::skipped(&case(), "known failure")]));
        assert_eq!(v.status, VerdictStatus::Pass);
        assert_eq!(v.exit_code, 0);
    }

    #[test]
    fn any_failure_is_fail() {
        let v = VerdictPolicy::default().verdict(&report(vec![
            Outcome::passed(&case()),
            failed(FailureKind::AssertionMismatch),
            failed(FailureKind::Transport),
        ]));
        assert_eq!(v.status, VerdictStatus::Fail);
        assert_eq!(v.exit_code, EXIT_FAILED);
        assert_eq!(v.reason, "2 of 3 cases failed (1 assertion, 1 transport)");
    }

    #[test]
    fn transport_only_failures_flag_unreachable() {
        let v = VerdictPolicy::default().verdict(&report(vec![
            failed(FailureKind::Transport),
            failed(FailureKind::Transport),
        ]));
        assert_eq!(v.exit_code, EXIT_UNREACHABLE);
    }

    #[test]
    fn status_kinds_grouped() {
        let v = VerdictPolicy::default().verdict(&report(vec![
            failed(FailureKind::ClientError),
            failed(FailureKind::UnexpectedSuccess),
        ]));
        assert!(v.reason.contains("2 status"));
    }
}
