//! Verdict module - per-case outcomes, run report, and policy

mod outcome;
mod policy;

pub use outcome::{CaseFailure, CaseStatus, Exchange, FailureKind, Outcome, RunReport};
pub use policy::{EXIT_FAILED, EXIT_UNREACHABLE, Verdict, VerdictPolicy, VerdictStatus};
