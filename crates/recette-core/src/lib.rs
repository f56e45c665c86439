//! recette-core: fixture corpus, result projection, and assertion logic
//!
//! This crate turns a declarative fixture document into test cases, projects
//! geocoding responses into flat records, judges them against predicates, and
//! folds per-case outcomes into a verdict.

pub mod assertion;
pub mod config;
pub mod dryrun;
pub mod dump;
pub mod fixture;
pub mod generator;
pub mod projector;
pub mod route;
pub mod schema;
pub mod verdict;

pub use assertion::{Disagreement, PredicateKind, evaluate};
pub use config::{Config, ConfigError};
pub use dryrun::DryRunPlan;
pub use dump::{DumpError, DumpIndex};
pub use fixture::{Corpus, CorpusError, Expectation, ExpectedStatus, Predicates, TestCase};
pub use generator::to_http_file;
pub use projector::{CollectionError, NormalizedRecord, project, project_response};
pub use route::Route;
pub use verdict::{
    CaseFailure, CaseStatus, Exchange, FailureKind, Outcome, RunReport, Verdict, VerdictPolicy,
    VerdictStatus,
};
