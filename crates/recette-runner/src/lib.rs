//! recette-runner: live HTTP execution of fixture corpora

pub mod executor;
pub mod orchestrator;

pub use executor::{ExecError, Execution, Executor, RunnerError};
pub use orchestrator::Orchestrator;
