//! JSON Schema of the run report (`recette schema`, `--output json`)

use crate::verdict::RunReport;

/// Generate JSON Schema for the run report.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}
