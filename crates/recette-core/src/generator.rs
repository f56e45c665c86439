//! HTTP file generator - converts failed cases to .http format

use crate::verdict::{CaseStatus, Outcome};

/// Generate .http file content from failed outcomes.
///
/// Non-failed outcomes are ignored.
pub fn to_http_file(outcomes: &[Outcome], base_url_var: &str) -> String {
    let failed: Vec<&Outcome> = outcomes
        .iter()
        .filter(|o| o.status == CaseStatus::Failed)
        .collect();

    let mut lines = Vec::new();

    lines.push(format!(
        "# Auto-generated reproduction cases ({} failures)",
        failed.len()
    ));
    lines.push(format!("# Base URL variable: {{{{{base_url_var}}}}}"));
    lines.push(String::new());

    for (idx, outcome) in failed.iter().enumerate() {
        let reason = outcome
            .failure
            .as_ref()
            .map_or_else(String::new, |f| match f.status_code {
                Some(code) => format!("{} (HTTP {code})", f.kind),
                None => f.kind.to_string(),
            });
        lines.push(format!("### [{idx}] {} - {reason}", outcome.identifier));
        for d in &outcome.disagreements {
            lines.push(format!("# {d}"));
        }
        lines.push(format!(
            "GET {{{{{base_url_var}}}}}{}{}",
            outcome.route, outcome.request
        ));
        lines.push("Accept: application/json".to_string());
        lines.push(String::new());
        lines.push("###".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}
