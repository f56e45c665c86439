//! Persistent report storage: `~/.recette/reports/`
//!
//! Every `recette run` is saved regardless of `--output` mode.
//! Directory layout: `{host_port}_{timestamp}/`

use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use recette_core::{Config, RunReport, Verdict};

/// Everything needed to persist a run.
pub struct ReportData<'a> {
    pub config: &'a Config,
    pub base_url: &'a str,
    pub report: &'a RunReport,
    pub verdict: &'a Verdict,
    pub duration_secs: f64,
}

/// Save a run to `~/.recette/reports/{host_port}_{timestamp}/`.
///
/// Returns the report directory path on success.
pub fn save_report(data: &ReportData) -> Result<PathBuf, std::io::Error> {
    save_report_in(&report_base_dir()?, data, OffsetDateTime::now_utc())
}

fn save_report_in(
    base: &Path,
    data: &ReportData,
    now: OffsetDateTime,
) -> Result<PathBuf, std::io::Error> {
    let report_dir = base.join(build_dir_name(data.base_url, now)?);
    std::fs::create_dir_all(&report_dir)?;

    // config.toml: snapshot of the config used
    let config_toml = toml::to_string_pretty(data.config).map_err(std::io::Error::other)?;
    std::fs::write(report_dir.join("config.toml"), config_toml)?;

    // summary.json: verdict + counts + metadata
    let summary = serde_json::json!({
        "verdict": {
            "status": data.verdict.status.to_string(),
            "exit_code": data.verdict.exit_code,
            "reason": data.verdict.reason,
        },
        "stats": {
            "total": data.report.total,
            "passed": data.report.passed,
            "failed": data.report.failed,
            "skipped": data.report.skipped,
        },
        "meta": {
            "timestamp": now.format(&Rfc3339).map_err(std::io::Error::other)?,
            "duration_secs": data.duration_secs,
            "base_url": data.base_url,
            "fixtures": data.config.fixtures.display().to_string(),
        },
    });
    std::fs::write(
        report_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    // outcomes.json: the full run report
    std::fs::write(
        report_dir.join("outcomes.json"),
        serde_json::to_string_pretty(data.report)?,
    )?;

    // reproductions.http: for quick replay in IDE/curl
    if data.report.failed > 0 {
        let http_content = recette_core::to_http_file(&data.report.outcomes, "base_url");
        std::fs::write(report_dir.join("reproductions.http"), http_content)?;
    }

    Ok(report_dir)
}

fn report_base_dir() -> Result<PathBuf, std::io::Error> {
    let home = std::env::var("HOME")
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".recette").join("reports"))
}

/// `{host_port}_{timestamp}` e.g. `localhost_3000_20260205T193000`
fn build_dir_name(base_url: &str, now: OffsetDateTime) -> Result<String, std::io::Error> {
    let ts = now
        .format(format_description!(
            "[year][month][day]T[hour][minute][second]"
        ))
        .map_err(std::io::Error::other)?;
    Ok(format!("{}_{ts}", extract_host_port(base_url)))
}

/// `"http://localhost:3000/path"` → `"localhost_3000"`
fn extract_host_port(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("unknown")
        .replace(':', "_")
}
