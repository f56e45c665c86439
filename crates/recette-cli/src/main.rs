//! recette CLI - contract tests for a live geocoding API

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use recette_core::config::BASE_URL_ENV;
use recette_core::dryrun::ValidationStatus;
use recette_core::{
    CaseStatus, Config, Corpus, DryRunPlan, Outcome, RunReport, Verdict, VerdictPolicy,
    to_http_file,
};
use recette_runner::Orchestrator;

#[derive(Parser)]
#[command(name = "recette")]
#[command(about = "Contract tests for a live geocoding API, driven by YAML fixtures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every fixture case against the service
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Output directory for reproductions.http
        #[arg(short, long, default_value = ".recette")]
        output_dir: String,

        /// Show execution plan without sending requests
        #[arg(long)]
        dry_run: bool,

        /// Dump every exchange to JSONL files
        #[arg(long)]
        dump: bool,

        /// Directory for dump files (default: .recette/dumps)
        #[arg(long)]
        dump_dir: Option<String>,

        /// Pass even when no case was executed
        #[arg(long)]
        allow_empty: bool,
    },

    /// Show execution plan and validate fixtures (no requests)
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Initialize config file
    Init,

    /// Check config, base URL and fixture file
    Doctor,

    /// Export JSON Schema of the run report
    Schema,
}

/// Where to find the service and the fixtures.
#[derive(Args)]
struct TargetArgs {
    /// Config file (default: .recette.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Service base URL (overrides RECETTE_API_URL and config)
    #[arg(long)]
    base_url: Option<String>,

    /// Fixture document (overrides config)
    #[arg(short, long)]
    fixtures: Option<String>,

    /// Only run these routes, e.g. --route /search
    #[arg(long)]
    route: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// Logs go to stderr; stdout is reserved for the report.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("recette=debug,recette_runner=debug,recette_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            target,
            output_dir,
            dry_run,
            dump,
            dump_dir,
            allow_empty,
        } => {
            let cfg = load_config(&target)?;

            if dry_run {
                return print_plan(&build_plan(&cfg, &target.route), cli.output);
            }

            let base_url = cfg.base_url()?.to_string();
            let corpus = Corpus::load(&cfg.fixtures)
                .with_context(|| format!("loading fixtures {}", cfg.fixtures.display()))?
                .retain_routes(&target.route);
            let orchestrator = Orchestrator::new(&base_url, &cfg)?;

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  base_url: {base_url}");
                eprintln!("  fixtures: {}", cfg.fixtures.display());
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:  {} configured", cfg.headers.len());
                }
                eprintln!("  timeout:  {}s", cfg.timeout_secs);
                eprintln!();
                eprintln!(
                    "Running {} cases across {} routes...",
                    corpus.len(),
                    corpus.groups.len()
                );
            }

            let start = Instant::now();
            let report = orchestrator.run(&corpus);
            let duration_secs = start.elapsed().as_secs_f64();

            let verdict = VerdictPolicy { allow_empty }.verdict(&report);

            match cli.output {
                OutputFormat::Terminal => {
                    print_terminal(&report, &verdict);
                    if report.failed > 0 {
                        write_reproductions(&report, Path::new(&output_dir));
                    }
                }
                OutputFormat::Json => {
                    let json_output = serde_json::json!({
                        "verdict": {
                            "status": verdict.status.to_string(),
                            "exit_code": verdict.exit_code,
                            "reason": verdict.reason,
                        },
                        "report": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }

            // Dump all exchanges if requested (CLI flag or config)
            if dump || cfg.dump {
                let dump_path = dump_dir
                    .as_deref()
                    .map(PathBuf::from)
                    .or_else(|| cfg.dump_dir.clone())
                    .unwrap_or_else(|| PathBuf::from(".recette/dumps"));

                match recette_core::dump::write_dump(&report.outcomes, &dump_path) {
                    Ok(index) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!(
                                "Dump: {} exchanges → {} ({})",
                                index.total,
                                dump_path.display(),
                                index
                                    .routes
                                    .iter()
                                    .map(|e| e.file.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            );
                        }
                    }
                    Err(e) => eprintln!("Warning: failed to write dump: {e}"),
                }
            }

            // Persist report to ~/.recette/reports/
            let report_data = storage::ReportData {
                config: &cfg,
                base_url: &base_url,
                report: &report,
                verdict: &verdict,
                duration_secs,
            };
            match storage::save_report(&report_data) {
                Ok(path) => {
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Report saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("Warning: failed to save report: {e}"),
            }

            Ok(verdict.exit_code)
        }

        Commands::Plan { target } => {
            let cfg = load_config(&target)?;
            print_plan(&build_plan(&cfg, &target.route), cli.output)
        }

        Commands::Init => {
            let config_path = ".recette.toml";
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - base_url: geocoding service to test (or set {BASE_URL_ENV})");
            println!("  - fixtures: path to the fixture document");
            println!("  - headers: API keys");
            Ok(0)
        }

        Commands::Doctor => {
            println!("recette doctor");
            println!("==============\n");

            let loaded = Config::load_default();
            let config_file = [".recette.toml", ".recette.json", "recette.toml"]
                .into_iter()
                .find(|p| Path::new(p).exists());
            match (&loaded, config_file) {
                (Ok(_), Some(path)) => println!("[OK] Config file ({path})"),
                (Ok(_), None) => println!("[--] Config file (none, using defaults)"),
                (Err(e), _) => println!("[NG] Config file: {e}"),
            }

            let cfg = loaded.unwrap_or_default().with_env();
            let url_ok = match cfg.base_url() {
                Ok(url) => {
                    println!("[OK] Base URL ({url})");
                    true
                }
                Err(e) => {
                    println!("[NG] Base URL: {e}");
                    false
                }
            };

            let fixtures_ok = match Corpus::load(&cfg.fixtures) {
                Ok(corpus) => {
                    println!(
                        "[OK] Fixtures ({}, {} cases)",
                        cfg.fixtures.display(),
                        corpus.len()
                    );
                    true
                }
                Err(e) => {
                    println!("[NG] Fixtures: {e}");
                    false
                }
            };

            if config_file.is_none() {
                println!("\nCreate config file:");
                println!("  recette init");
            }

            if url_ok && fixtures_ok {
                println!("\nReady to run!");
                Ok(0)
            } else {
                Ok(1)
            }
        }

        Commands::Schema => {
            println!("{}", recette_core::schema::generate_schema());
            Ok(0)
        }
    }
}

/// Config file, then `RECETTE_API_URL`, then command-line flags.
fn load_config(target: &TargetArgs) -> Result<Config> {
    let mut cfg = if let Some(path) = &target.config {
        Config::load(Path::new(path))?
    } else {
        Config::load_default()?
    };
    if let Some(fixtures) = &target.fixtures {
        cfg.fixtures = PathBuf::from(fixtures);
    }
    let cfg = cfg
        .with_env()
        .with_base_url_override(target.base_url.clone());
    debug!(
        base_url = cfg.base_url.as_deref().unwrap_or("<unset>"),
        fixtures = %cfg.fixtures.display(),
        routes = ?target.route,
        "config resolved"
    );
    Ok(cfg)
}

fn build_plan(cfg: &Config, routes: &[String]) -> DryRunPlan {
    match Corpus::load(&cfg.fixtures) {
        Ok(corpus) => DryRunPlan::build(cfg, &corpus.retain_routes(routes)),
        Err(e) => {
            let mut plan = DryRunPlan::build(cfg, &Corpus::default());
            // A missing file is already reported by the fixtures check
            if cfg.fixtures.exists() {
                plan.push_validation("corpus", ValidationStatus::Error, e.to_string());
            }
            plan
        }
    }
}

fn print_plan(plan: &DryRunPlan, output: OutputFormat) -> Result<i32> {
    match output {
        OutputFormat::Terminal => {
            println!("{}", plan.to_terminal());
            if plan.has_errors() {
                eprintln!("\nPlan has errors, a run would not succeed.");
            } else if plan.has_warnings() {
                eprintln!("\nPlan has warnings, review them before running.");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Silent => {}
    }
    Ok(i32::from(plan.has_errors()))
}

fn print_terminal(report: &RunReport, verdict: &Verdict) {
    let mut current_route = "";
    for outcome in &report.outcomes {
        if outcome.route != current_route {
            current_route = outcome.route.as_str();
            println!("\n{current_route}");
        }
        println!("  {}", outcome_line(outcome));
    }

    let failures: Vec<&Outcome> = report.failures().collect();
    if !failures.is_empty() {
        println!("\nFailures ({}):", failures.len());
        for outcome in failures {
            let Some(failure) = &outcome.failure else {
                continue;
            };
            println!("  {} ({})", outcome.identifier, failure.kind);
            println!("         {}", failure.message);
            for d in &outcome.disagreements {
                println!("         - {d}");
            }
        }
    }

    println!("\n{}: {}", verdict.status, verdict.reason);
    println!(
        "  Cases: {} total, {} passed, {} failed, {} skipped",
        report.total, report.passed, report.failed, report.skipped
    );
    println!("  Exit code: {}", verdict.exit_code);
}

fn outcome_line(outcome: &Outcome) -> String {
    let mut line = format!("{} {}", outcome.status, outcome.identifier);
    match outcome.status {
        CaseStatus::Passed => {
            if let Some(count) = outcome.record_count {
                line.push_str(&format!(" ({count} records)"));
            }
        }
        CaseStatus::Failed => {
            if let Some(failure) = &outcome.failure {
                line.push_str(&format!(" - {}", failure.kind));
            }
        }
        CaseStatus::Skipped => {}
    }
    if let Some(note) = &outcome.note {
        line.push_str(&format!(" [{note}]"));
    }
    line
}

/// Generate .http reproduction file
fn write_reproductions(report: &RunReport, output_dir: &Path) {
    let http_path = output_dir.join("reproductions.http");
    let written = std::fs::create_dir_all(output_dir)
        .and_then(|()| std::fs::write(&http_path, to_http_file(&report.outcomes, "base_url")));
    match written {
        Ok(()) => println!("Reproductions: {}", http_path.display()),
        Err(e) => eprintln!("Warning: failed to write .http file: {e}"),
    }
}
