use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use secretsweep::health::CheckResult;
use secretsweep::{
    select_targets, Config, Credentials, GitHubApi, HealthCheck, ListScope, ReportWriter,
    RepositoryLister, RunContext, ScanEngine, ScanSummary, ScannerCommand,
};

#[derive(Parser)]
#[command(name = "secretsweep")]
#[command(about = "Scan every repository of a GitHub account or organization for leaked secrets")]
#[command(version)]
struct Cli {
    /// GitHub API token (falls back to GITHUB_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// GitHub username, used together with --password
    #[arg(short, long)]
    user: Option<String>,

    /// GitHub password, used together with --user
    #[arg(short, long)]
    password: Option<String>,

    /// GitHub organization to limit the scan to
    #[arg(short, long)]
    org: Option<String>,

    /// Also scan private repositories (cloned over ssh)
    #[arg(short = 'a', long, alias = "scan_private")]
    scan_private: bool,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scanner executable, overrides scanner.program
    #[arg(long)]
    scanner: Option<String>,

    /// Directory for report files, overrides reports.directory
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Number of concurrent scans, overrides scan.max_parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the repositories that would be scanned and exit
    #[arg(long)]
    list: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    init_logging(cli.verbose, &config.logging.level)?;
    info!("Starting secretsweep v{}", env!("CARGO_PKG_VERSION"));

    // No network traffic before credentials are known to be present
    let credentials = Credentials::resolve(cli.token, cli.user, cli.password)?;
    let scope = ListScope::from_org(cli.org);

    let context = RunContext::new(&config.reports.prefix, config.reports_directory());
    let scanner = ScannerCommand::from_config(&config);

    if !cli.list {
        preflight(&scanner, &context)?;
    }

    println!("🔍 Fetching list of repositories to check");
    let lister = RepositoryLister::new(
        GitHubApi::new(&config.github, credentials)?,
        config.github.max_pages,
    );
    let repositories = lister.list(&scope).await?;
    let targets = select_targets(&repositories, cli.scan_private);

    if cli.list {
        println!("Repositories ({}):", targets.len());
        for target in &targets {
            println!("  📁 {}", target.url);
        }
        return Ok(());
    }

    println!("📦 Preparing to check {} repositories", targets.len());

    let engine = ScanEngine::new(
        scanner,
        ReportWriter::new(context),
        config.scan.max_parallel,
    );
    let summary = engine.run(targets).await;

    print_summary(&summary);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let default_level = if verbose { "debug" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(scanner) = &cli.scanner {
        config.scanner.program = scanner.clone();
    }
    if let Some(dir) = &cli.reports_dir {
        config.reports.directory = dir.to_string_lossy().into_owned();
    }
    if let Some(jobs) = cli.jobs {
        config.scan.max_parallel = jobs;
    }
}

/// Abort on failed checks, print warnings and continue
fn preflight(scanner: &ScannerCommand, context: &RunContext) -> Result<()> {
    let health = HealthCheck::run(scanner, context);

    for warning in health.warnings() {
        print_check("⚠️ ", warning);
    }

    if !health.all_passed() {
        for error in health.errors() {
            print_check("❌", error);
        }
        return Err(anyhow!("Preflight checks failed"));
    }

    Ok(())
}

fn print_check(icon: &str, result: &CheckResult) {
    println!("{} {}", icon, result.message);
    if let Some(details) = &result.details {
        for line in details.lines() {
            println!("   {}", line);
        }
    }
}

/// Print the flagged repositories, if any
fn print_summary(summary: &ScanSummary) {
    if let Some(report) = summary.problem_report() {
        println!();
        for line in report.lines() {
            println!("❌ {}", line);
        }
        if let Some(path) = &summary.report_path {
            println!("   Report: {}", path.display());
        }
    }

    if summary.errored > 0 || summary.report_failures > 0 {
        warn!(
            "{} repositories could not be scanned, {} report entries failed to write",
            summary.errored, summary.report_failures
        );
    }
}
