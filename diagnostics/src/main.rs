use backend::{BackendClient, HttpBackend};
use clap::{Parser, Subcommand};
use diagnostics::{
    default_registry, render_live_line, render_report, DiagnosticRunner, DiagnosticsConfig,
    ReportFormat, TestCategory, TestResult, TestStatus, TestSummary,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Parser)]
#[command(name = "diagnostics")]
#[command(about = "Health checks for the Pet Coach backend services")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tests
    List {
        /// Only show tests in this category
        #[arg(long)]
        category: Option<TestCategory>,
    },
    /// Run tests and print a report
    Run {
        /// Run a single test by id
        #[arg(long, conflicts_with_all = ["category", "critical"])]
        test: Option<String>,
        /// Run every test in a category
        #[arg(long, conflicts_with = "critical")]
        category: Option<TestCategory>,
        /// Run only the critical tests
        #[arg(long)]
        critical: bool,
        /// Report format (text or json)
        #[arg(short, long, default_value = "text")]
        format: ReportFormat,
        /// Suppress live progress lines
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show the derived test suites
    Suites,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = DiagnosticsConfig::load(cli.config.as_deref())?;
    let client: Arc<dyn BackendClient> = Arc::new(HttpBackend::new(config.backend_config())?);
    info!("Using backend at {}", config.backend.base_url);

    let registry = default_registry(client, config.thresholds, config.access_token.clone())?;
    let runner = DiagnosticRunner::new(registry);

    match cli.command {
        Commands::List { category } => list_tests(&runner, category),
        Commands::Suites => list_suites(&runner),
        Commands::Run {
            test,
            category,
            critical,
            format,
            quiet,
        } => {
            let subscription = (!quiet).then(|| runner.subscribe(live_printer()));

            let results = if let Some(id) = test {
                vec![runner.run_test(&id).await?]
            } else if let Some(category) = category {
                runner.run_tests_by_category(category).await
            } else if critical {
                runner.run_critical_tests().await
            } else {
                runner.run_all_tests().await
            };

            if let Some(subscription) = subscription {
                subscription.unsubscribe();
            }

            let summary = TestSummary::from_results(&results);
            println!("{}", render_report(&results, &summary, format)?);
            std::process::exit(summary.exit_code());
        }
    }

    Ok(())
}

fn list_tests(runner: &DiagnosticRunner, category: Option<TestCategory>) {
    let tests = runner
        .registry()
        .get_all()
        .iter()
        .filter(|t| category.is_none_or(|c| t.category == c));

    for test in tests {
        println!(
            "{:<4} {:<28} {:<8} {}",
            test.category.meta().tag,
            test.id,
            if test.critical { "critical" } else { "" },
            test.name
        );
        if !test.description.is_empty() {
            println!("     {}", test.description);
        }
    }
}

fn list_suites(runner: &DiagnosticRunner) {
    for suite in runner.get_test_suites() {
        println!("{} ({}): {}", suite.name, suite.id, suite.description);
        for test in &suite.tests {
            println!("  {} {}", test.status.badge().symbol, test.id);
        }
    }
}

/// Prints one line whenever a test changes status.
fn live_printer() -> impl Fn(&[TestResult]) + Send + Sync + 'static {
    let seen: Mutex<HashMap<String, TestStatus>> = Mutex::new(HashMap::new());
    move |results| {
        let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
        for result in results {
            if seen.get(&result.id) != Some(&result.status) {
                seen.insert(result.id.clone(), result.status);
                if result.status != TestStatus::Idle {
                    eprintln!("{}", render_live_line(result));
                }
            }
        }
    }
}
