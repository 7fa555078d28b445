//! rustlitreview - literature search counts across Scopus, IEEE Xplore and Web of Science
//!
//! ## Usage
//!
//! ### Count mode
//! Counts every keyword and every 3-keyword combination from the input file,
//! ranks the combinations and writes the per-provider JSON plus a consolidated
//! report.
//! ```bash
//! rustlitreview --count --scopus --wos
//! ```
//!
//! ### Extended mode
//! Runs a single free-text query and saves the raw results.
//! ```bash
//! rustlitreview --extended --ieee --query "machine learning AND healthcare" --all
//! ```

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use rustlitreview::engine::{ProviderRun, SearchEngine};
use rustlitreview::filters::{FilterSet, SearchFilters};
use rustlitreview::ieee::IeeeAdapter;
use rustlitreview::input::{InputConfig, DEFAULT_INPUT_FILE};
use rustlitreview::provider::{Adapter, Credential, Provider, ProviderConfig};
use rustlitreview::report::{self, ReportMeta};
use rustlitreview::scopus::ScopusAdapter;
use rustlitreview::sink::LogSink;
use rustlitreview::transport::{HttpTransport, Transport};
use rustlitreview::wos::WosAdapter;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Literature review search counts across Scopus, IEEE Xplore and Web of Science
#[derive(Parser)]
#[command(name = "rustlitreview")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Count mode: keywords and 3-keyword combinations
    #[arg(short, long, conflicts_with = "extended")]
    count: bool,

    /// Extended mode: one query, full results
    #[arg(short, long)]
    extended: bool,

    /// Use Scopus
    #[arg(long)]
    scopus: bool,

    /// Use IEEE Xplore
    #[arg(long)]
    ieee: bool,

    /// Use Web of Science
    #[arg(long)]
    wos: bool,

    /// Input file with keywords and filters
    #[arg(long, default_value = DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Output directory
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Skip fetching document titles for the TOP 30
    #[arg(long)]
    no_titles: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Extended mode query
    #[arg(long, default_value = "machine learning AND systematic review")]
    query: String,

    /// Extended mode: results from this year onwards
    #[arg(long)]
    year_from: Option<i32>,

    /// Extended mode: results up to this year
    #[arg(long)]
    year_to: Option<i32>,

    /// Extended mode: page through all results
    #[arg(long)]
    all: bool,

    /// Extended mode: cap for --all
    #[arg(long, default_value_t = 200)]
    max_results: usize,

    /// Extended mode: records in a single page
    #[arg(long, default_value_t = 25)]
    records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Count,
    Extended,
}

#[derive(Debug, Clone)]
struct ExtendedSettings {
    query: String,
    years: SearchFilters,
    all: bool,
    max_results: usize,
    records: usize,
}

/// Everything a run needs, resolved before any request is sent.
#[derive(Debug, Clone)]
struct RunSettings {
    mode: Mode,
    providers: Vec<Provider>,
    input: PathBuf,
    output_dir: PathBuf,
    fetch_titles: bool,
    extended: ExtendedSettings,
}

impl RunSettings {
    fn log_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }
}

fn resolve_settings(cli: Cli) -> Result<RunSettings> {
    let mode = if cli.count {
        Mode::Count
    } else if cli.extended {
        Mode::Extended
    } else {
        prompt_mode()?
    };

    let mut providers: Vec<Provider> = [
        (cli.scopus, Provider::Scopus),
        (cli.ieee, Provider::Ieee),
        (cli.wos, Provider::Wos),
    ]
    .into_iter()
    .filter(|(selected, _)| *selected)
    .map(|(_, p)| p)
    .collect();
    if providers.is_empty() {
        providers = Provider::ALL.to_vec();
    }

    Ok(RunSettings {
        mode,
        providers,
        input: cli.input,
        output_dir: cli.output_dir,
        fetch_titles: !cli.no_titles,
        extended: ExtendedSettings {
            query: cli.query,
            years: SearchFilters::new(cli.year_from, cli.year_to),
            all: cli.all,
            max_results: cli.max_results,
            records: cli.records,
        },
    })
}

fn prompt_mode() -> Result<Mode> {
    println!("\n--- Select mode ---");
    println!("1. Count (keywords and 3-keyword combinations)");
    println!("2. Extended (single query, full results)");
    print!("\nMode (1 or 2, default 1): ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read mode")?;
    match line.trim() {
        "" | "1" => Ok(Mode::Count),
        "2" => Ok(Mode::Extended),
        other => bail!("Invalid mode: {}", other),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_json);

    let settings = resolve_settings(cli)?;
    info!(mode = ?settings.mode, providers = ?settings.providers, "Starting");

    let input = InputConfig::load(&settings.input)
        .with_context(|| format!("Failed to load {}", settings.input.display()))?;

    let authenticated = authenticate(&settings);
    if authenticated.is_empty() {
        bail!("No provider could be authenticated; set SCOPUS_API_KEY, IEEE_API_KEY or WOS_API_KEY");
    }

    let transport = HttpTransport::new().context("Failed to create HTTP client")?;
    match settings.mode {
        Mode::Count => run_count(&transport, &input, &settings, authenticated).await,
        Mode::Extended => run_extended(&transport, &input, &settings, authenticated).await,
    }
}

fn init_tracing(debug: bool, json: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Credentials for the selected providers; failures are skipped.
fn authenticate(settings: &RunSettings) -> Vec<(ProviderConfig, Credential)> {
    let mut authenticated = Vec::new();
    for provider in &settings.providers {
        let config = ProviderConfig::new(*provider, &settings.output_dir);
        match Credential::from_env(&config) {
            Ok(credential) => {
                info!(provider = %provider, key = %credential, "Authenticated");
                authenticated.push((config, credential));
            }
            Err(e) => warn!("Skipping {}: {}", provider.display_name(), e),
        }
    }
    authenticated
}

// ============================================================================
// Count mode
// ============================================================================

async fn run_count<T: Transport>(
    transport: &T,
    input: &InputConfig,
    settings: &RunSettings,
    authenticated: Vec<(ProviderConfig, Credential)>,
) -> Result<()> {
    let mut runs = Vec::new();
    for (config, credential) in authenticated {
        let run = match config.provider {
            Provider::Scopus => {
                let adapter = ScopusAdapter::new(config, credential);
                count_provider(transport, &adapter, input, &input.scopus, settings).await?
            }
            Provider::Ieee => {
                let adapter = IeeeAdapter::new(config, credential);
                count_provider(transport, &adapter, input, &input.ieee, settings).await?
            }
            Provider::Wos => {
                let adapter = WosAdapter::new(config, credential)?;
                count_provider(transport, &adapter, input, &input.wos, settings).await?
            }
        };
        runs.push(run);
    }

    let meta = ReportMeta {
        input_file: settings.input.display().to_string(),
        keyword_count: input.keywords.len(),
        years: input.years(),
        generated_at: Local::now(),
    };
    let path = report::write_consolidated(&settings.output_dir, &runs, &meta)
        .context("Failed to write consolidated report")?;

    println!("\n{}", "=".repeat(80));
    println!("  CONSOLIDATED REPORT");
    println!("{}", "=".repeat(80));
    println!("File: {}", path.display());
    println!(
        "APIs included: {}",
        runs.iter()
            .map(|r| r.provider.id())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for line in report::console_preview(&runs) {
        println!("{}", line);
    }
    Ok(())
}

async fn count_provider<T: Transport, A: Adapter>(
    transport: &T,
    adapter: &A,
    input: &InputConfig,
    filters: &A::Filters,
    settings: &RunSettings,
) -> Result<ProviderRun> {
    let sink = LogSink::create(&settings.log_dir(), adapter.provider(), "count")
        .context("Failed to create run log")?;
    let mut engine = SearchEngine::new(transport, sink);
    let run = engine
        .run_count_mode(adapter, &input.keywords, filters, settings.fetch_titles)
        .await;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let document = report::counts_document(
        &run,
        filters,
        &settings.input.display().to_string(),
        &timestamp,
    )?;
    let counts_file = &adapter.config().counts_file;
    report::write_json(counts_file, &document)
        .with_context(|| format!("Failed to write {}", counts_file.display()))?;

    let log_file = engine.sink().path().map(Path::to_path_buf);
    let summary = report::final_summary_lines(
        &run,
        input.keywords.len(),
        counts_file,
        log_file.as_deref(),
    );
    let sink = engine.sink_mut();
    sink.header("FINAL SUMMARY");
    for line in summary {
        sink.write_line(line);
    }
    engine.finish()?;

    Ok(run)
}

// ============================================================================
// Extended mode
// ============================================================================

async fn run_extended<T: Transport>(
    transport: &T,
    input: &InputConfig,
    settings: &RunSettings,
    authenticated: Vec<(ProviderConfig, Credential)>,
) -> Result<()> {
    let years = settings.extended.years;
    for (config, credential) in authenticated {
        match config.provider {
            Provider::Scopus => {
                let adapter = ScopusAdapter::new(config, credential);
                let filters = input.scopus.with_year_overrides(years);
                extended_provider(transport, &adapter, &filters, settings).await?
            }
            Provider::Ieee => {
                let adapter = IeeeAdapter::new(config, credential);
                let filters = input.ieee.with_year_overrides(years);
                extended_provider(transport, &adapter, &filters, settings).await?
            }
            Provider::Wos => {
                let adapter = WosAdapter::new(config, credential)?;
                let filters = input.wos.with_year_overrides(years);
                extended_provider(transport, &adapter, &filters, settings).await?
            }
        }
    }
    Ok(())
}

async fn extended_provider<T: Transport, A: Adapter>(
    transport: &T,
    adapter: &A,
    filters: &A::Filters,
    settings: &RunSettings,
) -> Result<()> {
    let ext = &settings.extended;
    let provider = adapter.provider();
    let sink = LogSink::create(&settings.log_dir(), provider, "extended")
        .context("Failed to create run log")?;
    let mut engine = SearchEngine::new(transport, sink);
    engine.sink_mut().header(&format!(
        "EXTENDED MODE - {}",
        provider.display_name().to_uppercase()
    ));
    engine.sink_mut().write_line(format!("Query: {}", ext.query));

    let (output, titles) = if ext.all {
        let entries = engine
            .search_all(adapter, &ext.query, filters, ext.max_results)
            .await;
        let titles = adapter.extract_titles(&entries);
        let output = json!({
            "api": provider.id(),
            "query": ext.query,
            "filters": serde_json::to_value(filters)?,
            "total_results": entries.len(),
            "entries": entries,
        });
        (output, titles)
    } else {
        let response = match engine
            .search_page(adapter, &ext.query, filters, ext.records, true)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(provider = %provider, "Search failed: {}", e);
                engine.finish()?;
                return Ok(());
            }
        };
        let entries = adapter.parse_entries(&response);
        let sink = engine.sink_mut();
        sink.header("SEARCH RESULTS");
        sink.write_line(format!(
            "Total results: {}",
            report::thousands(adapter.parse_total_count(&response))
        ));
        sink.write_line(format!("Showing: {}", entries.len()));
        (response, adapter.extract_titles(&entries))
    };

    let sink = engine.sink_mut();
    if !titles.is_empty() {
        sink.write_line("");
        sink.write_line("First 5 results:");
        for (i, title) in titles.iter().take(5).enumerate() {
            sink.write_line(format!("  {}. {}", i + 1, report::ellipsize(title, 80)));
        }
    }

    let results_file = &adapter.config().results_file;
    report::write_json(results_file, &output)
        .with_context(|| format!("Failed to write {}", results_file.display()))?;
    engine
        .sink_mut()
        .write_line(format!("\nResults saved to: {}", results_file.display()));
    engine.finish()?;
    Ok(())
}
