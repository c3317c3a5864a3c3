//! LLM Navigator - How often do AI assistants cite your website?
//!
//! A CLI tool that asks an LLM the questions your customers ask, measures
//! how often the target site is cited, ranks the competitors cited instead
//! and tracks the score across runs.
//!
//! Exit codes:
//!   0 - Success (score at or above --fail-below, or no --fail-below set)
//!   1 - Runtime error (connection, config, store, etc.)
//!   2 - Score below the --fail-below threshold
//!   3 - Trial denied (--trial-signals)

mod analysis;
mod cli;
mod config;
mod models;
mod provider;
mod report;
mod session;
mod store;
mod trial;

use analysis::{
    build_analysis, compare_with_history, top_competitor_share, AnalysisRequest, Evaluation,
};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Analysis, AnalysisResult, SimulationParams};
use provider::{CachedProvider, ClientConfig, OllamaClient, QueryOutcome};
use report::{Report, ReportOptions};
use session::{Capability, RoleResolver, Session, SessionState};
use std::path::{Path, PathBuf};
use std::time::Instant;
use store::{AnalysisRepository, FileStore, KeyValueStore, MemoryStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("LLM Navigator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .llmnav.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set your keywords, model and admin emails.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch to the requested command. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if let Some(ref path) = args.trial_signals {
        return handle_trial_signals(path);
    }

    let resolver = RoleResolver::new(&config.access.admin_emails);
    let mut state = SessionState::default();
    let session = session::login(&mut state, &config.general.user, &resolver)
        .with_context(|| format!("Cannot start a session for '{}'", config.general.user))?;
    debug!("Capabilities: {:?}", session.capabilities());

    let store = FileStore::open(&config.general.store_path)
        .with_context(|| format!("Failed to open store {}", config.general.store_path))?;
    let mut repository = AnalysisRepository::new(store);

    let result = if args.history {
        handle_history(&repository, &session, &config, args.all_users)
    } else if let Some(ref id) = args.delete {
        handle_delete(&mut repository, &session, id)
    } else if let Some(ref id) = args.show {
        handle_show(&repository, &session, &config, &args, id)
    } else {
        run_analysis(args, config, &session, &mut repository).await
    };

    state.logout();
    result
}

/// Run a full analysis of `--site`. Returns exit code (0 or 2).
async fn run_analysis(
    args: Args,
    config: Config,
    session: &Session,
    repository: &mut AnalysisRepository<FileStore>,
) -> Result<i32> {
    let start_time = Instant::now();

    if !session.can(Capability::RunAnalysis) {
        anyhow::bail!("{} is not allowed to run analyses", session.email);
    }

    let site = args.site.clone().unwrap_or_default();
    let keywords = gather_keywords(&args, &config)?;
    if keywords.is_empty() {
        anyhow::bail!(
            "No queries given. Use --keyword, --keywords-file or [analysis].keywords in {}",
            CONFIG_FILE
        );
    }

    let request = AnalysisRequest {
        user_id: session.user_id.clone(),
        website: site.clone(),
        keywords: keywords.clone(),
        mode: args.mode.into(),
        top_competitors: config.analysis.top_competitors,
        context_cap: config.analysis.context_cap,
    };

    // Step 1: Gather citation data
    let (source, provider_label, failed) = if args.simulate {
        let seed = args.seed.unwrap_or_else(rand::random);
        println!("🎲 Simulating {} queries (seed {})...", keywords.len(), seed);
        warn!("Using simulated data; scores are not measured");

        let source = AnalysisResult::Simulated {
            seed,
            params: SimulationParams::from(&config.simulation),
        };
        (source, format!("simulated (seed {})", seed), Vec::new())
    } else {
        println!("🤖 Querying AI provider...");
        println!("   Model: {}", config.provider.model);
        println!("   Ollama: {}", config.provider.ollama_url);
        println!("   Queries: {}", keywords.len());
        println!("   Concurrency: {}", config.provider.concurrency);

        let outcome = query_provider(&config, &site, &keywords, args.quiet).await?;
        if !outcome.failed.is_empty() {
            println!(
                "   ⚠️  {} of {} queries failed",
                outcome.failed.len(),
                keywords.len()
            );
        }

        let source = AnalysisResult::Real {
            results: outcome.results,
        };
        (source, config.provider.model.clone(), outcome.failed)
    };

    // Step 2: Score
    println!("\n📐 Scoring citations...");
    let evaluation = build_analysis(&request, source);

    let previous = repository.previous_for(
        &session.user_id,
        &evaluation.analysis.website,
        evaluation.analysis.created_at,
    )?;
    let trend = compare_with_history(&evaluation.analysis, previous.as_ref());

    // Step 3: Record
    if args.no_save {
        info!("--no-save given, analysis not recorded");
    } else {
        repository
            .save(&evaluation.analysis)
            .context("Failed to record analysis")?;
        info!("Recorded analysis {}", evaluation.analysis.id);
    }

    // Step 4: Report
    println!("\n📝 Generating report...");
    let duration = start_time.elapsed().as_secs_f64();
    let report = Report::new(
        evaluation,
        trend,
        previous.map(|p| p.score),
        provider_label,
        failed,
        duration,
    );
    let output_path = write_report(&report, &args, &config)?;

    print_summary(&report);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        if report.analysis.score < threshold {
            eprintln!(
                "\n⛔ Score {} is below {}. Failing (exit code 2).",
                report.analysis.score, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Query the configured Ollama model, with a response cache in front.
///
/// With `cache_responses` the cache is a file next to the history store;
/// otherwise a per-run memory cache only collapses duplicate queries.
async fn query_provider(
    config: &Config,
    site: &str,
    keywords: &[String],
    quiet: bool,
) -> Result<QueryOutcome> {
    let client = OllamaClient::new(ClientConfig {
        ollama_url: config.provider.ollama_url.clone(),
        model_name: config.provider.model.clone(),
        temperature: config.provider.temperature,
        timeout_seconds: config.provider.timeout_seconds,
    })?;

    let progress = if quiet {
        None
    } else {
        let pb = ProgressBar::new(keywords.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let outcome = if config.provider.cache_responses {
        let cache_path = response_cache_path(&config.general.store_path);
        debug!("Response cache: {}", cache_path.display());
        let cache = FileStore::open(&cache_path)
            .with_context(|| format!("Failed to open response cache {}", cache_path.display()))?;
        query_with_cache(client, cache, config, site, keywords, progress.as_ref()).await
    } else {
        let cache = MemoryStore::with_capacity(keywords.len().max(1));
        query_with_cache(client, cache, config, site, keywords, progress.as_ref()).await
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    outcome
}

async fn query_with_cache<S: KeyValueStore>(
    client: OllamaClient,
    cache: S,
    config: &Config,
    site: &str,
    keywords: &[String],
    progress: Option<&ProgressBar>,
) -> Result<QueryOutcome> {
    let provider = CachedProvider::new(client, cache);
    provider::query_citations(
        &provider,
        site,
        keywords,
        config.provider.concurrency,
        progress,
    )
    .await
}

/// The response cache lives beside the history store.
fn response_cache_path(store_path: &str) -> PathBuf {
    let store_path = Path::new(store_path);
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("responses.json"),
        _ => PathBuf::from("responses.json"),
    }
}

/// Collect queries from the keywords file, falling back to flags/config.
fn gather_keywords(args: &Args, config: &Config) -> Result<Vec<String>> {
    let mut keywords: Vec<String> = config.analysis.keywords.clone();

    if let Some(ref path) = args.keywords_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keywords file: {}", path.display()))?;
        keywords.extend(parse_keywords_file(&content));
    }

    let mut unique = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_string();
        if !keyword.is_empty() && !unique.contains(&keyword) {
            unique.push(keyword);
        }
    }

    Ok(unique)
}

/// One query per line; blank lines and `#` comments are ignored.
fn parse_keywords_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Render the report in the requested format and write it out.
fn write_report(report: &Report, args: &Args, config: &Config) -> Result<PathBuf> {
    let options = ReportOptions::from(&config.report);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report, &options),
    };

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));

    std::fs::write(&path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(path)
}

fn print_summary(report: &Report) {
    let trend = &report.trend;

    println!("\n📊 Analysis Summary:");
    println!("   Website: {}", report.analysis.website);
    println!(
        "   Score: {} ({} mode)",
        report.analysis.score, report.analysis.mode
    );
    println!("   Citations: {}", report.citation.summary());
    match report.previous_score {
        Some(previous) => println!(
            "   Trend: {} {} ({} vs {})",
            trend.direction.emoji(),
            trend.direction,
            trend.signed_delta(),
            previous
        ),
        None => println!("   Trend: first analysis of this site"),
    }
    if let Some(top) = report.competitors.first() {
        println!(
            "   Top competitor: {} ({} citations, {}% of competitor mentions)",
            top.domain,
            top.count,
            top_competitor_share(&report.competitors)
        );
    }
    if report.analysis.simulated {
        println!("   ⚠️  Simulated data");
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
}

/// Handle --history: list past analyses, most recent first.
fn handle_history(
    repository: &AnalysisRepository<FileStore>,
    session: &Session,
    config: &Config,
    all_users: bool,
) -> Result<i32> {
    let limit = config.analysis.history_limit;
    let analyses = if all_users {
        repository.list_all(session, limit)?
    } else {
        if !session.can(Capability::ViewOwnHistory) {
            anyhow::bail!("{} is not allowed to view history", session.email);
        }
        repository.list_for_user(&session.user_id, limit)?
    };

    if analyses.is_empty() {
        println!("No analyses recorded yet.");
        return Ok(0);
    }

    println!("📜 {} analyses:\n", analyses.len());
    for analysis in &analyses {
        println!("   {}", format_history_line(analysis, all_users));
    }

    Ok(0)
}

fn format_history_line(analysis: &Analysis, with_user: bool) -> String {
    let mut line = format!(
        "{}  {}  {:<28} {:>3}  {}",
        analysis.short_id(),
        analysis.created_at.format("%Y-%m-%d %H:%M"),
        analysis.website,
        analysis.score,
        analysis.mode
    );
    if analysis.simulated {
        line.push_str("  (simulated)");
    }
    if with_user {
        line.push_str(&format!("  [{}]", analysis.user_id));
    }
    line
}

/// Handle --delete: remove a past analysis by id or id prefix.
fn handle_delete(
    repository: &mut AnalysisRepository<FileStore>,
    session: &Session,
    id: &str,
) -> Result<i32> {
    let id = repository.resolve_id(id)?;
    let removed = repository.delete(id, session)?;

    println!(
        "🗑️  Deleted analysis {} of {} ({})",
        removed.short_id(),
        removed.website,
        removed.created_at.format("%Y-%m-%d %H:%M")
    );
    Ok(0)
}

/// Handle --show: regenerate the report of a past analysis.
fn handle_show(
    repository: &AnalysisRepository<FileStore>,
    session: &Session,
    config: &Config,
    args: &Args,
    id: &str,
) -> Result<i32> {
    let id = repository.resolve_id(id)?;
    let analysis = repository
        .get(id)?
        .with_context(|| format!("Analysis {} disappeared from the store", id))?;

    let own = analysis.user_id == session.user_id;
    if !own && !session.can(Capability::ViewAllAnalyses) {
        anyhow::bail!("Analysis {} belongs to another user", analysis.short_id());
    }

    let previous =
        repository.previous_for(&analysis.user_id, &analysis.website, analysis.created_at)?;
    let trend = compare_with_history(&analysis, previous.as_ref());
    let provider_label = if analysis.simulated {
        "simulated".to_string()
    } else {
        "recorded".to_string()
    };

    let evaluation = Evaluation::from_analysis(
        analysis,
        config.analysis.top_competitors,
        config.analysis.context_cap,
    );
    let report = Report::new(
        evaluation,
        trend,
        previous.map(|p| p.score),
        provider_label,
        Vec::new(),
        0.0,
    );
    let path = write_report(&report, args, config)?;

    print_summary(&report);
    println!("\n✅ Report saved to: {}", path.display());
    Ok(0)
}

/// Handle --trial-signals: evaluate trial eligibility from a JSON file.
fn handle_trial_signals(path: &Path) -> Result<i32> {
    let gathered = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read signals file: {}", path.display()))
        .and_then(|content| {
            serde_json::from_str::<trial::TrialSignals>(&content)
                .with_context(|| format!("Failed to parse signals file: {}", path.display()))
        });

    let decision = trial::evaluate_trial_outcome(gathered);
    match decision {
        trial::TrialDecision::Allow => println!("✅ Trial allowed"),
        trial::TrialDecision::Deny(reason) => println!("⛔ Trial denied: {}", reason),
    }
    println!("{}", serde_json::to_string(&decision)?);

    Ok(if decision.is_allowed() { 0 } else { 3 })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
