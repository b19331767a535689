//! smsx-ops - SMS field experiment pipeline
//!
//! One subcommand per stage. Stages run one at a time, single-threaded,
//! each reading and writing CSV tables in the data folder.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use smsx_common::config::{load_toml_config, resolve_config_path, TomlConfig};
use smsx_ops::config::{resolve_data_folder, resolve_rebrandly_settings, resolve_twilio_settings};
use smsx_ops::services::{
    ClickAggregator, LinkProvisioner, MessageDispatcher, RawLayout, RebrandlyClient,
    SendConfirmation, TwilioClient,
};
use smsx_ops::stages::{self, StagePaths};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for smsx-ops
#[derive(Parser, Debug)]
#[command(name = "smsx-ops")]
#[command(about = "Survey cleaning, random assignment, SMS dispatch and click collection")]
#[command(version)]
struct Cli {
    /// Config file (default: $SMSX_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the stage tables
    #[arg(long, global = true)]
    data_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the raw survey export into one row per unique subject
    Normalize(NormalizeArgs),
    /// Create tracking links and assign treatment/control for one run
    Provision(ProvisionArgs),
    /// Send the experiment message for one run (sends real texts)
    Dispatch(DispatchArgs),
    /// Send one plain message to every subject (sends real texts)
    Broadcast(BroadcastArgs),
    /// Download click counts for every link on the account
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Phone column index; setting it replaces the default survey layout
    #[arg(long)]
    phone_column: Option<usize>,
    #[arg(long, requires = "phone_column")]
    timestamp_column: Option<usize>,
    #[arg(long, requires = "phone_column")]
    consent_column: Option<usize>,
}

#[derive(Args, Debug)]
struct ProvisionArgs {
    /// Experiment label, e.g. A
    #[arg(long)]
    label: String,
    /// Campaign URL every short link points at
    #[arg(long)]
    url: String,
    /// Probability of assignment to treatment
    #[arg(long, default_value_t = 0.5)]
    p: f64,
    /// Seed for reproducible assignment
    #[arg(long)]
    seed: Option<u64>,
    /// Branded short link domain
    #[arg(long)]
    domain: Option<String>,
    /// Replace an existing assignment table for this label
    #[arg(long)]
    force: bool,
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DispatchArgs {
    #[arg(long)]
    label: String,
    /// Message text; the short link is appended
    #[arg(long)]
    message: String,
    /// Image sent to the treatment arm
    #[arg(long)]
    media_url: String,
    /// Number of rows you expect to send; must match the table exactly
    #[arg(long)]
    confirm: usize,
    /// Send even if a results file for this run already exists
    #[arg(long)]
    force: bool,
    /// Sender number
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BroadcastArgs {
    /// Name used for the results file
    #[arg(long)]
    name: String,
    #[arg(long)]
    message: String,
    /// Number of subjects you expect to message; must match exactly
    #[arg(long)]
    confirm: usize,
    #[arg(long)]
    force: bool,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Estimated number of links on the account; omit to read until the list ends
    #[arg(long)]
    expected_total: Option<u64>,
    /// Links per request (default from config)
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let toml_config = load_toml_config(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting smsx-ops v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = &config_path {
        info!("Config: {}", path.display());
    }

    let data_folder = resolve_data_folder(cli.data_folder.as_deref(), &toml_config);
    info!("Data folder: {}", data_folder.display());
    let paths = StagePaths::new(data_folder);

    match cli.command {
        Command::Normalize(args) => normalize(args, &paths),
        Command::Provision(args) => provision(args, &paths, &toml_config).await,
        Command::Dispatch(args) => dispatch(args, &paths, &toml_config).await,
        Command::Broadcast(args) => broadcast(args, &paths, &toml_config).await,
        Command::Aggregate(args) => aggregate(args, &paths, &toml_config).await,
    }
}

fn normalize(args: NormalizeArgs, paths: &StagePaths) -> Result<()> {
    let input = args.input.unwrap_or_else(|| paths.raw_responses());
    let output = args.output.unwrap_or_else(|| paths.subjects());
    let layout = args.phone_column.map(|phone_column| RawLayout {
        phone_column,
        timestamp_column: args.timestamp_column,
        consent_column: args.consent_column,
    });

    let outcome = stages::run_normalize(&input, &output, layout)?;

    println!(
        "normalize: {} subjects written to {} ({} invalid, {} duplicate rows dropped)",
        outcome.table.len(),
        output.display(),
        outcome.dropped_invalid,
        outcome.dropped_duplicate
    );
    Ok(())
}

async fn provision(args: ProvisionArgs, paths: &StagePaths, toml_config: &TomlConfig) -> Result<()> {
    let settings = resolve_rebrandly_settings(args.domain.as_deref(), toml_config)?;
    let client = RebrandlyClient::new(settings).context("Failed to create Rebrandly client")?;
    let provisioner = LinkProvisioner::new(Arc::new(client));

    let input = args.input.unwrap_or_else(|| paths.subjects());
    let output = args.output.unwrap_or_else(|| paths.assignments(&args.label));
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let assignments = stages::run_provision(
        &provisioner,
        &input,
        &output,
        &args.url,
        args.p,
        &args.label,
        &mut rng,
        args.force,
    )
    .await?;

    let treated = assignments.iter().filter(|a| a.treatment.is_treated()).count();
    let failed = assignments.iter().filter(|a| a.shortlink.is_failed()).count();
    println!(
        "provision: {} assignments ({} treatment, {} link failures) written to {}",
        assignments.len(),
        treated,
        failed,
        output.display()
    );
    Ok(())
}

async fn dispatch(args: DispatchArgs, paths: &StagePaths, toml_config: &TomlConfig) -> Result<()> {
    let dispatcher = build_dispatcher(args.source.as_deref(), toml_config)?;

    let input = args.input.unwrap_or_else(|| paths.assignments(&args.label));
    let output = args.output.unwrap_or_else(|| paths.deliveries(&args.label));

    let results = stages::run_dispatch(
        &dispatcher,
        &input,
        &output,
        &args.message,
        &args.media_url,
        SendConfirmation::for_batch(args.confirm),
        args.force,
    )
    .await?;

    let delivered = results.iter().filter(|r| r.success).count();
    println!(
        "dispatch: {}/{} messages accepted, results written to {}",
        delivered,
        results.len(),
        output.display()
    );
    Ok(())
}

async fn broadcast(args: BroadcastArgs, paths: &StagePaths, toml_config: &TomlConfig) -> Result<()> {
    let dispatcher = build_dispatcher(args.source.as_deref(), toml_config)?;

    let input = args.input.unwrap_or_else(|| paths.subjects());
    let output = args.output.unwrap_or_else(|| paths.broadcast(&args.name));

    let results = stages::run_broadcast(
        &dispatcher,
        &input,
        &output,
        &args.message,
        SendConfirmation::for_batch(args.confirm),
        args.force,
    )
    .await?;

    let delivered = results.iter().filter(|r| r.success).count();
    println!(
        "broadcast: {}/{} messages accepted, results written to {}",
        delivered,
        results.len(),
        output.display()
    );
    Ok(())
}

async fn aggregate(args: AggregateArgs, paths: &StagePaths, toml_config: &TomlConfig) -> Result<()> {
    let settings = resolve_rebrandly_settings(None, toml_config)?;
    let client = RebrandlyClient::new(settings).context("Failed to create Rebrandly client")?;
    let aggregator = ClickAggregator::new(Arc::new(client));

    let output = args.output.unwrap_or_else(|| paths.clicks());
    let page_size = args.page_size.unwrap_or(toml_config.shortener.page_size);

    let report = stages::run_aggregate(&aggregator, &output, args.expected_total, page_size).await?;

    println!(
        "aggregate: {} links from {} pages ({:?}), written to {}",
        report.links.len(),
        report.pages_fetched,
        report.stop,
        output.display()
    );
    Ok(())
}

fn build_dispatcher(source_arg: Option<&str>, toml_config: &TomlConfig) -> Result<MessageDispatcher> {
    let (settings, source_number) = resolve_twilio_settings(source_arg, toml_config)?;
    let client = TwilioClient::new(settings).context("Failed to create Twilio client")?;
    Ok(MessageDispatcher::new(
        Arc::new(client),
        source_number,
        toml_config.messaging.country_code.clone(),
    ))
}
