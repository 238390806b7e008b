//! CLI argument parsing and command dispatch

mod demo;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use planbench_core::{
    aggregate_thread_stats, OnSampleError, SampleListener, ThreadGroupBuilder, ThreadGroupConfig,
    TreeCompiler,
};
use planbench_report::{JsonLinesWriter, SummaryReport};
use planbench_storage::TextFile;

/// planbench - replay a test plan with many virtual users
#[derive(Parser, Debug)]
#[command(name = "planbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the built-in demo plan
    Run(RunArgs),
    /// Validate a thread group configuration file
    Validate {
        /// Path to configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Thread group configuration file (TOML); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of virtual users
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Ramp-up period in milliseconds
    #[arg(long)]
    pub ramp_up_ms: Option<u64>,

    /// Stop the group after this many seconds
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Per-thread samples per second
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// What a thread does after a failed sample
    #[arg(long, value_parser = parse_policy)]
    pub on_error: Option<OnSampleError>,

    /// Loop iterations per thread
    #[arg(short, long, default_value = "10")]
    pub loops: u64,

    /// Loop until stopped (Ctrl+C or --duration-secs)
    #[arg(long)]
    pub forever: bool,

    /// Report the transaction as one aggregate sample instead of its children
    #[arg(long)]
    pub parent_sample: bool,

    /// Mean simulated latency in milliseconds
    #[arg(long, default_value = "20")]
    pub latency_ms: f64,

    /// Probability that a simulated sample fails
    #[arg(long, default_value = "0.05")]
    pub failure_rate: f64,

    /// Think time before each sample, in milliseconds
    #[arg(long, default_value = "0")]
    pub think_ms: u64,

    /// Seed for think-time randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write every delivered result as JSON lines
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

fn parse_policy(value: &str) -> Result<OnSampleError, String> {
    match value {
        "continue" => Ok(OnSampleError::Continue),
        "stop_thread" | "stop-thread" => Ok(OnSampleError::StopThread),
        "stop_test" | "stop-test" => Ok(OnSampleError::StopTest),
        other => Err(format!(
            "unknown policy '{other}' (expected continue, stop_thread or stop_test)"
        )),
    }
}

impl Cli {
    /// Dispatch the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Run(args) => run(args).await,
            Commands::Validate { config } => validate(config),
        }
    }
}

fn load_config(path: &Path) -> Result<ThreadGroupConfig> {
    let text = TextFile::new(path)
        .get_text()
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: ThreadGroupConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

fn validate(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    println!("Configuration is valid:");
    println!("  Name:        {}", config.name);
    println!("  Threads:     {}", config.num_threads);
    println!("  Ramp-up:     {} ms", config.ramp_up_ms);
    if let Some(duration) = config.duration_secs {
        println!("  Duration:    {} s", duration);
    }
    if let Some(rps) = config.rate_limit {
        println!("  Rate limit:  {} samples/s per thread", rps);
    }
    println!("  On error:    {:?}", config.on_sample_error);
    Ok(())
}

fn group_config(args: &RunArgs) -> Result<ThreadGroupConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ThreadGroupConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.num_threads = threads;
    }
    if let Some(ramp_up) = args.ramp_up_ms {
        config.ramp_up_ms = ramp_up;
    }
    if args.duration_secs.is_some() {
        config.duration_secs = args.duration_secs;
    }
    if args.rate_limit.is_some() {
        config.rate_limit = args.rate_limit;
    }
    if let Some(policy) = args.on_error {
        config.on_sample_error = policy;
    }
    config.validate().context("Invalid thread group configuration")?;
    Ok(config)
}

async fn run(args: &RunArgs) -> Result<()> {
    let config = group_config(args)?;

    let tree = demo::build_plan(&demo::DemoOptions {
        loops: args.loops,
        forever: args.forever,
        parent_sample: args.parent_sample,
        latency_ms: args.latency_ms,
        failure_rate: args.failure_rate,
        think: Duration::from_millis(args.think_ms),
    })?;
    let plan = TreeCompiler::compile(&Arc::new(tree)).context("Failed to compile demo plan")?;
    tracing::info!(
        slots = plan.len(),
        samplers = plan.sampler_count(),
        "Compiled plan"
    );

    let summary = Arc::new(SummaryReport::new());
    let mut builder = ThreadGroupBuilder::new()
        .config(config.clone())
        .plan(Arc::new(plan))
        .listener(summary.clone());
    if let Some(path) = &args.output {
        let writer = JsonLinesWriter::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let writer: Arc<dyn SampleListener> = Arc::new(writer);
        builder = builder.listener(writer);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let mut group = builder.build().context("Failed to build thread group")?;

    println!("\n{}", "=".repeat(70));
    println!("   planbench - test plan runner");
    println!("{}", "=".repeat(70));
    println!("  Group:        {}", config.name);
    println!("  Threads:      {}", config.num_threads);
    println!(
        "  Loops:        {}",
        if args.forever {
            "forever".to_string()
        } else {
            args.loops.to_string()
        }
    );
    println!("  Parent mode:  {}", args.parent_sample);
    println!("{}\n", "=".repeat(70));

    group.start().context("Failed to start thread group")?;
    let stop = group.stop_handle();

    let signal_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                stop.stop();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        }
    });

    let stats = tokio::task::spawn_blocking(move || group.join())
        .await
        .context("Thread group join task failed")??;
    signal_handle.abort();

    let aggregated = aggregate_thread_stats(&stats);
    println!("{}", summary.render_table());
    println!(
        "Threads: {}  Samples: {}  Errors: {}  Transactions: {}  Duration: {:.2}s  Rate: {:.1}/s",
        aggregated.total_threads,
        aggregated.total_samples(),
        aggregated.total_errors,
        aggregated.total_transactions,
        aggregated.total_duration.as_secs_f64(),
        aggregated.samples_per_second
    );

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary.to_json())
            .context("Failed to serialize summary")?;
        TextFile::new(path)
            .set_text(&json)
            .with_context(|| format!("Failed to write summary: {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }

    Ok(())
}
