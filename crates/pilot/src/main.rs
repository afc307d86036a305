//! Pilot command line entry point

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pilot::{cancel_pair, snapshot, Config, Fault, InMemoryControlPlane, Pilot};
use topology::{apply_shard_resources, plan_update, validate_topology, EntityRef};

/// Pilot - topology reconciler for managed database clusters
#[derive(Parser, Debug)]
#[command(name = "pilot")]
#[command(about = "Plan and apply topology changes for a managed database cluster")]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a desired topology and print diagnostics
    Validate {
        /// Desired topology (YAML or JSON)
        #[arg(short, long)]
        desired: PathBuf,
    },
    /// Print the ordered plan from observed to desired
    Plan {
        #[arg(short, long)]
        desired: PathBuf,
        /// Observed topology (YAML or JSON)
        #[arg(short, long)]
        observed: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Execute the plan
    Apply {
        #[arg(short, long)]
        desired: PathBuf,
        #[arg(short, long)]
        observed: PathBuf,
        /// Run against the in-memory control plane
        #[arg(long)]
        simulate: bool,
        /// Make the simulated operation on this entity fail (kind/name)
        #[arg(long)]
        fail_on: Vec<EntityRef>,
        /// Write the resulting topology here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::default();
    if let Some(path) = &args.config {
        let file = Config::from_file(path).with_context(|| format!("loading config {:?}", path))?;
        config.merge(file);
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }

    // Initialize logging
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Validate { desired } => validate(&desired).await,
        Command::Plan {
            desired,
            observed,
            format,
        } => plan(&desired, &observed, format).await,
        Command::Apply {
            desired,
            observed,
            simulate,
            fail_on,
            output,
        } => {
            if !simulate {
                bail!("only simulated runs are supported, pass --simulate");
            }
            apply(config, &desired, &observed, fail_on, output).await
        }
    }
}

async fn validate(desired: &Path) -> anyhow::Result<()> {
    let mut topology = snapshot::load(desired).await?;
    let mut diagnostics = validate_topology(&topology);
    diagnostics.extend(apply_shard_resources(&mut topology));

    if diagnostics.is_empty() {
        println!("ok: {} entities", topology.len());
        return Ok(());
    }
    println!("{}", diagnostics);
    if diagnostics.has_errors() {
        bail!("desired topology is invalid");
    }
    Ok(())
}

async fn plan(desired: &Path, observed: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let desired = snapshot::load(desired).await?;
    let observed = snapshot::load(observed).await?;

    let reconciliation = plan_update(&desired, &observed);
    if !reconciliation.diagnostics.is_empty() {
        eprintln!("{}", reconciliation.diagnostics);
    }
    let plan = match reconciliation.into_result() {
        Ok(plan) => plan,
        Err(_) => bail!("planning failed"),
    };

    match format {
        OutputFormat::Text => println!("{}", plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&plan)?),
    }
    Ok(())
}

async fn apply(
    config: Config,
    desired: &Path,
    observed: &Path,
    fail_on: Vec<EntityRef>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let desired = snapshot::load(desired).await?;
    let observed = snapshot::load(observed).await?;

    let control = Arc::new(InMemoryControlPlane::from_config(observed.clone(), &config.control));
    for target in fail_on {
        info!("Injecting failure for {}", target);
        control.inject(target, Fault::FailOnCompletion);
    }
    let pilot = Pilot::new(config, control.clone());

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further operations will be issued");
            cancel.cancel();
        }
    });
    let ctx = pilot.run_context(signal);

    let report = match pilot.apply(&desired, &observed, &ctx).await {
        Ok(report) => report,
        Err(diagnostics) => {
            eprintln!("{}", diagnostics);
            bail!("planning failed, nothing was applied");
        }
    };

    println!("{}", report);
    let result = control.snapshot().await;
    match &output {
        Some(path) => snapshot::save(path, &result).await?,
        None => print!("{}", serde_yaml::to_string(&result)?),
    }

    if !report.is_success() {
        bail!("apply stopped after {} operations", report.applied.len());
    }
    Ok(())
}
