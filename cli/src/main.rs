//! vestdrop: resumable token distribution from a single sender account.

mod config;
mod interrupt;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use vestdrop_chain::{RpcChainClient, SenderAccount};
use vestdrop_engine::{
    squash, write_list, AllocationList, AuditCsv, AuditLog, DistributionMode, Distributor,
    ListSummary, RunOutcome, RunStateStore, StopSignal,
};
use vestdrop_utils::{init_tracing, LogFormat};

use crate::config::{DistributorConfig, SignerRef};

#[derive(Parser)]
#[command(name = "vestdrop", about = "Resumable vested token distribution")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true, env = "VESTDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "VESTDROP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "VESTDROP_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Distribute an allocation list, resuming where the last run stopped.
    Run(RunArgs),

    /// Print the entry count and total of an allocation list.
    Info {
        /// Allocation list (defaults to the configured one).
        list: Option<PathBuf>,
    },

    /// Merge duplicate recipients of an allocation list.
    Squash {
        input: PathBuf,
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Allocation list to distribute.
    #[arg(long, env = "VESTDROP_ALLOCATION_FILE")]
    allocations: Option<PathBuf>,

    /// Node JSON-RPC endpoint.
    #[arg(long, env = "VESTDROP_NODE_URL")]
    node_url: Option<String>,

    /// Sender account address.
    #[arg(long, env = "VESTDROP_SENDER")]
    sender: Option<String>,

    /// Signer key reference resolved by the node.
    #[arg(long, env = "VESTDROP_SIGNER", hide_env_values = true)]
    signer: Option<String>,

    /// "vested" or "transfer-only".
    #[arg(long, env = "VESTDROP_MODE")]
    mode: Option<DistributionMode>,

    #[arg(long, env = "VESTDROP_TGE_BLOCK")]
    tge_block: Option<u64>,

    #[arg(long, env = "VESTDROP_STATE_FILE")]
    state_file: Option<PathBuf>,

    #[arg(long, env = "VESTDROP_STOP_FILE")]
    stop_file: Option<PathBuf>,

    #[arg(long, env = "VESTDROP_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[arg(long, env = "VESTDROP_CSV_FILE")]
    csv_file: Option<PathBuf>,

    /// Seconds to wait for a transaction to reach a terminal status.
    #[arg(long, env = "VESTDROP_TX_TIMEOUT_SECS")]
    tx_timeout_secs: Option<u64>,

    /// Seconds of countdown before the first payment.
    #[arg(long, env = "VESTDROP_CONFIRMATION_DELAY_SECS")]
    confirmation_delay_secs: Option<u64>,

    /// Milliseconds between transaction status polls.
    #[arg(long, env = "VESTDROP_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Write the audit log and CSV without submitting any transaction.
    #[arg(long, env = "VESTDROP_DRY_RUN")]
    dry_run: bool,
}

impl RunArgs {
    /// Layer these flags over `config`.
    fn apply(self, config: &mut DistributorConfig) {
        if let Some(v) = self.allocations {
            config.allocation_file = Some(v);
        }
        if let Some(v) = self.node_url {
            config.node_url = v;
        }
        if let Some(v) = self.sender {
            config.sender = Some(v);
        }
        if let Some(v) = self.signer {
            config.signer = SignerRef::new(v);
        }
        if let Some(v) = self.mode {
            config.mode = v;
        }
        if let Some(v) = self.tge_block {
            config.tge_block = v;
        }
        if let Some(v) = self.state_file {
            config.state_file = v;
        }
        if let Some(v) = self.stop_file {
            config.stop_file = v;
        }
        if let Some(v) = self.log_file {
            config.log_file = v;
        }
        if let Some(v) = self.csv_file {
            config.csv_file = v;
        }
        if let Some(v) = self.tx_timeout_secs {
            config.tx_timeout_secs = v;
        }
        if let Some(v) = self.confirmation_delay_secs {
            config.confirmation_delay_secs = v;
        }
        if let Some(v) = self.poll_interval_ms {
            config.poll_interval_ms = v;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => DistributorConfig::from_toml_file(path)?,
        None => DistributorConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_tracing(&config.log_level, LogFormat::parse(&config.log_format));
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            run(&config).await
        }
        Command::Info { list } => {
            let path = match list {
                Some(path) => path,
                None => config.allocation_file()?.to_path_buf(),
            };
            info(&path)
        }
        Command::Squash { input, output } => squash_list(&input, &output),
    }
}

async fn run(config: &DistributorConfig) -> anyhow::Result<()> {
    let run_config = config.run_config()?;
    let allocation_file = config.allocation_file()?;
    let sender = SenderAccount::new(config.sender()?, config.signer()?);

    let list = AllocationList::load(allocation_file)?;
    tracing::info!(
        "Distributing {} entries from {} in {} mode via {}",
        list.len(),
        list.id(),
        config.mode,
        config.node_url,
    );
    if config.dry_run {
        println!("Dry run: nothing will be submitted and the run state is left untouched.");
    }

    let chain = RpcChainClient::connect(&config.node_url, config.poll_interval())
        .await
        .with_context(|| format!("connecting to {}", config.node_url))?;

    let stop = StopSignal::with_file(&config.stop_file);
    let listener = interrupt::spawn_listener(stop.clone());

    let mut distributor = Distributor::new(
        &chain,
        &sender,
        run_config,
        RunStateStore::new(&config.state_file),
        stop,
        AuditLog::open(&config.log_file, true)?,
        AuditCsv::new(&config.csv_file),
    );
    let result = distributor.run(&list).await;
    listener.abort();
    let summary = result?;

    match summary.outcome {
        RunOutcome::Done { processed } => {
            println!("Done: {processed} recipient(s) processed, list complete.");
        }
        RunOutcome::Stopped {
            processed,
            next_index,
        } => {
            println!("Stopped after {processed} recipient(s); next run starts at {next_index}.");
        }
        RunOutcome::Cancelled => {
            println!("Cancelled before any transfer.");
        }
    }
    let failed: Vec<_> = summary
        .reports
        .iter()
        .filter(|r| !r.all_succeeded())
        .map(|r| r.index.to_string())
        .collect();
    if !failed.is_empty() {
        println!("Recipients with failed transactions: {}", failed.join(", "));
    }
    Ok(())
}

fn info(path: &Path) -> anyhow::Result<()> {
    let list = AllocationList::load(path)?;
    let ListSummary {
        entries,
        unique_recipients,
        total,
    } = list.summary();
    println!("Address count: {entries}");
    println!("Unique addresses: {unique_recipients}");
    println!("Total: {total}");
    Ok(())
}

fn squash_list(input: &Path, output: &Path) -> anyhow::Result<()> {
    let list = AllocationList::load(input)?;
    let squashed = squash(list.entries())?;
    write_list(output, &squashed)?;

    let summary = list.summary();
    println!("Squashing recipient addresses");
    println!("Original entries: {}", summary.entries);
    println!("Unique addresses: {}", squashed.len());
    println!("Total: {}", summary.total);
    tracing::info!(input = %input.display(), output = %output.display(), "allocation list squashed");
    Ok(())
}
