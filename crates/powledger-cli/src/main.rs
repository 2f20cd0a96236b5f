use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use powledger_core::{
    constants::DEFAULT_DIFFICULTY, Block, Budget, Chain, ChainConfig, MiningStrategy,
};
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powledger")]
#[command(about = "Mine, inspect and tamper-test a proof-of-work hash chain")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine two blocks, tamper with the first one and validate
    Demo {
        /// Leading zero hex characters required per block
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: u32,
        /// Search nonces on all cores
        #[arg(long)]
        parallel: bool,
        /// Stop after printing the untouched chain
        #[arg(long)]
        no_tamper: bool,
    },
    /// Build a chain of freshly mined blocks and print or export it
    Mine {
        /// JSON chain config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        difficulty: Option<u32>,
        #[arg(long)]
        parallel: bool,
        /// Blocks to mine on top of genesis
        #[arg(long, default_value_t = 1)]
        blocks: u64,
        /// Transaction text, repeatable; every block carries the same list
        #[arg(long = "payload")]
        payloads: Vec<String>,
        /// Give up on a block after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print the chain as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo {
            difficulty,
            parallel,
            no_tamper,
        } => run_demo(difficulty, parallel, no_tamper),
        Command::Mine {
            config,
            difficulty,
            parallel,
            blocks,
            payloads,
            timeout_ms,
            json,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => ChainConfig::default(),
            };
            if let Some(difficulty) = difficulty {
                config.difficulty = difficulty;
            }
            if parallel {
                config.strategy = MiningStrategy::Parallel;
            }
            let timeout = timeout_ms.map(Duration::from_millis);
            run_mine(config, blocks, &payloads, timeout, json)
        }
    }
}

fn load_config(path: &Path) -> Result<ChainConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

fn run_demo(difficulty: u32, parallel: bool, no_tamper: bool) -> Result<()> {
    let strategy = if parallel {
        MiningStrategy::Parallel
    } else {
        MiningStrategy::Sequential
    };
    let mut chain = Chain::with_config(ChainConfig {
        strategy,
        ..ChainConfig::with_difficulty(difficulty)
    })?;

    let batches = [
        ["Transaction 1", "Transaction 2"],
        ["Transaction 3", "Transaction 4"],
    ];
    for (i, txs) in batches.iter().enumerate() {
        let index = i as u64 + 1;
        println!("Mining Block {index}...");
        let tip = chain.latest()?.hash.clone();
        chain.append(Block::new(index, txs.to_vec(), tip, None))?;
    }

    println!("\nBlockchain:");
    print_chain(&chain);

    if !no_tamper {
        println!("\nTampering with the blockchain...");
        if let Some(block) = chain.block_mut(1) {
            block.transactions = json!(["Fake Transaction"]);
            block.rehash();
        }
    }

    println!("\nValidating Blockchain...");
    match chain.validate() {
        Ok(()) => println!("Blockchain is valid!"),
        Err(err) => {
            println!("{err}");
            println!("Blockchain integrity compromised!");
        }
    }
    Ok(())
}

fn run_mine(
    config: ChainConfig,
    count: u64,
    payloads: &[String],
    timeout: Option<Duration>,
    as_json: bool,
) -> Result<()> {
    let mut chain = Chain::with_config(config)?;
    info!(difficulty = chain.difficulty(), count, "mining");

    for index in 1..=count {
        let txs = if payloads.is_empty() {
            vec![format!("Transaction {index}")]
        } else {
            payloads.to_vec()
        };
        let budget = match timeout {
            Some(timeout) => Budget::with_timeout(timeout),
            None => Budget::unbounded(),
        };
        chain
            .append_within(Block::new(index, txs, "", None), &budget)
            .with_context(|| format!("mining block {index}"))?;
    }
    chain.validate()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&chain)?);
    } else {
        print_chain(&chain);
    }
    Ok(())
}

fn print_chain(chain: &Chain) {
    for block in chain {
        println!("Block {}:", block.index);
        println!("Timestamp: {}", block.timestamp);
        println!("Transactions: {}", block.transactions);
        println!("Previous Hash: {}", block.previous_hash);
        println!("Hash: {}", block.hash);
        println!("Nonce: {}", block.nonce);
        println!("{}", "-".repeat(50));
    }
}
