#![forbid(unsafe_code)]
//! Query the explorer views from the terminal

use chainscope::aggregator::Aggregator;
use chainscope::block::Block;
use chainscope::config::{load_config, Mode};
use chainscope::error::ExplorerError;
use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,
    /// Print the JSON envelope instead of a table
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest execution-layer block
    Block,
    /// Look up a transaction by hash
    Tx {
        /// 32-byte transaction hash, hex
        hash: String,
    },
    /// Latest block with the latest epoch and its slots
    Snapshot,
    /// Current epoch, slot and epoch progress
    Epoch,
    /// Most recent epochs
    Epochs,
    /// Most recent beacon block headers
    Blocks,
    /// Head block and its predecessors
    Walk {
        /// Number of blocks, head included
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if matches!(cli.command, Commands::Block | Commands::Tx { .. } | Commands::Walk { .. }) {
        // execution-only commands do not need a beacon endpoint
        config.server.mode = Mode::ExecutionOnly;
    }
    let aggregator = Aggregator::from_config(&config)?;

    match cli.command {
        Commands::Block => {
            let Some(block) = report(aggregator.latest_block().await, cli.json)? else {
                return Ok(());
            };
            print_blocks(&[block]);
        }
        Commands::Tx { hash } => match aggregator.transaction(&hash).await {
            Ok(Some(tx)) if cli.json => print_json(&tx)?,
            Ok(Some(tx)) => {
                let mut table = new_table(vec!["Field", "Value"]);
                let block = tx
                    .block_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "pending".to_string());
                table.add_row(vec!["Hash".to_string(), tx.hash]);
                table.add_row(vec!["Block".to_string(), block]);
                table.add_row(vec!["From".to_string(), tx.from]);
                table.add_row(vec![
                    "To".to_string(),
                    tx.to.unwrap_or_else(|| "contract creation".to_string()),
                ]);
                table.add_row(vec!["Value (wei)".to_string(), tx.value]);
                table.add_row(vec!["Gas".to_string(), tx.gas]);
                table.add_row(vec!["Nonce".to_string(), tx.nonce.to_string()]);
                println!("{table}");
            }
            Ok(None) => {
                println!("{}", format!("Transaction {} not found", hash).yellow());
            }
            Err(e) => return Err(fail(e)),
        },
        Commands::Snapshot => {
            let Some(snapshot) = report(aggregator.latest_snapshot().await, cli.json)? else {
                return Ok(());
            };
            println!(
                "{}",
                format!(
                    "Epoch {} | eligible {} | voted {}",
                    snapshot.epoch.epoch,
                    snapshot.epoch.eligible_ether.as_deref().unwrap_or("-"),
                    snapshot.epoch.voted_ether.as_deref().unwrap_or("-"),
                )
                .bright_cyan()
                .bold()
            );
            print_blocks(&[snapshot.block]);

            let mut table = new_table(vec!["Slot", "Proposer", "Body root", "Canonical"]);
            for slot in snapshot.slots {
                table.add_row(vec![
                    Cell::new(slot.slot),
                    Cell::new(slot.proposer_index),
                    Cell::new(shorten(&slot.body_root)),
                    canonical_cell(slot.canonical),
                ]);
            }
            println!("{table}");
        }
        Commands::Epoch => {
            let Some(info) = report(aggregator.epoch_info().await, cli.json)? else {
                return Ok(());
            };
            println!("{} {}", "Epoch:".bright_cyan(), info.current_epoch);
            println!("{} {}", "Slot: ".bright_cyan(), info.current_slot);
            println!(
                "{} {}%",
                "Progress:".bright_cyan(),
                info.epoch_progress.to_string().green().bold()
            );
        }
        Commands::Epochs => {
            let Some(epochs) = report(aggregator.recent_epochs().await, cli.json)? else {
                return Ok(());
            };
            let mut table = new_table(vec!["Epoch", "Time", "Finalized", "Eligible", "Voted"]);
            for epoch in epochs {
                table.add_row(vec![
                    Cell::new(epoch.epoch),
                    Cell::new(epoch.time),
                    Cell::new(epoch.finalized),
                    Cell::new(epoch.eligible.unwrap_or_default()),
                    Cell::new(epoch.voted.unwrap_or_default()),
                ]);
            }
            println!("{table}");
        }
        Commands::Blocks => {
            let Some(blocks) = report(aggregator.recent_blocks().await, cli.json)? else {
                return Ok(());
            };
            let mut table = new_table(vec!["Epoch", "Slot", "Block", "Status", "Time", "Proposer"]);
            for block in blocks {
                table.add_row(vec![
                    Cell::new(block.epoch),
                    Cell::new(block.slot),
                    Cell::new(shorten(&block.block)),
                    canonical_cell(block.status == "Proposed"),
                    Cell::new(block.time),
                    Cell::new(block.proposer),
                ]);
            }
            println!("{table}");
        }
        Commands::Walk { count } => {
            let Some(blocks) = report(aggregator.latest_blocks(count).await, cli.json)? else {
                return Ok(());
            };
            print_blocks(&blocks);
        }
    }

    Ok(())
}

/// Prints the envelope in `--json` mode; otherwise hands the value back for
/// table rendering.
fn report<T: Serialize>(
    result: Result<T, ExplorerError>,
    json: bool,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let value = result.map_err(fail)?;
    if json {
        print_json(&value)?;
        return Ok(None);
    }
    Ok(Some(value))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let envelope = serde_json::json!({ "success": true, "data": value });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn fail(err: ExplorerError) -> Box<dyn std::error::Error> {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
    Box::new(err)
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(TableColor::Cyan)),
        );
    table
}

fn canonical_cell(canonical: bool) -> Cell {
    if canonical {
        Cell::new("Proposed").fg(TableColor::Green)
    } else {
        Cell::new("Not Proposed").fg(TableColor::Red)
    }
}

fn shorten(hash: &str) -> String {
    if hash.len() > 20 {
        format!("{}...{}", &hash[..10], &hash[hash.len() - 6..])
    } else {
        hash.to_string()
    }
}

fn print_blocks(blocks: &[Block]) {
    let mut table = new_table(vec!["Number", "Hash", "Time", "Gas used", "Base fee", "Txs"]);
    for block in blocks {
        let time = chrono::DateTime::from_timestamp(block.timestamp as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| block.timestamp.to_string());
        table.add_row(vec![
            Cell::new(block.number),
            Cell::new(shorten(&block.hash)),
            Cell::new(time),
            Cell::new(&block.gas_used),
            Cell::new(block.base_fee_per_gas.as_deref().unwrap_or("-")),
            Cell::new(block.transactions.len()),
        ]);
    }
    println!("{table}");
}
