//! Hydra portal inspection binary.
//!
//! Loads an outline JSON file into the in-memory host and runs one engine
//! operation against it.
//!
//! Usage:
//!   # Show what a portal of notes/fruit would render
//!   cargo run -p hydra-cli -- tree outline.json notes fruit --max-depth 3
//!
//!   # Where a new mirror under notes/apple would attach
//!   cargo run -p hydra-cli -- place outline.json notes apple
//!
//!   # Validate an auto-reorg config
//!   cargo run -p hydra-cli -- config auto_reorg.ron
//!
//! Logs go to stderr; set RUST_LOG=hydra_portal=debug for engine detail.

mod outline;
mod tree;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use hydra_blocks::BlockHost;
use hydra_portal::{AutoReorgConfig, count_visible_nodes, determine_placement, fetch_subtree};
use hydra_types::{SourceRef, SubtreeOptions};

/// Inspect portal subtrees, placement, and auto-reorg config.
#[derive(Parser, Debug)]
#[command(name = "hydra-portal")]
#[command(about = "Inspect Hydra outlines through the portal engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the visible subtree a portal of DOCUMENT/BLOCK would show
    Tree {
        /// Outline JSON file
        outline: PathBuf,
        document: String,
        block: String,

        /// Deepest level to materialize (root is 0)
        #[arg(long, default_value_t = hydra_types::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Materialize children of collapsed nodes too
        #[arg(long)]
        include_collapsed: bool,

        /// Longest bullet summary before truncation
        #[arg(long, default_value_t = 60)]
        width: usize,

        /// Print the fetch result as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Print where a new mirror under DOCUMENT/BULLET would attach
    Place {
        /// Outline JSON file
        outline: PathBuf,
        document: String,
        bullet: String,

        /// Print the placement as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Print a validated (clamped) auto-reorg config
    Config {
        /// RON config file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // stdout carries command output; logs go to stderr.
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Tree {
            outline: file,
            document,
            block,
            max_depth,
            include_collapsed,
            width,
            json,
        } => {
            let host = outline::load_host(&file)?;
            let options = SubtreeOptions::default()
                .with_max_depth(max_depth)
                .with_include_collapsed(include_collapsed);
            let source = SourceRef::new(document, block);
            let result = fetch_subtree(&host, &source, options);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            let Some(root) = result.root.as_ref() else {
                bail!("{}: {}", source, result.error.as_deref().unwrap_or("source not found"));
            };
            for line in tree::format_subtree(root, width) {
                println!("{line}");
            }
            println!();
            println!(
                "{} nodes fetched, {} visible{}",
                result.total_nodes,
                count_visible_nodes(root),
                if result.depth_limited {
                    format!(", depth limited at {max_depth}")
                } else {
                    String::new()
                }
            );
        }

        Command::Place {
            outline: file,
            document,
            bullet,
            json,
        } => {
            let host = outline::load_host(&file)?;
            let source = SourceRef::new(document, bullet);
            let block = host
                .resolve_block(&source)
                .with_context(|| format!("bullet {source} not found"))?;
            let placement = determine_placement(block.as_ref());
            tracing::info!(bullet = %source, reason = %placement.reason, "placement decided");

            if json {
                println!("{}", serde_json::to_string_pretty(&placement)?);
                return Ok(());
            }

            println!("parent: {}", placement.parent_block_id);
            println!("index:  {}", placement.insert_index);
            match placement.descriptor {
                Some(kind) => println!("reason: {} ({})", placement.reason, kind),
                None => println!("reason: {}", placement.reason),
            }
        }

        Command::Config { path } => {
            let config = AutoReorgConfig::load(&path)
                .with_context(|| format!("loading config {}", path.display()))?;
            let text = config.to_ron_string().context("rendering config")?;
            println!("{text}");
        }
    }

    Ok(())
}
