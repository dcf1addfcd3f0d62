mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mneme::config::MnemeConfig;
use mneme::engine::MemoryEngine;

#[derive(Parser)]
#[command(name = "mneme", version, about = "Per-profile semantic memory for conversational agents")]
struct Cli {
    /// Profile to operate on (defaults to `[storage] default_profile`)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Config file (defaults to ~/.mneme/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show memory statistics
    Stats {
        /// List every profile found under the base directory
        #[arg(long)]
        all: bool,
    },
    /// Ranked recall for a query
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Only entries carrying one of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Only entries of these types (event, fact, conversation, observation, summary)
        #[arg(long = "type")]
        entry_types: Vec<String>,
        #[arg(long, conflicts_with = "long_term_only")]
        short_term_only: bool,
        #[arg(long)]
        long_term_only: bool,
    },
    /// Print the prompt-injection block for a query
    Context {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the full context as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a memory
    Remember {
        content: String,
        #[arg(short, long)]
        importance: Option<f64>,
        #[arg(long)]
        long_term: bool,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "type")]
        entry_type: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Expire the memory after this many days
        #[arg(long)]
        ttl_days: Option<f64>,
    },
    /// Delete a memory by ID
    Forget { id: String },
    /// Delete every memory similar to a topic
    ForgetAbout {
        topic: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Prune expired entries and archive decayed ones
    Consolidate,
    /// Show full details of a memory
    Inspect { id: String },
    /// Export the profile as JSON to stdout
    Export,
    /// Import memories from an export file
    Import { file: PathBuf },
    /// Delete every memory of the profile (asks for confirmation)
    Reset,
    /// Check the profile's store files
    Doctor,
    /// Recompute every embedding from content
    ReEmbed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MnemeConfig::load_from(path)?,
        None => MnemeConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let profile = cli
        .profile
        .clone()
        .unwrap_or_else(|| config.storage.default_profile.clone());
    let mut engine = MemoryEngine::new(config)?;
    engine.switch_profile(&profile);

    match cli.command {
        Command::Stats { all } => cli::stats::stats(&mut engine, all)?,
        Command::Search {
            query,
            top_k,
            tags,
            entry_types,
            short_term_only,
            long_term_only,
        } => cli::search::search(
            &mut engine,
            &query,
            top_k,
            &tags,
            &entry_types,
            (!long_term_only, !short_term_only),
        )?,
        Command::Context { query, top_k, json } => {
            cli::search::context(&mut engine, &query, top_k, json)?
        }
        Command::Remember {
            content,
            importance,
            long_term,
            tags,
            entry_type,
            source,
            ttl_days,
        } => cli::remember::remember(
            &mut engine,
            cli::remember::RememberArgs {
                content,
                importance,
                long_term,
                tags,
                entry_type,
                source,
                ttl_days,
            },
        )?,
        Command::Forget { id } => cli::forget::forget(&mut engine, &id)?,
        Command::ForgetAbout { topic, threshold } => {
            cli::forget::forget_about(&mut engine, &topic, threshold)?
        }
        Command::Consolidate => cli::maintenance::consolidate(&mut engine)?,
        Command::Inspect { id } => cli::inspect::inspect(&mut engine, &id)?,
        Command::Export => cli::export::export(&mut engine)?,
        Command::Import { file } => cli::import::import(&mut engine, &file)?,
        Command::Reset => cli::reset::reset(&mut engine)?,
        Command::Doctor => cli::doctor::doctor(&mut engine)?,
        Command::ReEmbed => cli::re_embed::re_embed(&mut engine)?,
    }

    Ok(())
}
