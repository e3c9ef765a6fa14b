//! z21-export: dump a `.z21` file as JSON
//!
//! # Usage
//!
//! ```bash
//! # Whole file, pretty-printed to stdout
//! z21-export rocoData.z21
//!
//! # Address, name and function count per locomotive, written to a file
//! z21-export z21_new.z21 --summary -o summary.json
//!
//! # Two locomotives only, single line
//! z21-export z21_new.z21 --address 3 --address 218 --compact
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use z21::export::{self, Summary};
use z21::{DuplicatePolicy, HybridPolicy, LoadOptions, Z21Loader};

/// Export Z21 locomotive data as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the .z21 file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write JSON here instead of stdout
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Only address, name and function count per locomotive
    #[arg(long)]
    summary: bool,

    /// Only export these addresses (repeatable)
    #[arg(long = "address", value_name = "N")]
    addresses: Vec<u16>,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,

    /// Which locomotive wins when two share an address
    #[arg(long, value_enum, default_value_t = Duplicates::First)]
    duplicates: Duplicates,

    /// Which payload to read when the archive holds both
    #[arg(long, value_enum, default_value_t = Hybrid::Sqlite)]
    hybrid: Hybrid,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Duplicates {
    First,
    Last,
    Reject,
}

impl From<Duplicates> for DuplicatePolicy {
    fn from(value: Duplicates) -> Self {
        match value {
            Duplicates::First => DuplicatePolicy::KeepFirst,
            Duplicates::Last => DuplicatePolicy::KeepLast,
            Duplicates::Reject => DuplicatePolicy::Reject,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Hybrid {
    Sqlite,
    Xml,
    Reject,
}

impl From<Hybrid> for HybridPolicy {
    fn from(value: Hybrid) -> Self {
        match value {
            Hybrid::Sqlite => HybridPolicy::PreferSqlite,
            Hybrid::Xml => HybridPolicy::PreferXml,
            Hybrid::Reject => HybridPolicy::Reject,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let options = LoadOptions::new()
        .with_duplicate_addresses(args.duplicates.into())
        .with_hybrid(args.hybrid.into());
    let loaded = Z21Loader::with_options(options).load(&args.input)?;

    let mut file = loaded.file;
    if !args.addresses.is_empty() {
        file = export::select_addresses(&file, &args.addresses);
    }

    let pretty = !args.compact;
    match &args.output {
        Some(path) => {
            let out = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write(&file, args.summary, BufWriter::new(out), pretty)?;
        }
        None => write(&file, args.summary, std::io::stdout().lock(), pretty)?,
    }
    Ok(())
}

fn write(
    file: &z21::Z21File,
    summary: bool,
    out: impl std::io::Write,
    pretty: bool,
) -> z21::Result<()> {
    if summary {
        export::to_writer(&Summary::of(file), out, pretty)
    } else {
        export::to_writer(file, out, pretty)
    }
}
