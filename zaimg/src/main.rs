//! zaimg: exercise the zenadapters bindings from the command line.
//!
//! Identify, inspect, convert and stream images through the native and
//! image-rs adapters, or through the registry that tries both.

mod batch;
mod convert;
mod info;
mod stream;

use clap::{Parser, Subcommand, ValueEnum};
use zenadapters::{AdapterConfig, AdapterRegistry, ImageRsAdapter, NativeAdapter};

#[derive(Parser)]
#[command(name = "zaimg", version, about = "Inspect, convert and stream images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report which adapter claims each file.
    Identify(IdentifyArgs),

    /// Probe and display image metadata.
    Info(InfoArgs),

    /// Decode with one adapter and save in another format.
    Convert(Box<ConvertArgs>),

    /// List the extensions each adapter can save.
    Savers(SaversArgs),

    /// Decode row by row through a streaming session.
    Stream(StreamArgs),
}

/// Arguments for the `identify` subcommand.
#[derive(Parser, Debug)]
pub struct IdentifyArgs {
    /// Input files or glob patterns.
    #[arg(required = true)]
    pub files: Vec<String>,
}

/// Arguments for the `info` subcommand.
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Input files or glob patterns.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Restrict to one adapter.
    #[arg(short, long, value_enum)]
    pub adapter: Option<AdapterArg>,
}

/// Arguments for the `convert` subcommand.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input files or glob patterns.
    #[arg(required = true)]
    pub files: Vec<String>,

    // --- Output ---
    /// Output file or directory (dir/ with trailing slash for batch).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Filename suffix before extension (default: none).
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Allow overwriting existing files.
    #[arg(long)]
    pub force: bool,

    /// Show what would be done without writing files.
    #[arg(long)]
    pub dry_run: bool,

    // --- Format ---
    /// Target extension (png, jpg, bmp, ...). Defaults to the -o extension.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Restrict to one adapter.
    #[arg(short, long, value_enum)]
    pub adapter: Option<AdapterArg>,

    // --- Encoding ---
    /// JPEG quality (1-100).
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// PNG deflate effort.
    #[arg(long, value_enum)]
    pub compression: Option<CompressionArg>,

    /// Print a size report after converting.
    #[arg(long)]
    pub report: bool,
}

/// Arguments for the `savers` subcommand.
#[derive(Parser, Debug)]
pub struct SaversArgs {
    /// Restrict to one adapter.
    #[arg(short, long, value_enum)]
    pub adapter: Option<AdapterArg>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `stream` subcommand.
#[derive(Parser, Debug)]
pub struct StreamArgs {
    /// Input file.
    pub file: std::path::PathBuf,

    /// Restrict to one adapter.
    #[arg(short, long, value_enum)]
    pub adapter: Option<AdapterArg>,

    /// Read rows bottom to top.
    #[arg(long)]
    pub reverse: bool,

    /// Print the checksum of every row.
    #[arg(long)]
    pub rows: bool,
}

/// Adapter selection.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AdapterArg {
    Native,
    ImageRs,
}

/// PNG deflate effort.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompressionArg {
    Fast,
    Default,
    Best,
}

impl CompressionArg {
    pub fn to_png_compression(self) -> zenadapters::PngCompression {
        match self {
            CompressionArg::Fast => zenadapters::PngCompression::Fast,
            CompressionArg::Default => zenadapters::PngCompression::Default,
            CompressionArg::Best => zenadapters::PngCompression::Best,
        }
    }
}

/// Registry holding either every binding or just the selected one.
pub fn registry(adapter: Option<AdapterArg>, config: AdapterConfig) -> AdapterRegistry {
    match adapter {
        None => AdapterRegistry::with_config(config),
        Some(AdapterArg::Native) => {
            AdapterRegistry::none().register(NativeAdapter::with_config(config))
        }
        Some(AdapterArg::ImageRs) => {
            AdapterRegistry::none().register(ImageRsAdapter::with_config(config))
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Command::Identify(args) => info::identify(args),
        Command::Info(args) => info::run(args),
        Command::Convert(args) => convert::run(*args),
        Command::Savers(args) => info::savers(args),
        Command::Stream(args) => stream::run(args),
    }
}
