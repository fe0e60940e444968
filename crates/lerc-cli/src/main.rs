/// LERC2 command-line tool. Inspect, validate, and decode `.lerc2` blobs.
///
/// # Command overview
///
/// ```text
/// lerc <COMMAND> [OPTIONS]
///
/// Commands:
///   inspect    Print the header of a blob
///   validate   Decode a blob fully and report whether it is well formed
///   decode     Write the decoded pixels as raw little-endian bytes
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log decoder progress to stderr (RUST_LOG overrides)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                 |
/// |------|-----------------------------------------|
/// | 0    | Success                                 |
/// | 1    | Error (I/O failure, invalid blob, etc.) |
///
/// Reports go to stdout, logs and errors to stderr.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_decode;
mod cmd_inspect;
mod cmd_validate;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The LERC2 raster blob tool.
#[derive(Parser)]
#[command(name = "lerc", version, about = "LERC2 raster blob CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder progress at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print the header of a blob.
    Inspect(InspectArgs),
    /// Decode a blob fully and report whether it is well formed.
    Validate(ValidateArgs),
    /// Write the decoded pixels as raw little-endian bytes.
    Decode(DecodeArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `lerc inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the blob file.
    pub file: PathBuf,

    /// Byte offset of the blob inside the file.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Print the header as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `lerc validate`.
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────┐
/// │ Flag          │ Effect                                       │
/// ├───────────────┼──────────────────────────────────────────────┤
/// │ --offset N    │ Validate the blob starting at byte N         │
/// │ --no-checksum │ Skip the Fletcher-32 comparison              │
/// └───────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the blob file.
    pub file: PathBuf,

    /// Byte offset of the blob inside the file.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Do not verify the stored checksum.
    #[arg(long)]
    pub no_checksum: bool,
}

/// Arguments for `lerc decode`.
#[derive(clap::Args)]
pub struct DecodeArgs {
    /// Path to the blob file.
    pub file: PathBuf,

    /// Where to write the raw pixel bytes.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Byte offset of the blob inside the file.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Verify the stored checksum before decoding.
    #[arg(long)]
    pub verify_checksum: bool,

    /// Refuse rasters with more pixels than this.
    #[arg(long)]
    pub max_pixels: Option<usize>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Decode(args) => cmd_decode::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
