use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use nitro_cli::OutputFormat;
use nitro_cli::commands::tree::{TableLocation, parse_number};
use nitro_formats::nitrofs::{DEFAULT_MAX_DEPTH, DecodeOptions};

#[derive(Parser)]
#[command(
    name = "nitro",
    about = "Inspect, extract, and pack Nintendo DS NARC archives and NitroFS trees",
    version,
    author
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show section sizes, the allocation table, and name records of a NARC
    Info {
        /// Archive to inspect
        input: PathBuf,
    },

    /// Extract every file of a NARC into a directory
    Extract {
        /// Archive to read
        input: PathBuf,
        /// Destination directory (created if missing)
        output: PathBuf,
    },

    /// Pack the files of a directory, in name order, into a NARC
    Pack {
        /// Directory of files to pack
        input: PathBuf,
        /// Archive to write
        output: PathBuf,
    },

    /// Print the NitroFS directory tree of a ROM image
    Tree {
        /// ROM image
        input: PathBuf,
        /// Offset of the file allocation table
        #[arg(long, value_parser = parse_number)]
        fat_offset: u64,
        /// Size of the file allocation table in bytes
        #[arg(long, value_parser = parse_number)]
        fat_size: u64,
        /// Offset of the filename table
        #[arg(long, value_parser = parse_number)]
        fnt_offset: u64,
        /// Deepest directory nesting to accept
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, conflicts_with = "no_depth_limit")]
        max_depth: usize,
        /// Decode without a nesting limit (trusted images only)
        #[arg(long)]
        no_depth_limit: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { input } => nitro_cli::handle_info(&input, cli.format)?,
        Commands::Extract { input, output } => {
            nitro_cli::handle_extract(&input, &output, cli.format)?;
        }
        Commands::Pack { input, output } => nitro_cli::handle_pack(&input, &output, cli.format)?,
        Commands::Tree {
            input,
            fat_offset,
            fat_size,
            fnt_offset,
            max_depth,
            no_depth_limit,
        } => {
            let location = TableLocation {
                fat_offset,
                fat_size: u32::try_from(fat_size)?,
                fnt_offset,
            };
            let options = DecodeOptions::default()
                .with_max_depth((!no_depth_limit).then_some(max_depth));
            nitro_cli::handle_tree(&input, location, options, cli.format)?;
        }
    }

    Ok(())
}
