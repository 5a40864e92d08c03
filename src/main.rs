use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;

use wmc_lib::bitstream::ContainerReader;
use wmc_lib::source::Y4mSource;
use wmc_lib::{Encoder, EncoderConfig, Quality, Result, WmcError};

#[derive(Parser)]
#[command(name = "wmc")]
#[command(version = wmc_lib::VERSION)]
#[command(about = "Motion-compensated DCT video encoder", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Number of worker threads (0 = all cores)
    #[arg(short, long, global = true, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a YUV4MPEG2 stream into a WMC container
    Encode {
        /// Input .y4m file (4:4:4 colorspace)
        #[arg(short, long)]
        input: PathBuf,
        /// Output .wmc file
        #[arg(short, long)]
        output: PathBuf,
        /// Quantization quality, 1-100
        #[arg(short, long, default_value = "50")]
        quality: u8,
    },
    /// Inspect a WMC container
    Info {
        /// Input .wmc file
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .map_err(|e| WmcError::init(format!("failed to build thread pool: {}", e)))?;
        info!(threads = cli.threads, "using fixed-size thread pool");
    }

    match cli.command {
        Commands::Encode {
            input,
            output,
            quality,
        } => encode(&input, &output, quality),
        Commands::Info { input } => info_command(&input),
    }
}

fn encode(input: &PathBuf, output: &PathBuf, quality: u8) -> Result<()> {
    let quality = Quality::new(quality)?;
    info!(input = %input.display(), output = %output.display(), %quality, "encoding");

    let mut source = Y4mSource::new(BufReader::new(File::open(input)?))?;
    let sink = BufWriter::new(File::create(output)?);

    let encoder = Encoder::new(EncoderConfig::new(quality));
    let stats = encoder.encode(&mut source, sink)?;

    println!(
        "Encoded {} frames ({} bytes) to {}",
        stats.frames,
        stats.bytes_written,
        output.display()
    );
    Ok(())
}

fn info_command(input: &PathBuf) -> Result<()> {
    let mut reader = ContainerReader::new(BufReader::new(File::open(input)?))?;
    let header = *reader.header();

    println!("WMC container: {}", input.display());
    println!("  frames:  {}", header.frame_count);
    println!(
        "  size:    {}x{} ({}x{} display)",
        header.width,
        header.height,
        header.display_width(),
        header.display_height()
    );
    println!(
        "  padding: {} cols, {} rows",
        header.width_padding, header.height_padding
    );

    let mut index = 0u32;
    while let Some(record) = reader.next_frame()? {
        let coded: usize = record.planes.iter().map(Vec::len).sum();
        let intra: usize = record.maps.iter().map(|m| m.intra_count()).sum();
        let blocks: usize = record
            .maps
            .iter()
            .map(|m| m.block_rows() * m.block_cols())
            .sum();
        println!(
            "  frame {}: {} coded samples, {}/{} intra blocks",
            index, coded, intra, blocks
        );
        index += 1;
    }
    Ok(())
}
