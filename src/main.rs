//! # Lossy Mirror - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI e carica le impostazioni
//! 2. Configura il logging (INFO, DEBUG con `--debug`, oppure `RUST_LOG`)
//! 3. Validazione delle directory e del numero di thread
//! 4. Discovery dei codec disponibili e selezione di decoder/encoder
//! 5. Avvio del MediaConverter e stampa del riepilogo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! lossy-mirror ~/Music/flac ~/Music/mp3 --input-codec flac --output-codec mp3 --threads 4
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lossy_mirror::{
    config, json_output::JsonMessage, platform, progress::ProgressManager, CodecLocator, CodecRegistry,
    ConversionConfig, MediaConverter, Settings,
};

#[derive(Parser)]
#[command(name = "lossy-mirror")]
#[command(about = "Mirror a lossless music library into a lossy one using external codecs")]
struct Args {
    /// Directory containing the lossless library
    #[arg(required_unless_present = "list_codecs")]
    source: Option<PathBuf>,

    /// Directory receiving the lossy mirror
    #[arg(required_unless_present = "list_codecs")]
    dest: Option<PathBuf>,

    /// Decoder to use, matched as a substring of the codec name
    #[arg(short, long)]
    input_codec: Option<String>,

    /// Encoder to use, matched as a substring of the codec name
    #[arg(short, long)]
    output_codec: Option<String>,

    /// Number of concurrent conversions (0 = one per CPU)
    #[arg(short, long, allow_negative_numbers = true)]
    threads: Option<i64>,

    /// Do not copy tags to converted files
    #[arg(long, alias = "noid3")]
    no_tags: bool,

    /// Do not copy artwork files
    #[arg(long)]
    no_artwork: bool,

    /// Flags passed to the decoder instead of its defaults
    #[arg(long, allow_hyphen_values = true)]
    decoder_flags: Option<String>,

    /// Flags passed to the encoder instead of its defaults
    #[arg(long, allow_hyphen_values = true)]
    encoder_flags: Option<String>,

    /// Treat a non-zero codec exit status as a failed conversion
    #[arg(long)]
    strict: bool,

    /// Abort a single conversion after this many seconds (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Settings file (default: <config dir>/lossy-mirror/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// List known codecs with their availability and exit
    #[arg(long)]
    list_codecs: bool,

    /// Debug logging, including codec output
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json = args.json;

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> Result<i32> {
    init_logging(args.debug)?;
    debug!("System: {}", platform::system_info());

    let settings_path = args.settings.clone().or_else(Settings::default_path);
    let settings = match &settings_path {
        Some(path) => Settings::from_file(path).await?,
        None => Settings::default(),
    };

    // configuration errors surface before any codec is probed
    let threads = args.threads.unwrap_or(settings.threads);
    if !args.list_codecs {
        if let (Some(source), Some(dest)) = (&args.source, &args.dest) {
            config::validate_source_dir(source)?;
            config::validate_dest_dir(dest)?;
        }
        config::resolve_threads(threads)?;
    }

    let mut registry = CodecRegistry::new(settings.codec_table()?, CodecLocator::from_env());

    let spinner = (!args.json && !args.list_codecs).then(|| ProgressManager::spinner("Discovering codecs..."));
    let discovered = registry.discover().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if args.list_codecs {
        print!("{}", registry.report());
        return Ok(if discovered.is_ok() { 0 } else { 1 });
    }
    discovered.context("Codec discovery failed")?;

    let mut decoder = registry.get_decoder(args.input_codec.as_deref().unwrap_or(&settings.decoder))?;
    let mut encoder = registry.get_encoder(args.output_codec.as_deref().unwrap_or(&settings.encoder))?;
    settings.apply_flag_overrides(&mut decoder);
    settings.apply_flag_overrides(&mut encoder);
    if let Some(flags) = args.decoder_flags {
        decoder.override_flags(flags);
    }
    if let Some(flags) = args.encoder_flags {
        encoder.override_flags(flags);
    }
    info!("Selected {} | {}", decoder, encoder);
    info!("Using decoder version: {}", decoder.version_label());
    info!("Using encoder version: {}", encoder.version_label());

    let (Some(source), Some(dest)) = (args.source, args.dest) else {
        anyhow::bail!("Source and destination directories are required");
    };

    let mut config = ConversionConfig::new(&source, &dest, decoder, encoder)?;
    config.set_threads(threads)?;
    config.copy_tags = settings.copy_tags && !args.no_tags;
    config.copy_artwork = settings.copy_artwork && !args.no_artwork;
    config.strict_exit_status = settings.strict_exit_status || args.strict;
    config.job_timeout = args.timeout.map(Duration::from_secs).or_else(|| settings.job_timeout());
    config.json_output = args.json;
    config.show_codec_output = args.debug;

    let summary = MediaConverter::new(config).run().await?;

    if !args.json {
        println!("{}", summary.format_summary());
    }

    Ok(if summary.has_failures() { 1 } else { 0 })
}

fn init_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
