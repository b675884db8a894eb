// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Heritage OCR command-line driver.
//
// Entry point. Initialises logging, parses arguments and runs one document
// through the pipeline.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use heritage_core::ImageVariant;
use heritage_core::human_errors::humanize_error;

/// Normalize photographed land records and extract their text.
#[derive(Debug, Parser)]
#[command(name = "heritage-ocr", version, about)]
struct Cli {
    /// JSON configuration file; command-line flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Preprocess an image and extract its text.
    Run(RunArgs),
    /// Preprocess an image and write every variant as PNG.
    Preprocess(PreprocessArgs),
}

/// Which engine produces the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineChoice {
    /// Neural engine, with the whole-page fallback when it finds nothing.
    Primary,
    /// Classical whole-page engine only.
    Fallback,
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// JPEG, PNG or TIFF page image.
    image: PathBuf,

    /// Directory holding text-detection.rten and text-recognition.rten.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Recognise the image as loaded, without preprocessing.
    #[arg(long)]
    skip_preprocessing: bool,

    /// Never use the fallback engine when the primary finds no text.
    #[arg(long)]
    no_fallback: bool,

    /// Fallback engine languages, e.g. `eng+hin`.
    #[arg(long)]
    lang: Option<String>,

    /// Preprocessed variant handed to recognition.
    #[arg(long, value_parser = parse_variant)]
    variant: Option<ImageVariant>,

    #[arg(long, value_enum, default_value_t = EngineChoice::Primary)]
    engine: EngineChoice,

    /// Give up (between stages) after this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Print the full JSON result instead of plain text.
    #[arg(long)]
    json: bool,

    /// Also write every preprocessed variant into this directory.
    #[arg(long)]
    save_variants: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct PreprocessArgs {
    /// JPEG, PNG or TIFF page image.
    image: PathBuf,

    /// Output directory for the PNG variants.
    #[arg(long, short)]
    out: PathBuf,
}

fn parse_variant(raw: &str) -> Result<ImageVariant, String> {
    raw.parse().map_err(|err: heritage_core::HeritageError| err.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Arguments parsed");

    let result = match &cli.command {
        Command::Run(args) => commands::run(cli.config.as_deref(), args),
        Command::Preprocess(args) => commands::preprocess(cli.config.as_deref(), args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Processing failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}
