use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use convert_core::{
    check_dangerous_directory, classify_report, collect, logging, BatchRunner, CollectReport,
    ConversionOutcome, ConversionRequest, ProgressSink, RunReport, RunSummary, Session,
    TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "heic-convert")]
#[command(version, about = "Batch HEIC/HEIF to PNG/JPEG/WEBP converter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files/directories and report what would be converted
    Scan {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Convert all HEIC/HEIF files found under the given inputs
    Run {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "png")]
        format: FormatArg,

        /// Keep originals and write into a 'Converted Files' folder instead
        /// of replacing them
        #[arg(long)]
        no_replace: bool,

        /// Do not carry EXIF/ICC metadata into the output
        #[arg(long)]
        no_metadata: bool,

        #[arg(short, long, value_enum, default_value = "human")]
        output: OutputFormat,

        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
    Webp,
}

impl From<FormatArg> for TargetFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Png => TargetFormat::Png,
            FormatArg::Jpeg => TargetFormat::Jpeg,
            FormatArg::Webp => TargetFormat::Webp,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

/// Progress bar adapter over the core's sink interface.
struct CliProgress {
    bar: Option<ProgressBar>,
}

impl CliProgress {
    fn new(total: usize, quiet: bool) -> Self {
        if quiet || total == 0 {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {pos}/{len} • {msg}",
                )
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        bar.set_prefix("Converting");
        Self { bar: Some(bar) }
    }
}

impl ProgressSink for CliProgress {
    fn on_progress(&mut self, completed: usize, total: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(completed as u64);
            bar.set_message(format!("{}/{}", completed, total));
        }
    }

    fn on_complete(&mut self, _summary: &RunSummary) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { inputs } => {
            logging::init_logging(
                "heic-convert",
                logging::LogConfig::default().with_level(Level::WARN),
            )?;
            scan_command(&inputs)
        }
        Commands::Run {
            inputs,
            format,
            no_replace,
            no_metadata,
            output,
            verbose,
        } => {
            let level = if verbose { Level::DEBUG } else { Level::WARN };
            logging::init_logging(
                "heic-convert",
                logging::LogConfig::default().with_level(level),
            )?;

            let request = ConversionRequest {
                target: format.into(),
                replace_original: !no_replace,
                preserve_metadata: !no_metadata,
            };
            run_command(&inputs, request, output)
        }
    }
}

fn scan_command(inputs: &[PathBuf]) -> Result<()> {
    let mut session = Session::new();
    let outcome = collect(inputs, &session.working_set, false);
    session.merge(outcome.accepted.clone(), false);

    print_collect_report(&outcome, session.working_set.len());

    for path in session.working_set.iter() {
        println!("{}", path.display());
    }
    println!(
        "\n{} file(s) queued for conversion",
        session.working_set.len()
    );
    Ok(())
}

fn run_command(inputs: &[PathBuf], request: ConversionRequest, output: OutputFormat) -> Result<()> {
    if request.replace_original {
        for root in inputs.iter().filter(|p| p.is_dir()) {
            if let Err(reason) = check_dangerous_directory(root) {
                eprintln!("{}", reason);
                std::process::exit(1);
            }
        }
    }

    let mut session = Session::new();
    let outcome = collect(inputs, &session.working_set, false);
    session.merge(outcome.accepted.clone(), false);

    if output == OutputFormat::Human {
        print_collect_report(&outcome, session.working_set.len());
    }

    if session.working_set.is_empty() {
        std::process::exit(1);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n⚠️  Cancellation requested, finishing current file...");
            cancel.store(true, Ordering::Relaxed);
        })?;
    }

    let runner = BatchRunner::new(request).with_cancel_flag(cancel);
    let mut sink = CliProgress::new(session.working_set.len(), output == OutputFormat::Json);
    let report = runner.run(&mut session, &mut sink);

    match output {
        OutputFormat::Human => print_run_report(&report, &request),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.summary.failed > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn print_collect_report(outcome: &convert_core::CollectOutcome, resulting_len: usize) {
    match classify_report(outcome, resulting_len) {
        CollectReport::Quiet => {}
        CollectReport::NothingUsable { ignored } => {
            eprintln!(
                "❌ No HEIC/HEIF files were found. {} unsupported file(s) were ignored.",
                ignored
            );
        }
        CollectReport::UnsupportedIgnored {
            total,
            sample,
            truncated,
        } => {
            eprintln!("⚠️  {} unsupported file(s) ignored:", total);
            for name in sample {
                eprintln!("   - {}", name);
            }
            if truncated {
                eprintln!("   - ...");
            }
        }
    }
}

fn print_run_report(report: &RunReport, request: &ConversionRequest) {
    let summary = &report.summary;

    println!();
    if summary.cancelled {
        println!("{}", style("⚠️  Run cancelled before completion").yellow());
    }
    println!(
        "✅ Complete: {} succeeded, {} failed (total: {}, format: {})",
        style(summary.succeeded).green().bold(),
        style(summary.failed).red().bold(),
        summary.total,
        request.target,
    );

    if !request.replace_original && !summary.output_folders.is_empty() {
        println!("\n📁 Converted files saved to:");
        for folder in &summary.output_folders {
            println!("   {}", folder.display());
        }
    }

    let failures: Vec<&ConversionOutcome> =
        report.outcomes.iter().filter(|o| !o.is_success()).collect();
    if !failures.is_empty() {
        println!("\n❌ Errors encountered:");
        for outcome in failures {
            if let ConversionOutcome::Failure { input, cause } = outcome {
                println!("   {} → {}", input.display(), cause);
            }
        }
    }
}
