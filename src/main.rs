//! dehair - Hair artifact removal for dermoscopic images
//!
//! CLI entry point

use anyhow::Context;
use clap::Parser;
use dehair::{
    exit_codes,
    // CLI
    Cli, Commands, RemoveArgs,
    // Config
    HairRemovalConfig, HairRemovalError,
    // Pipeline
    Checkpoint, HairRemovalOutput, HairRemover, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::Level;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Remove(args) => run_remove(&args),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

/// Map pipeline failures onto distinct exit codes
fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<HairRemovalError>() {
        Some(HairRemovalError::InvalidConfig(_)) => exit_codes::INVALID_CONFIG,
        Some(_) => exit_codes::PROCESSING_ERROR,
        None => exit_codes::GENERAL_ERROR,
    }
}

// ============ Logging ============

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============ Remove Command ============

fn run_remove(args: &RemoveArgs) -> anyhow::Result<()> {
    let start_time = Instant::now();
    init_logging(args.verbose, args.quiet);

    // Validate input path
    if !args.input.is_file() {
        eprintln!("Error: Input file does not exist: {}", args.input.display());
        std::process::exit(exit_codes::INPUT_NOT_FOUND);
    }

    // Load config file if specified, otherwise the user config or defaults
    let file_config = match &args.config {
        Some(config_path) => match HairRemovalConfig::load_from_path(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error: Failed to load config file {}: {}", config_path.display(), e);
                std::process::exit(exit_codes::INVALID_CONFIG);
            }
        },
        None => HairRemovalConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable user config");
            HairRemovalConfig::default()
        }),
    };

    // Merge config file with CLI arguments (CLI takes precedence)
    let config = file_config.merge_with_cli(&args.to_overrides());
    if let Err(e) = config.validate() {
        eprintln!("Error: Invalid configuration: {}", e);
        std::process::exit(exit_codes::INVALID_CONFIG);
    }

    let remover = HairRemover::new(config);
    let output = match args.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .build()
                .context("failed to build worker pool")?;
            pool.install(|| process(&remover, args))?
        }
        None => process(&remover, args)?,
    };

    // Write outputs
    let output_path = args.output_path();
    output
        .save_image(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    if let Some(mask_path) = &args.mask {
        output
            .save_mask(mask_path)
            .with_context(|| format!("failed to write {}", mask_path.display()))?;
    }
    if let Some(stats_path) = &args.stats {
        output
            .save_stats(stats_path)
            .with_context(|| format!("failed to write {}", stats_path.display()))?;
    }

    if !args.quiet {
        print_summary(&output, &output_path, start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

/// Run the pipeline, with a progress bar unless quiet
fn process(remover: &HairRemover, args: &RemoveArgs) -> anyhow::Result<HairRemovalOutput> {
    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let on_checkpoint = |checkpoint: Checkpoint| {
        bar.set_position(u64::from(checkpoint.percent()));
        bar.set_message(checkpoint.description());
    };
    let sink: &dyn ProgressCallback = &on_checkpoint;

    let result = remover.process_file(&args.input, Some(sink));
    bar.finish_and_clear();

    Ok(result?)
}

fn print_summary(output: &HairRemovalOutput, output_path: &std::path::Path, elapsed: f64) {
    let stats = &output.stats;
    let (width, height) = output.dimensions();

    println!("Output:          {} ({}x{})", output_path.display(), width, height);
    println!("Initial hair:    {:.2}%", stats.initial_hair_coverage);
    println!("Final hair:      {:.2}% ({} px)", stats.final_hair_coverage, stats.final_hair_pixels);
    if stats.is_lossless() {
        println!("PSNR:            inf (no change)");
    } else {
        println!("PSNR:            {:.2} dB", stats.psnr);
    }
    println!("Total time:      {:.2}s", elapsed);
}

// ============ Info Command ============

fn run_info() -> anyhow::Result<()> {
    println!("dehair v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // System Information
    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!("  CPUs: {}", num_cpus::get());

    // Config File Locations
    println!();
    println!("Config File Location:");
    match HairRemovalConfig::default_path() {
        Some(path) => {
            let state = if path.exists() { "found" } else { "not found" };
            println!("  User: {} ({})", path.display(), state);
        }
        None => println!("  User: unavailable"),
    }

    println!();
    println!("Default Configuration:");
    for line in HairRemovalConfig::default().to_toml().lines() {
        println!("  {}", line);
    }

    Ok(())
}
