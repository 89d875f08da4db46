use cached_bytes::cli::{Cli, Commands};
use cached_bytes::{CacheError, CachedBytes, Disposal, input, logging, stress};

use clap::Parser;
use std::process;
use zeroize::Zeroizing;

/// Diagnostic front end for the sensitive byte holder
fn main() {
    let cli = Cli::parse();
    logging::setup_log(if cli.verbose { "debug" } else { "info" });

    let result = match cli.command {
        Commands::Scrub { input } => scrub_input(&Zeroizing::new(input)),
        Commands::Stress {
            readers,
            size,
            rounds,
        } => stress_holder(readers, size, rounds),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Hold the input, clear it, and report which overwrite was used
fn scrub_input(source: &str) -> Result<(), CacheError> {
    let holder = CachedBytes::new(input::load(source)?);
    println!("Holding {} bytes", holder.len()?);

    match holder.dispose() {
        Disposal::Scrubbed { len } => println!("Scrubbed {} bytes with entropy", len),
        Disposal::ZeroFilled { len } => {
            println!("Entropy unavailable, zero-filled {} bytes", len)
        }
        Disposal::AlreadyCleared => println!("Nothing left to scrub"),
    }

    Ok(())
}

/// Run the concurrent read/dispose race and summarize it
fn stress_holder(readers: usize, size: usize, rounds: usize) -> Result<(), CacheError> {
    tracing::info!(
        target: "cached_bytes",
        "Stressing {} readers over {} rounds with {} byte payloads",
        readers,
        rounds,
        size
    );

    let report = stress::run(readers, size, rounds)?;

    println!(
        "{} rounds: {} full reads, {} reads after clear, 0 torn",
        report.rounds, report.full_reads, report.cleared_reads
    );
    Ok(())
}
