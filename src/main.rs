use std::io::{self, BufWriter, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::HumanDuration;
use log::{LevelFilter, debug, info};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use check_name_dups::{Cli, OutputFormat, normalize_legacy_args, open_output, resolve_roots, scan, summary, write_report};

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.debug {
        LevelFilter::Debug
    } else if cli.no_verbose {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = ConfigBuilder::new();
    // Falls back to UTC timestamps when the local offset is unavailable.
    let _ = builder.set_time_offset_to_local();
    let color = if cli.no_verbose { ColorChoice::Never } else { ColorChoice::Auto };

    TermLogger::init(level, builder.build(), TerminalMode::Stderr, color).context("Failed to initialize logger")
}

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args_os()));
    init_logging(&cli)?;

    info!("Starting check-name-dups v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);

    let options = cli.scan_options();
    info!("[!] Verbose mode enabled, to disable it add the option: --no-verbose");
    if options.strict {
        info!("[!] Strict mode enabled, to disable it remove the option: --strict");
    }
    if cli.no_verbose || cli.output.is_some() {
        colored::control::set_override(false);
    }

    // Opened before scanning so a bad destination fails fast.
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(open_output(path)?),
        None => {
            info!("[!] No output file specified, printing to console. Specify --output <file> to write to a file");
            Box::new(BufWriter::new(io::stdout()))
        }
    };

    let roots = resolve_roots(&cli.paths)?;
    let result = scan(&roots.paths, &options)?;

    if options.verbose && cli.format == OutputFormat::Text && cli.output.is_none() {
        println!("{}", "Duplicated files:".bold());
    }
    write_report(&mut out, &result, cli.format, options.verbose).context("Failed to write report")?;
    out.flush().context("Failed to write report")?;

    if options.verbose && cli.format == OutputFormat::Text {
        colored::control::unset_override();
        println!("{}", summary(&result).bold());
    }

    info!("Completed in {}", HumanDuration(start_time.elapsed()));
    Ok(())
}
