use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::duplicates::ScanOptions;
use crate::report::OutputFormat;

/// Long flags that older invocations spell with a single dash.
const LEGACY_FLAGS: &[&str] = &["strict", "no-verbose", "output", "format", "workers", "debug"];

#[derive(Parser, Debug)]
#[command(name = "check-name-dups")]
#[command(about = "A CLI tool to find files sharing a name across directories")]
pub struct Cli {
    /// Directories to scan (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Only report files whose contents are byte-identical
    #[arg(short, long)]
    pub strict: bool,

    /// Don't display verbose output, colors or progress
    #[arg(short = 'q', long)]
    pub no_verbose: bool,

    /// Append the report to this file instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Number of parallel name-matching workers
    #[arg(short, long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub workers: u8,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            strict: self.strict,
            verbose: !self.no_verbose,
            max_workers: usize::from(self.workers),
        }
    }
}

/// Rewrites `-strict`, `-output=path` and friends to their `--` forms.
/// Arguments after a bare `--` are left alone.
pub fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(flag) if !flag.starts_with('-') => {
                    let key = flag.split('=').next().unwrap_or(flag);
                    if LEGACY_FLAGS.contains(&key) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
