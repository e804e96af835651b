pub mod cli;
pub mod duplicates;
pub mod error;
pub mod report;
pub mod scanner;
pub mod utils;

pub use cli::{Cli, normalize_legacy_args};
pub use duplicates::{
    ContentGroup, Grouping, MAX_WORKERS, ScanOptions, ScanResult, find_name_groups, scan, split_by_content,
    verify_content,
};
pub use error::ScanError;
pub use report::{OutputFormat, open_output, summary, write_report};
pub use scanner::{ResolvedRoots, enumerate_files, enumerate_roots, hash_file, resolve_roots};
pub use utils::{FileRecord, format_mod_time};
