use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::error::ScanError;
use crate::scanner::{enumerate_roots, hash_file};
use crate::utils::FileRecord;

/// Upper bound on the name-matching pool size.
pub const MAX_WORKERS: usize = 50;

/// Toggles that shape a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Narrow name groups down to byte-identical files.
    pub strict: bool,
    /// Show progress bars. Never changes which files are reported.
    pub verbose: bool,
    /// Requested pool size; the effective size is also capped by
    /// [`MAX_WORKERS`] and the number of files.
    pub max_workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            strict: false,
            verbose: true,
            max_workers: MAX_WORKERS,
        }
    }
}

/// Files within one name group that share a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentGroup {
    pub hash: String,
    pub files: Vec<FileRecord>,
}

/// The reported files for one filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Grouping {
    /// Every file carrying the name, newest first.
    Name(Vec<FileRecord>),
    /// Strict mode: byte-identical subsets, in discovery order.
    Content(Vec<ContentGroup>),
}

impl Grouping {
    /// The records in report order. For content groups this is the
    /// concatenation of the groups.
    pub fn records(&self) -> Vec<&FileRecord> {
        match self {
            Grouping::Name(files) => files.iter().collect(),
            Grouping::Content(groups) => groups.iter().flat_map(|g| g.files.iter()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Grouping::Name(files) => files.len(),
            Grouping::Content(groups) => groups.iter().map(|g| g.files.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final output of a scan, keyed by filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub strict: bool,
    #[serde(serialize_with = "serialize_groups")]
    pub groups: BTreeMap<OsString, Grouping>,
    /// Number of records across all reported groups.
    pub total_files: usize,
    /// Number of reported filenames.
    pub total_groups: usize,
}

/// Writes the group map with lossy string keys, keeping the map's order.
fn serialize_groups<S: Serializer>(groups: &BTreeMap<OsString, Grouping>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(groups.iter().map(|(name, grouping)| (name.to_string_lossy(), grouping)))
}

impl ScanResult {
    pub fn new(strict: bool, groups: BTreeMap<OsString, Grouping>) -> Self {
        let total_files = groups.values().map(Grouping::len).sum();
        let total_groups = groups.len();
        Self {
            strict,
            groups,
            total_files,
            total_groups,
        }
    }
}

/// One processed input file: its name and the indices of every other file
/// sharing that name at a different path.
struct MatchUnit {
    name: OsString,
    matches: Vec<usize>,
}

/// Effective pool size for `total` files.
pub fn worker_count(total: usize, max_workers: usize) -> usize {
    total.min(max_workers.clamp(1, MAX_WORKERS))
}

/// The static slice of input indices owned by `worker`. Slices are
/// disjoint and together cover `0..total`.
pub fn segment(worker: usize, workers: usize, total: usize) -> Range<usize> {
    (worker * total / workers)..((worker + 1) * total / workers)
}

fn index_by_name(files: &[FileRecord]) -> HashMap<OsString, Vec<usize>> {
    let mut index: HashMap<OsString, Vec<usize>> = HashMap::new();
    for (i, file) in files.iter().enumerate() {
        index.entry(file.name.clone()).or_default().push(i);
    }
    index
}

/// Deduplicates a raw match list by full path and sorts it newest first.
fn collect_group(files: &[FileRecord], matches: Vec<usize>) -> Vec<FileRecord> {
    let mut seen = HashSet::new();
    let mut group: Vec<FileRecord> = matches
        .into_iter()
        .filter(|&i| seen.insert(&files[i].path))
        .map(|i| files[i].clone())
        .collect();
    group.sort_by(FileRecord::newest_first);
    group
}

/// Groups `files` by base name, keeping only names found at two or more
/// distinct paths.
///
/// A pool of `worker_count(files.len(), max_workers)` workers each scan a
/// fixed slice of the input and send one [`MatchUnit`] per file. This
/// thread drains exactly one unit per input file, ticking `progress` once
/// for each, and is the only place the accumulated map is touched.
pub fn find_name_groups(
    files: Vec<FileRecord>,
    max_workers: usize,
    progress: &ProgressBar,
) -> Result<BTreeMap<OsString, Vec<FileRecord>>, ScanError> {
    let total = files.len();
    if total == 0 {
        return Ok(BTreeMap::new());
    }

    let workers = worker_count(total, max_workers);
    debug!("Matching {} files with {} workers", total, workers);

    let index = Arc::new(index_by_name(&files));
    let files = Arc::new(files);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("name-match-{i}"))
        .build()?;

    let (tx, rx) = unbounded();
    for worker in 0..workers {
        let range = segment(worker, workers, total);
        let files = Arc::clone(&files);
        let index = Arc::clone(&index);
        let tx = tx.clone();
        pool.spawn(move || {
            for i in range {
                let file = &files[i];
                let matches: Vec<usize> = index
                    .get(&file.name)
                    .map(|candidates| {
                        candidates
                            .iter()
                            .copied()
                            .filter(|&j| files[j].path != file.path)
                            .collect()
                    })
                    .unwrap_or_default();
                let unit = MatchUnit {
                    name: file.name.clone(),
                    matches,
                };
                if tx.send(unit).is_err() {
                    return;
                }
            }
        });
    }
    drop(tx);

    let mut raw: HashMap<OsString, Vec<usize>> = HashMap::new();
    for received in 0..total {
        let unit = rx.recv().map_err(|_| ScanError::WorkerDisconnected {
            received,
            expected: total,
        })?;
        progress.inc(1);
        if !unit.matches.is_empty() {
            raw.entry(unit.name).or_default().extend(unit.matches);
        }
    }

    let groups: BTreeMap<OsString, Vec<FileRecord>> = raw
        .into_iter()
        .filter_map(|(name, matches)| {
            let group = collect_group(&files, matches);
            (group.len() > 1).then_some((name, group))
        })
        .collect();

    info!("Found {} names shared by several files", HumanCount(groups.len() as u64));
    Ok(groups)
}

/// Splits a hashed name group into subsets of equal hash.
///
/// Groups come out in the order their first matching pair is found when
/// walking pairs `(i, j)` with `i < j`, members keep the group's order,
/// and files matching nothing are dropped.
pub fn split_by_content(files: &[FileRecord]) -> Vec<ContentGroup> {
    let mut assigned = vec![false; files.len()];
    let mut groups = Vec::new();

    for i in 0..files.len() {
        if assigned[i] {
            continue;
        }
        let Some(hash) = files[i].hash.as_deref() else {
            continue;
        };
        let members: Vec<usize> = (i + 1..files.len())
            .filter(|&j| !assigned[j] && files[j].hash.as_deref() == Some(hash))
            .collect();
        if members.is_empty() {
            continue;
        }

        assigned[i] = true;
        for &j in &members {
            assigned[j] = true;
        }
        groups.push(ContentGroup {
            hash: hash.to_string(),
            files: std::iter::once(i)
                .chain(members)
                .map(|k| files[k].clone())
                .collect(),
        });
    }

    groups
}

/// Hashes every record of every name group and keeps only the
/// byte-identical subsets. Names left without any matching pair are
/// removed. Any unreadable file aborts verification.
pub fn verify_content(
    mut groups: BTreeMap<OsString, Vec<FileRecord>>,
    progress: &ProgressBar,
) -> Result<BTreeMap<OsString, Vec<ContentGroup>>, ScanError> {
    let records: Vec<&mut FileRecord> = groups.values_mut().flat_map(|g| g.iter_mut()).collect();
    progress.set_length(records.len() as u64);
    info!("Hashing {} files", HumanCount(records.len() as u64));

    records.into_par_iter().try_for_each(|record| {
        record.hash = Some(hash_file(&record.path)?);
        progress.inc(1);
        Ok::<_, ScanError>(())
    })?;

    Ok(groups
        .into_iter()
        .filter_map(|(name, files)| {
            let content = split_by_content(&files);
            if content.is_empty() {
                debug!("No identical contents among files named '{}'", name.to_string_lossy());
                None
            } else {
                Some((name, content))
            }
        })
        .collect())
}

fn progress_bar(len: u64, verbose: bool, message: &'static str) -> ProgressBar {
    if !verbose {
        let pb = ProgressBar::hidden();
        pb.set_length(len);
        return pb;
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message);
    pb
}

fn spinner(verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Runs the whole pipeline over already resolved roots: enumerate, group
/// by name and, in strict mode, verify contents.
pub fn scan(roots: &[PathBuf], options: &ScanOptions) -> Result<ScanResult, ScanError> {
    let files = enumerate_roots(roots, &spinner(options.verbose))?;

    let matching = progress_bar(files.len() as u64, options.verbose, "Matching names");
    let name_groups = find_name_groups(files, options.max_workers, &matching)?;
    matching.finish_and_clear();

    let groups = if options.strict {
        let hashing = progress_bar(0, options.verbose, "Hashing");
        let content = verify_content(name_groups, &hashing)?;
        hashing.finish_and_clear();
        content
            .into_iter()
            .map(|(name, content)| (name, Grouping::Content(content)))
            .collect()
    } else {
        name_groups
            .into_iter()
            .map(|(name, files)| (name, Grouping::Name(files)))
            .collect()
    };

    Ok(ScanResult::new(options.strict, groups))
}
