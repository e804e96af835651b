use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use indicatif::{HumanBytes, HumanCount, ProgressBar};
use log::{debug, info};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::utils::FileRecord;

/// Roots validated by [`resolve_roots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoots {
    pub paths: Vec<PathBuf>,
    /// True when no path was given and the current directory was used.
    pub defaulted: bool,
}

/// Validates the caller's root paths, keeping their order.
///
/// An empty list resolves to the current working directory. Every given
/// path must exist; the first missing one aborts with
/// [`ScanError::PathNotFound`] before anything is walked. Paths are made
/// absolute without resolving symlinks, so reported paths keep the
/// spelling the user chose.
pub fn resolve_roots(args: &[PathBuf]) -> Result<ResolvedRoots, ScanError> {
    if args.is_empty() {
        let cwd = std::env::current_dir().map_err(ScanError::CurrentDir)?;
        info!("No path specified, using current directory: {}", cwd.display());
        return Ok(ResolvedRoots {
            paths: vec![cwd],
            defaulted: true,
        });
    }

    let mut paths = Vec::with_capacity(args.len());
    for path in args {
        match fs::metadata(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ScanError::PathNotFound { path: path.clone() });
            }
            // Anything else (e.g. a permission problem on the root) is left
            // for the walk to skip or report.
            _ => {}
        }
        let absolute = std::path::absolute(path).map_err(|source| ScanError::Traversal {
            path: path.clone(),
            source,
        })?;
        paths.push(absolute);
    }

    Ok(ResolvedRoots {
        paths,
        defaulted: false,
    })
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    skips_entry(err.io_error())
}

/// Whether a walk error only costs the entry rather than the whole run.
fn skips_entry(err: Option<&io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
}

fn traversal_error(root: &Path, err: walkdir::Error) -> ScanError {
    let path = err.path().unwrap_or(root).to_path_buf();
    ScanError::Traversal {
        path,
        source: err.into(),
    }
}

/// Walks `root` recursively and returns one record per non-directory entry.
///
/// Symlinks are not followed; a symlink, device or socket is recorded like
/// any regular file using its own metadata. Entries that can't be read
/// because of permissions are skipped; any other I/O error is fatal.
pub fn enumerate_files(root: &Path) -> Result<Vec<FileRecord>, ScanError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_permission_denied(&err) => {
                debug!("Skipping unreadable entry: {}", err);
                continue;
            }
            Err(err) => return Err(traversal_error(root, err)),
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) if is_permission_denied(&err) => {
                debug!("Skipping '{}': {}", entry.path().display(), err);
                continue;
            }
            Err(err) => return Err(traversal_error(root, err)),
        };
        let modified = metadata.modified().map_err(|source| ScanError::Traversal {
            path: entry.path().to_path_buf(),
            source,
        })?;

        files.push(FileRecord {
            name: entry.file_name().to_os_string(),
            path: entry.into_path(),
            size: metadata.len(),
            modified,
            hash: None,
        });
    }

    Ok(files)
}

/// Enumerates every root in order and concatenates the results.
pub fn enumerate_roots(roots: &[PathBuf], progress: &ProgressBar) -> Result<Vec<FileRecord>, ScanError> {
    let mut files = Vec::new();
    for root in roots {
        progress.set_message(format!("Loading files from {}", root.display()));
        info!("Scanning {}", root.display());
        files.extend(enumerate_files(root)?);
        progress.tick();
    }
    progress.finish_and_clear();

    let total_size: u64 = files.iter().map(|f| f.size).sum();
    info!(
        "Found {} files ({})",
        HumanCount(files.len() as u64),
        HumanBytes(total_size)
    );
    Ok(files)
}

/// Computes the BLAKE3 digest of a file's contents as lowercase hex.
///
/// Symlinks are followed. Anything that isn't a regular file (FIFO,
/// device, socket, directory) is refused before opening, since reading a
/// FIFO without a writer never returns.
pub fn hash_file(path: &Path) -> Result<String, ScanError> {
    let read_error = |source: io::Error| ScanError::HashRead {
        path: path.to_path_buf(),
        source,
    };

    if !fs::metadata(path).map_err(read_error)?.file_type().is_file() {
        return Err(read_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let mut file = fs::File::open(path).map_err(read_error)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!("Hash calculated for '{}': {}", path.display(), hash);
    Ok(hash)
}
