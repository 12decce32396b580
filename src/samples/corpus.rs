//! Discovery and ordering of SGF files on disk.

use std::io;
use std::path::{Path, PathBuf};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use walkdir::WalkDir;

/// Recursively collects every `.sgf` file under `root`, sorted by path.
///
/// Symlinks are not followed.
pub fn scan_directory(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "sgf") {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Shuffles `paths` deterministically for `seed`.
///
/// Callers should sort first (as `scan_directory` does) so the order does
/// not depend on directory iteration order.
pub fn shuffle_paths(paths: &mut [PathBuf], seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    paths.shuffle(&mut rng);
}

/// Clamps `[start, stop)` to the available paths.
pub fn select_range(paths: &[PathBuf], start: usize, stop: Option<usize>) -> &[PathBuf] {
    let stop = stop.unwrap_or(paths.len()).min(paths.len());
    let start = start.min(stop);
    &paths[start..stop]
}
