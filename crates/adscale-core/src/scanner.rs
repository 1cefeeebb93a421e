//! Input file discovery for data folders

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List the CSV files directly inside `root`, sorted by path.
///
/// Subdirectories are not descended into. A missing root yields no files.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_csv(e.path()))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
