use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

use super::LOG_FILE_NAME;

/// Total size above which startup warns about the log directory (50MB).
const MAX_LOG_SIZE: u64 = 50 * 1024 * 1024;

/// Rolled log files (`mintforge.log.YYYY-MM-DD`) in `log_dir`, newest first.
pub fn log_files(log_dir: &str) -> anyhow::Result<Vec<(PathBuf, SystemTime, u64)>> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(log_path)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with(LOG_FILE_NAME))
            .unwrap_or(false);
        if path.is_file() && is_log {
            let metadata = fs::metadata(&path)?;
            files.push((path, metadata.modified()?, metadata.len()));
        }
    }
    // Rolled names sort by date; fall back to mtime for equal names.
    files.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    Ok(files)
}

/// Deletes all but the newest `keep` log files. Returns how many were removed.
pub fn prune_logs(log_dir: &str, keep: usize) -> anyhow::Result<usize> {
    let files = log_files(log_dir)?;
    let total_size: u64 = files.iter().map(|(_, _, size)| size).sum();
    if total_size > MAX_LOG_SIZE {
        warn!(
            target: "log_management",
            total_size_mb = total_size / (1024 * 1024),
            max_size_mb = MAX_LOG_SIZE / (1024 * 1024),
            "Log directory size exceeds recommended maximum"
        );
    }

    let mut removed = 0;
    for (path, _, _) in files.iter().skip(keep) {
        info!(target: "log_management", path = %path.display(), "Removing old log file");
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(target: "log_management", path = %path.display(), error = %e, "Failed to remove old log file")
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"] {
            fs::write(dir.path().join(format!("{}.{}", LOG_FILE_NAME, day)), b"{}").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), b"keep me").unwrap();
        let log_dir = dir.path().to_str().unwrap();

        assert_eq!(prune_logs(log_dir, 2).unwrap(), 2);

        let remaining: Vec<String> = log_files(log_dir)
            .unwrap()
            .into_iter()
            .map(|(p, _, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            remaining,
            vec!["mintforge.log.2024-01-04", "mintforge.log.2024-01-03"]
        );
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        assert_eq!(prune_logs("/nonexistent/mintforge-logs", 3).unwrap(), 0);
    }
}
