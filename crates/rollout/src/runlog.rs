//! Append-only per-run log file
//!
//! Receives stage banners and the full captured output of every build and
//! deploy attempt. Write failures are reported through `tracing` and never
//! interrupt the run.

use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Open `<runs_dir>/<run_id>.log` for appending
    pub fn create(runs_dir: &Path, run_id: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(runs_dir)?;
        let path = runs_dir.join(format!("{}.log", run_id));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `==> [timestamp] message`
    pub fn banner(&self, message: &str) {
        self.write(&format!(
            "==> [{}] {}\n",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            message
        ));
    }

    /// Captured command output under a heading
    pub fn output(&self, heading: &str, output: &str) {
        let mut block = format!("--- {} ---\n", heading);
        block.push_str(output);
        if !output.ends_with('\n') {
            block.push('\n');
        }
        self.write(&block);
    }

    fn write(&self, text: &str) {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = file.write_all(text.as_bytes()).and_then(|_| file.flush()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let runs_dir = temp_dir.path().join("runs");

        let log = RunLog::create(&runs_dir, "run-1").unwrap();
        log.banner("deploy api");
        log.output("api attempt 1", "building\ndone");
        drop(log);

        let log = RunLog::create(&runs_dir, "run-1").unwrap();
        log.banner("second open");

        let content = std::fs::read_to_string(runs_dir.join("run-1.log")).unwrap();
        assert!(content.contains("deploy api"));
        assert!(content.contains("--- api attempt 1 ---\nbuilding\ndone\n"));
        assert!(content.trim_end().ends_with("second open"));
    }
}
