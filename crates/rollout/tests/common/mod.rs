use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SAMPLE_REGISTRY: &str = r#"
registry "acme"

service "api" {
    path "services/api"
    regions "ord"
}

service "web" {
    path "apps/web"
    regions "ord" "iad" "sjc"
    after "api"
}
"#;

/// Temporary project with its own settings file and runs directory
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Self { root };
        project.write(
            "rollout.yaml",
            &format!("runs_dir: {}\n", project.runs_dir().display()),
        );
        project
    }

    /// Project with the sample registry and valid service directories
    pub fn sample() -> Self {
        let project = Self::new();
        project.write("rollout.kdl", SAMPLE_REGISTRY);
        project.write(
            "services/api/fly.toml",
            "app = \"api\"\nprimary_region = \"ord\"\n",
        );
        project.write(
            "apps/web/fly.toml",
            "app = \"web\"\nprimary_region = \"ord\"\n",
        );
        project
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.path().join("rollout.yaml")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.root.path().join("runs")
    }

    pub fn reports(&self) -> Vec<PathBuf> {
        list_reports(&self.runs_dir())
    }
}

fn list_reports(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("deployment-report-"))
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}
