use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a SweepstacX scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Glob patterns of files to scan, relative to the project root
    pub include: Vec<String>,

    /// Glob patterns excluded from discovery
    pub ignore: Vec<String>,

    /// Extra glob patterns always treated as entry points
    pub entry_points: Vec<String>,

    /// Per-file result cache
    pub cache: CacheConfig,

    /// Upper bound on concurrent workers; `None` means cores - 1
    pub max_workers: Option<usize>,

    /// Time budget for one file's analyzer pipeline, in milliseconds
    pub analyzer_timeout: u64,

    /// TypeScript-specific checks
    pub typescript: TypeScriptConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Use the on-disk cache
    pub enabled: bool,

    /// Maximum entry age in milliseconds
    pub max_age: u64,

    /// Cache directory; defaults to `<root>/.sweepstacx/cache`
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeScriptConfig {
    /// Report unused `import type` bindings too
    pub check_type_imports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: ["js", "mjs", "cjs", "ts", "tsx", "jsx"]
                .iter()
                .map(|ext| format!("**/*.{ext}"))
                .collect(),
            ignore: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
                "**/coverage/**".to_string(),
                "**/.git/**".to_string(),
            ],
            entry_points: vec![],
            cache: CacheConfig::default(),
            max_workers: None,
            analyzer_timeout: 10_000,
            typescript: TypeScriptConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age: 60 * 60 * 1000,
            dir: None,
        }
    }
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            check_type_imports: true,
        }
    }
}

impl Config {
    /// Load configuration from a file (JSON, YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse JSON config"),
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // `.sweeperc` with no extension: JSON, then YAML, then TOML
                if let Ok(config) = serde_json::from_str(&contents) {
                    Ok(config)
                } else if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".sweeperc.json",
            ".sweeperc",
            ".sweeperc.yml",
            ".sweeperc.yaml",
            ".sweeperc.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Number of workers for the pool: configured value or cores - 1, at least one
    pub fn worker_count(&self) -> usize {
        match self.max_workers {
            Some(n) => n.max(1),
            None => default_worker_count(),
        }
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_millis(self.cache.max_age)
    }

    /// Resolved cache directory for a project
    pub fn cache_dir(&self, project_root: &Path) -> PathBuf {
        match &self.cache.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(".sweepstacx").join("cache"),
        }
    }
}

/// Available parallelism minus one, never below one
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}
