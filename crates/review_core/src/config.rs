use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ReviewError};
use crate::image_source::DEFAULT_DISPLAY_SIZE;
use crate::persist::RetryPolicy;

/// Where review progress is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// Everyone saves to one shared output file, which is merged in on load.
    #[default]
    Shared,
    /// Each reviewer saves to their own file; the input is never merged.
    PerReviewer,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub progress_mode: Option<ProgressMode>,
    pub per_reviewer_dir: Option<PathBuf>,
    pub download_allowlist: Option<Vec<String>>,
    pub download_file_name: Option<String>,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub save_attempts: Option<u32>,
    pub save_retry_delay_ms: Option<u64>,
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub progress_mode: ProgressMode,
    pub per_reviewer_dir: PathBuf,
    pub download_allowlist: Vec<String>,
    pub download_file_name: String,
    pub display_width: u32,
    pub display_height: u32,
    pub retry: RetryPolicy,
    pub http_timeout: Option<Duration>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        merge(ConfigFile::default())
    }
}

impl ReviewConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReviewError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(merge(parse_config(&content)?))
    }

    /// Output file for `reviewer` under the configured progress mode.
    pub fn output_for(&self, reviewer: &str) -> PathBuf {
        match self.progress_mode {
            ProgressMode::Shared => self.output_path.clone(),
            ProgressMode::PerReviewer => self
                .per_reviewer_dir
                .join(format!("{}.csv", reviewer_file_stem(reviewer))),
        }
    }

    pub fn may_download(&self, reviewer: &str) -> bool {
        let reviewer = reviewer.trim().to_lowercase();
        self.download_allowlist
            .iter()
            .any(|allowed| allowed.trim().to_lowercase() == reviewer)
    }
}

/// Lower-cased reviewer name, safe to use as a file name.
pub fn reviewer_file_stem(reviewer: &str) -> String {
    reviewer
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(attempts) = config.save_attempts
        && attempts == 0
    {
        return Err(ReviewError::ConfigValidation(
            "save_attempts must be > 0".to_string(),
        ));
    }
    if config.display_width == Some(0) || config.display_height == Some(0) {
        return Err(ReviewError::ConfigValidation(
            "display size must be non-zero".to_string(),
        ));
    }
    if let Some(name) = &config.download_file_name
        && name.trim().is_empty()
    {
        return Err(ReviewError::ConfigValidation(
            "download_file_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile) -> ReviewConfig {
    let defaults = RetryPolicy::default();
    ReviewConfig {
        input_path: file
            .input_path
            .unwrap_or_else(|| PathBuf::from("review_input.csv")),
        output_path: file
            .output_path
            .unwrap_or_else(|| PathBuf::from("updated_results.csv")),
        progress_mode: file.progress_mode.unwrap_or_default(),
        per_reviewer_dir: file.per_reviewer_dir.unwrap_or_else(|| PathBuf::from(".")),
        download_allowlist: file.download_allowlist.unwrap_or_default(),
        download_file_name: file
            .download_file_name
            .unwrap_or_else(|| "final_review_results.csv".to_string()),
        display_width: file.display_width.unwrap_or(DEFAULT_DISPLAY_SIZE.0),
        display_height: file.display_height.unwrap_or(DEFAULT_DISPLAY_SIZE.1),
        retry: RetryPolicy {
            max_attempts: file.save_attempts.unwrap_or(defaults.max_attempts),
            delay: file
                .save_retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
        },
        http_timeout: file.http_timeout_secs.map(Duration::from_secs),
    }
}
