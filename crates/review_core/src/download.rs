//! Handing the saved output file to privileged reviewers.

use std::fs;
use std::path::Path;

use crate::config::ReviewConfig;
use crate::error::Result;

pub const DOWNLOAD_MIME: &str = "text/csv";

/// Bytes of the output file, ready to be offered as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// `None` when `reviewer` is not allow-listed or nothing has been saved yet.
pub fn prepare_download(
    config: &ReviewConfig,
    reviewer: &str,
    output_path: &Path,
) -> Option<Result<DownloadArtifact>> {
    if !config.may_download(reviewer) || !output_path.exists() {
        return None;
    }
    Some(
        fs::read(output_path)
            .map(|bytes| DownloadArtifact {
                file_name: config.download_file_name.clone(),
                mime: DOWNLOAD_MIME,
                bytes,
            })
            .map_err(Into::into),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn config() -> ReviewConfig {
        ReviewConfig {
            download_allowlist: vec!["Rahul Pushp".into()],
            ..ReviewConfig::default()
        }
    }

    #[test]
    fn allowlisted_reviewer_gets_file_contents() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("updated_results.csv");
        fs::write(&out, "actual_image_path\na.jpg\n")?;

        let artifact = prepare_download(&config(), "rahul pushp", &out).unwrap()?;
        assert_eq!(artifact.file_name, "final_review_results.csv");
        assert_eq!(artifact.mime, "text/csv");
        assert_eq!(artifact.bytes, b"actual_image_path\na.jpg\n");
        Ok(())
    }

    #[test]
    fn hidden_for_other_reviewers() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("updated_results.csv");
        fs::write(&out, "x")?;
        assert!(prepare_download(&config(), "alice", &out).is_none());
        Ok(())
    }

    #[test]
    fn hidden_until_something_is_saved() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("updated_results.csv");
        assert!(prepare_download(&config(), "Rahul Pushp", &out).is_none());
        Ok(())
    }
}
