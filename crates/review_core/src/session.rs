//! The review session: who is reviewing, what is left, and saving their work.

use std::path::{Path, PathBuf};

use crate::config::{ProgressMode, ReviewConfig};
use crate::dataset::{Dataset, Record};
use crate::download::{self, DownloadArtifact};
use crate::error::{Result, ReviewError};
use crate::persist::{self, PersistFailure, RetryPolicy, SaveOutcome};

/// Where a reviewer is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingName,
    Loading,
    Reviewing,
    AllReviewed,
}

/// Counts for the progress banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub reviewed: usize,
    pub pending: usize,
    /// 1-based position of the current record in this session's queue, and the queue length.
    pub position: Option<(usize, usize)>,
}

/// Result of "Save & Next".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Saved; the cursor moved to the next record.
    Saved,
    /// Edits are kept in memory but the file could not be written.
    SaveFailed(PersistFailure),
}

/// Trimmed reviewer name, or `EmptyReviewer` when nothing is left.
pub fn validate_reviewer(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ReviewError::EmptyReviewer);
    }
    Ok(name.to_string())
}

/// State of one reviewer's session over a loaded dataset.
///
/// The queue holds the image references that were unreviewed when the
/// session started; `cursor` only ever moves forward through it. Records are
/// always addressed by image reference, never by position.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    reviewer: String,
    dataset: Dataset,
    queue: Vec<String>,
    cursor: usize,
    output_path: PathBuf,
    retry: RetryPolicy,
}

impl ReviewSession {
    /// Load the input for `reviewer_name` according to `config`.
    ///
    /// In shared mode any existing output file is merged in first, so work saved
    /// by earlier sessions (or other reviewers) is not offered again.
    pub fn initialize(config: &ReviewConfig, reviewer_name: &str) -> Result<Self> {
        let reviewer = validate_reviewer(reviewer_name)?;
        tracing::info!(
            "{reviewer} starts reviewing {}",
            config.input_path.display()
        );
        let mut dataset = Dataset::load(&config.input_path)?;
        let output_path = config.output_for(&reviewer);

        if config.progress_mode == ProgressMode::Shared && output_path.exists() {
            match Dataset::load_saved(&output_path) {
                Ok(saved) => {
                    let merged = dataset.merge_saved(&saved);
                    tracing::info!(
                        "merged {merged} reviewed rows from {}",
                        output_path.display()
                    );
                }
                Err(ReviewError::MissingColumn { column, path }) => {
                    tracing::warn!(
                        "not merging {}: column '{column}' is missing",
                        path.display()
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Self::new(dataset, &reviewer, output_path, config.retry)
    }

    /// Start a session over an already loaded dataset.
    pub fn new(
        dataset: Dataset,
        reviewer: &str,
        output_path: impl Into<PathBuf>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let reviewer = validate_reviewer(reviewer)?;
        let queue: Vec<String> = dataset
            .unreviewed()
            .map(|r| r.image_reference.clone())
            .collect();
        tracing::info!(
            "{} of {} rows pending for {reviewer}",
            queue.len(),
            dataset.len()
        );
        Ok(Self {
            reviewer,
            dataset,
            queue,
            cursor: 0,
            output_path: output_path.into(),
            retry,
        })
    }

    pub fn reviewer(&self) -> &str {
        &self.reviewer
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn phase(&self) -> SessionPhase {
        if self.cursor < self.queue.len() {
            SessionPhase::Reviewing
        } else {
            SessionPhase::AllReviewed
        }
    }

    /// The record to show, or `None` once the queue is exhausted.
    pub fn current_record(&self) -> Option<&Record> {
        self.queue
            .get(self.cursor)
            .and_then(|reference| self.dataset.record(reference))
    }

    /// Records nobody has reviewed yet, derived from the dataset as it is now.
    pub fn unreviewed(&self) -> Vec<&Record> {
        self.dataset.unreviewed().collect()
    }

    pub fn progress(&self) -> Progress {
        let total = self.dataset.len();
        let reviewed = self.dataset.reviewed_count();
        let position = (self.cursor < self.queue.len()).then(|| (self.cursor + 1, self.queue.len()));
        Progress {
            total,
            reviewed,
            pending: total - reviewed,
            position,
        }
    }

    /// Store the reviewer's values on the record shown as `image_reference` and save.
    ///
    /// The cursor only advances when the save succeeds; on failure the edits stay
    /// in memory so a later `persist` writes them.
    pub fn submit(
        &mut self,
        image_reference: &str,
        actual_reading: &str,
        actual_unit: &str,
    ) -> Result<SubmitOutcome> {
        let Some(current) = self.queue.get(self.cursor) else {
            return Err(ReviewError::NothingPending);
        };
        if current != image_reference {
            return Err(ReviewError::StaleRecord(image_reference.to_string()));
        }
        if !self
            .dataset
            .apply_review(image_reference, actual_reading, actual_unit, &self.reviewer)
        {
            return Err(ReviewError::StaleRecord(image_reference.to_string()));
        }

        match self.persist() {
            SaveOutcome::Saved { .. } => {
                self.cursor += 1;
                Ok(SubmitOutcome::Saved)
            }
            SaveOutcome::Failed(failure) => {
                tracing::warn!("keeping edits for {image_reference} in memory: {failure}");
                Ok(SubmitOutcome::SaveFailed(failure))
            }
        }
    }

    /// Write the whole dataset to this session's output file.
    pub fn persist(&self) -> SaveOutcome {
        persist::persist_dataset(&self.dataset, &self.output_path, self.retry)
    }

    /// "Save Final File": only offered once nothing is left in the queue.
    pub fn finalize(&self) -> Result<SaveOutcome> {
        if self.phase() != SessionPhase::AllReviewed {
            return Err(ReviewError::PendingRecords(self.queue.len() - self.cursor));
        }
        Ok(self.persist())
    }

    pub fn prepare_download(&self, config: &ReviewConfig) -> Option<Result<DownloadArtifact>> {
        download::prepare_download(config, &self.reviewer, &self.output_path)
    }
}
