//! Bounded retry around output-file writes.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::dataset::Dataset;

/// How often, and how patiently, a locked output file is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of write attempts, at least one.
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No pause between attempts; for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Why a save did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The file stayed locked or read-only for every attempt.
    Locked,
    /// Any other I/O failure; not retried.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    pub path: PathBuf,
    pub attempts: u32,
    pub kind: FailureKind,
}

impl fmt::Display for PersistFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Locked => write!(
                f,
                "{} is open elsewhere (gave up after {} attempts); close it and try again",
                self.path.display(),
                self.attempts
            ),
            FailureKind::Other(message) => {
                write!(f, "could not save {}: {message}", self.path.display())
            }
        }
    }
}

impl std::error::Error for PersistFailure {}

/// Result of a save request. Saving never panics or bubbles an error further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, attempts: u32 },
    Failed(PersistFailure),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Errors that mean "someone else holds the file" and are worth waiting out.
pub fn is_lock_error(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33))
}

/// Run `write` until it succeeds, fails with a non-lock error, or the policy runs out.
pub fn write_with_retry<F>(path: &Path, policy: RetryPolicy, mut write: F) -> SaveOutcome
where
    F: FnMut() -> io::Result<()>,
{
    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match write() {
            Ok(()) => {
                return SaveOutcome::Saved {
                    path: path.to_path_buf(),
                    attempts: attempt,
                };
            }
            Err(err) if is_lock_error(&err) => {
                tracing::warn!(
                    "{} is locked (attempt {attempt}/{max_attempts}): {err}",
                    path.display()
                );
                if attempt < max_attempts && !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
            }
            Err(err) => {
                tracing::error!("saving {} failed: {err}", path.display());
                return SaveOutcome::Failed(PersistFailure {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    kind: FailureKind::Other(err.to_string()),
                });
            }
        }
    }
    SaveOutcome::Failed(PersistFailure {
        path: path.to_path_buf(),
        attempts: max_attempts,
        kind: FailureKind::Locked,
    })
}

/// Save the whole dataset to `path` under `policy`.
pub fn persist_dataset(dataset: &Dataset, path: &Path, policy: RetryPolicy) -> SaveOutcome {
    let outcome = write_with_retry(path, policy, || dataset.save(path));
    if let SaveOutcome::Saved { attempts, .. } = &outcome {
        tracing::info!(
            "saved {} rows to {} (attempt {attempts})",
            dataset.len(),
            path.display()
        );
    }
    outcome
}
