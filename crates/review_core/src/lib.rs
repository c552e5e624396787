//! Core of the image annotation review tool: the dataset, saving with retry,
//! image loading and the per-reviewer session that ties them together.

pub mod config;
pub mod dataset;
pub mod download;
pub mod error;
pub mod image_source;
pub mod persist;
pub mod session;

pub use config::{ProgressMode, ReviewConfig};
pub use dataset::{Dataset, Record};
pub use download::DownloadArtifact;
pub use error::{Result, ReviewError};
pub use image_source::{ImageLoadError, ImageLoader};
pub use persist::{FailureKind, PersistFailure, RetryPolicy, SaveOutcome};
pub use session::{Progress, ReviewSession, SessionPhase, SubmitOutcome};
