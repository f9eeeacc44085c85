//! Convenient re-exports for downstream crates.

pub use crate::config::{Environment, NotificationSettings, PipelineConfig, QualityThresholds};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{GroupId, TaskId};
pub use crate::manifest::{AdviceManifest, ManifestId};
pub use crate::source::{SourceStats, SourceStatus};
pub use crate::volume::{VolumeMetrics, BYTES_PER_MB};
