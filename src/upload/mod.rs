//! Packing and uploading the training set.
//!
//! This module owns everything that touches the remote training service:
//! label resolution ([`labels`]), batch packing ([`pack`]), batch submission
//! ([`coordinator`]) and the HTTP client ([`http`]). The service is reached
//! only through the [`LabelRegistry`] and [`BatchSink`] traits, so packing and
//! coordination can be driven by in-memory fakes.

pub mod coordinator;
pub mod http;
pub mod labels;
pub mod pack;
mod report;

pub use coordinator::{upload_batches, UploadSummary};
pub use labels::{resolve_labels, LabelMap, OfflineRegistry};
pub use pack::{pack_batches, Batch, BatchLimits, PackOutcome};
pub use report::{LimitsSection, PackReport};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CocoliftError;

/// What kind of project the images are uploaded to. Fixed for a whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Entries carry normalized regions, one per box.
    Detection,
    /// Entries carry the set of labels present in the image.
    Classification,
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadMode::Detection => write!(f, "detection"),
            UploadMode::Classification => write!(f, "classification"),
        }
    }
}

/// Identifier of a label (tag) in the remote registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelId({})", self.0)
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A label as stored by the remote registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub id: LabelId,
    pub name: String,
}

/// A detection region, normalized to the image size.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub label_id: LabelId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One image in an upload batch.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEntry {
    Classification {
        url: String,
        label_ids: BTreeSet<LabelId>,
    },
    Detection {
        url: String,
        regions: Vec<Region>,
    },
}

impl UploadEntry {
    pub fn url(&self) -> &str {
        match self {
            UploadEntry::Classification { url, .. } | UploadEntry::Detection { url, .. } => url,
        }
    }

    /// Distinct labels this entry references.
    pub fn label_ids(&self) -> BTreeSet<LabelId> {
        match self {
            UploadEntry::Classification { label_ids, .. } => label_ids.clone(),
            UploadEntry::Detection { regions, .. } => {
                regions.iter().map(|r| r.label_id.clone()).collect()
            }
        }
    }
}

/// Per-image outcome reported by the upload service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemStatus {
    Ok,
    OkDuplicate,
    /// The service refused the image for carrying too many labels. The
    /// service also uses this for some region-count overflows, so it is
    /// treated as "image ignored" rather than as a hard failure.
    LabelLimitExceeded,
    /// Anything else. Fatal for the run.
    Other(String),
}

impl ItemStatus {
    /// Map a service status string.
    pub fn from_service(status: &str) -> Self {
        match status {
            "OK" => ItemStatus::Ok,
            "OKDuplicate" => ItemStatus::OkDuplicate,
            "ErrorTagLimitExceed" | "LabelLimitExceeded" => ItemStatus::LabelLimitExceeded,
            other => ItemStatus::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemStatus::Ok | ItemStatus::OkDuplicate)
    }
}

/// Status of one submitted image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemResult {
    pub source_url: String,
    pub status: ItemStatus,
}

/// Service response to one batch submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResponse {
    pub overall_success: bool,
    pub items: Vec<ItemResult>,
}

/// Remote store of named labels.
pub trait LabelRegistry {
    fn list_tags(&mut self) -> Result<Vec<Tag>, CocoliftError>;
    fn create_tag(&mut self, name: &str) -> Result<Tag, CocoliftError>;
}

/// Remote endpoint that accepts batches of upload entries.
pub trait BatchSink {
    /// Submit one batch. Transport-level failures are returned as errors;
    /// per-image outcomes come back in the response.
    fn submit(&mut self, batch: &[UploadEntry]) -> Result<BatchResponse, CocoliftError>;
}
