//! Packing training images into upload batches.
//!
//! A batch is bounded twice: by the number of entries, and by the number of
//! distinct labels referenced across all its entries. Records are taken in
//! order. When a record would push the batch to the label cap, the batch is
//! closed as it is and the same record is tried again against an empty batch.
//!
//! A record that reaches the cap on its own can never fit. It still gets a
//! batch of its own, and the service is left to reject it; the coordinator
//! counts that rejection as an ignored image.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use super::labels::LabelMap;
use super::{LabelId, Region, UploadEntry, UploadMode};
use crate::corpus::ImageId;
use crate::training_set::TrainingImage;

/// Most images the service accepts in one batch.
pub const MAX_BATCH_SIZE: usize = 64;

/// Most distinct labels the service accepts in one batch. Batches are kept
/// strictly below it.
pub const MAX_DISTINCT_LABELS: usize = 20;

/// Capacity limits for one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_items: usize,
    pub max_distinct_labels: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_items: MAX_BATCH_SIZE,
            max_distinct_labels: MAX_DISTINCT_LABELS,
        }
    }
}

/// One batch of upload entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub entries: Vec<UploadEntry>,
    /// Source image of each entry, same order as `entries`.
    pub image_ids: Vec<ImageId>,
    /// Distinct labels referenced by the batch.
    pub labels: BTreeSet<LabelId>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn distinct_label_count(&self) -> usize {
        self.labels.len()
    }

    fn push(&mut self, image_id: ImageId, entry: UploadEntry, labels: BTreeSet<LabelId>) {
        self.entries.push(entry);
        self.image_ids.push(image_id);
        self.labels.extend(labels);
    }
}

/// Result of [`pack_batches`].
#[derive(Clone, Debug, Default)]
pub struct PackOutcome {
    pub batches: Vec<Batch>,
    /// Records that produced no usable box or label. They are in no batch.
    pub skipped: Vec<ImageId>,
    /// Records with too many labels to share a batch. Each sits alone in its
    /// own batch and is expected to be rejected by the service.
    pub oversized: Vec<ImageId>,
}

impl PackOutcome {
    pub fn entry_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// Build the upload entry for one record.
///
/// Boxes whose category has no label are unusable. In detection mode a box
/// is also unusable when the image size cannot normalize it. Returns `None`
/// when nothing usable is left.
pub fn build_entry(
    record: &TrainingImage,
    labels: &LabelMap,
    mode: UploadMode,
) -> Option<(UploadEntry, BTreeSet<LabelId>)> {
    match mode {
        UploadMode::Detection => {
            let regions: Vec<Region> = record
                .boxes
                .iter()
                .filter_map(|bbox| {
                    let label_id = labels.get(bbox.category_id)?.clone();
                    let norm = bbox.bbox.normalize(record.width, record.height)?;
                    Some(Region {
                        label_id,
                        left: norm.x,
                        top: norm.y,
                        width: norm.width,
                        height: norm.height,
                    })
                })
                .collect();
            if regions.is_empty() {
                return None;
            }
            let used = regions.iter().map(|r| r.label_id.clone()).collect();
            Some((
                UploadEntry::Detection {
                    url: record.url.clone(),
                    regions,
                },
                used,
            ))
        }
        UploadMode::Classification => {
            let label_ids: BTreeSet<LabelId> = record
                .boxes
                .iter()
                .filter_map(|bbox| labels.get(bbox.category_id).cloned())
                .collect();
            if label_ids.is_empty() {
                return None;
            }
            Some((
                UploadEntry::Classification {
                    url: record.url.clone(),
                    label_ids: label_ids.clone(),
                },
                label_ids,
            ))
        }
    }
}

/// Pack records into batches in a single forward pass.
///
/// Record order is preserved across and within batches.
pub fn pack_batches(
    records: &[TrainingImage],
    labels: &LabelMap,
    mode: UploadMode,
    limits: BatchLimits,
) -> PackOutcome {
    let mut outcome = PackOutcome::default();
    let mut current = Batch::default();
    let mut cursor = 0;

    // The cursor only moves once a record is placed or skipped.
    while let Some(record) = records.get(cursor) {
        let Some((entry, entry_labels)) = build_entry(record, labels, mode) else {
            debug!("image {} has no usable boxes, skipping", record.image_id);
            outcome.skipped.push(record.image_id);
            cursor += 1;
            continue;
        };

        let prospective = current.labels.union(&entry_labels).count();
        let overflows = prospective >= limits.max_distinct_labels;

        if overflows && !current.is_empty() {
            outcome.batches.push(std::mem::take(&mut current));
            continue;
        }

        current.push(record.image_id, entry, entry_labels);
        cursor += 1;

        if overflows {
            warn!(
                "image {} has {} distinct labels and cannot share a batch",
                record.image_id,
                current.distinct_label_count()
            );
            outcome.oversized.push(record.image_id);
            outcome.batches.push(std::mem::take(&mut current));
        } else if current.len() >= limits.max_items {
            outcome.batches.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        outcome.batches.push(current);
    }

    info!(
        "Packed {} images into {} batches ({} skipped, {} oversized)",
        outcome.entry_count(),
        outcome.batches.len(),
        outcome.skipped.len(),
        outcome.oversized.len()
    );
    outcome
}
