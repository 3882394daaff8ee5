//! Packing report and upload summary formatting.

use serde::Serialize;
use std::fmt;

use super::coordinator::UploadSummary;
use super::pack::{BatchLimits, PackOutcome};
use super::UploadMode;
use crate::corpus::ImageId;

/// Shape of a packed upload plan.
#[derive(Clone, Debug, Serialize)]
pub struct PackReport {
    pub mode: UploadMode,
    pub labels: usize,
    pub batches: usize,
    pub entries: usize,
    /// Entries in the fullest batch.
    pub largest_batch: usize,
    /// Highest distinct-label count across batches.
    pub max_batch_labels: usize,
    pub limits: LimitsSection,
    pub skipped: Vec<ImageId>,
    pub oversized: Vec<ImageId>,
}

/// Limits the plan was packed against.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct LimitsSection {
    pub max_items: usize,
    pub max_distinct_labels: usize,
}

impl From<BatchLimits> for LimitsSection {
    fn from(limits: BatchLimits) -> Self {
        Self {
            max_items: limits.max_items,
            max_distinct_labels: limits.max_distinct_labels,
        }
    }
}

impl PackReport {
    pub fn new(mode: UploadMode, labels: usize, limits: BatchLimits, outcome: &PackOutcome) -> Self {
        Self {
            mode,
            labels,
            batches: outcome.batches.len(),
            entries: outcome.entry_count(),
            largest_batch: outcome.batches.iter().map(|b| b.len()).max().unwrap_or(0),
            max_batch_labels: outcome
                .batches
                .iter()
                .map(|b| b.distinct_label_count())
                .max()
                .unwrap_or(0),
            limits: limits.into(),
            skipped: outcome.skipped.clone(),
            oversized: outcome.oversized.clone(),
        }
    }
}

impl fmt::Display for PackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Upload plan ({}): {} images in {} batches, {} labels",
            self.mode, self.entries, self.batches, self.labels
        )?;
        writeln!(
            f,
            "  largest batch {} / {}, most labels in a batch {} (kept below {})",
            self.largest_batch,
            self.limits.max_items,
            self.max_batch_labels,
            self.limits.max_distinct_labels
        )?;
        if !self.skipped.is_empty() {
            writeln!(
                f,
                "  skipped {} image(s) with no usable boxes",
                self.skipped.len()
            )?;
        }
        if !self.oversized.is_empty() {
            let ids: Vec<String> = self.oversized.iter().map(ToString::to_string).collect();
            writeln!(
                f,
                "  {} image(s) carry too many labels and will likely be refused: {}",
                self.oversized.len(),
                ids.join(", ")
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Uploaded {} batches: {} new, {} duplicate, {} ignored",
            self.batches_submitted, self.uploaded, self.duplicates, self.ignored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::pack::Batch;
    use crate::upload::LabelId;

    #[test]
    fn summarizes_outcome() {
        let mut big = Batch::default();
        big.image_ids = vec![ImageId(1), ImageId(2)];
        big.entries = vec![
            crate::upload::UploadEntry::Detection {
                url: "a".into(),
                regions: vec![]
            };
            2
        ];
        big.labels.insert(LabelId::new("L1"));
        big.labels.insert(LabelId::new("L2"));

        let outcome = PackOutcome {
            batches: vec![big, Batch::default()],
            skipped: vec![ImageId(9)],
            oversized: vec![],
        };
        let report = PackReport::new(UploadMode::Detection, 2, BatchLimits::default(), &outcome);
        assert_eq!(report.entries, 2);
        assert_eq!(report.largest_batch, 2);
        assert_eq!(report.max_batch_labels, 2);

        let text = report.to_string();
        assert!(text.contains("2 images in 2 batches"));
        assert!(text.contains("skipped 1 image(s)"));
    }
}
