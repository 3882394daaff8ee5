//! Submitting batches and interpreting the service's verdicts.

use log::{info, warn};
use serde::Serialize;

use super::pack::Batch;
use super::{BatchSink, ItemStatus};
use crate::error::CocoliftError;

/// Totals over all submitted batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub batches_submitted: usize,
    /// Images accepted as new.
    pub uploaded: usize,
    /// Images the service already had.
    pub duplicates: usize,
    /// Images refused with a label-limit status. Not retried.
    pub ignored: usize,
}

/// Submit batches in order.
///
/// `OK` and `OKDuplicate` count as success. A label-limit refusal is counted
/// as ignored and the run continues. Any other status, a transport failure, or
/// a batch the service marks unsuccessful without a label-limit refusal to
/// explain it stops the run. Batches already submitted stay submitted.
///
/// # Errors
/// [`CocoliftError::BatchFailed`] naming the 1-based batch number when the
/// service rejects an image, or [`CocoliftError::BatchSubmit`] wrapping the
/// transport error when the batch never got a verdict.
pub fn upload_batches<S: BatchSink + ?Sized>(
    sink: &mut S,
    batches: &[Batch],
) -> Result<UploadSummary, CocoliftError> {
    let mut summary = UploadSummary::default();
    let total = batches.len();

    for (idx, batch) in batches.iter().enumerate() {
        let batch_index = idx + 1;
        if batch.is_empty() {
            continue;
        }
        info!(
            "Uploading batch {}/{} ({} images, {} labels)",
            batch_index,
            total,
            batch.len(),
            batch.distinct_label_count()
        );

        let response = sink
            .submit(&batch.entries)
            .map_err(|err| CocoliftError::BatchSubmit {
                batch_index,
                source: Box::new(err),
            })?;

        let mut ignored_here = 0;
        for item in &response.items {
            match &item.status {
                ItemStatus::Ok => summary.uploaded += 1,
                ItemStatus::OkDuplicate => summary.duplicates += 1,
                ItemStatus::LabelLimitExceeded => {
                    warn!("service ignored {}: too many labels", item.source_url);
                    ignored_here += 1;
                }
                ItemStatus::Other(status) => {
                    return Err(CocoliftError::BatchFailed {
                        batch_index,
                        message: format!("image {} rejected with status {}", item.source_url, status),
                    });
                }
            }
        }

        if !response.overall_success && ignored_here == 0 {
            return Err(CocoliftError::BatchFailed {
                batch_index,
                message: "service reported the batch as unsuccessful".to_string(),
            });
        }

        summary.ignored += ignored_here;
        summary.batches_submitted += 1;
    }

    if summary.ignored > 0 {
        info!("Upload done, ignored {} image(s)", summary.ignored);
    } else {
        info!("Upload done");
    }
    Ok(summary)
}
