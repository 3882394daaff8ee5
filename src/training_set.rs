//! Joining sampled images back to image metadata.

use serde::Serialize;

use crate::corpus::{AnnotationStore, ImageId};
use crate::error::CocoliftError;
use crate::sample::{SampledImage, SelectedBoundingBox};

/// A sampled image ready for packing: what the upload service needs to fetch
/// it, plus its boxes in the selected categories.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingImage {
    pub image_id: ImageId,
    pub url: String,
    pub file_name: String,
    pub width: f64,
    pub height: f64,
    pub boxes: Vec<SelectedBoundingBox>,
}

/// Attach url, file name and size to every sampled image.
///
/// Order is preserved.
///
/// # Errors
/// [`CocoliftError::DataIntegrity`] if a sampled image id is missing from the
/// image table, which means the annotation file is corrupt.
pub fn build_training_set(
    store: &AnnotationStore,
    sampled: Vec<SampledImage>,
) -> Result<Vec<TrainingImage>, CocoliftError> {
    sampled
        .into_iter()
        .map(|sample| {
            let image = store
                .image(sample.image_id)
                .ok_or(CocoliftError::DataIntegrity {
                    image_id: sample.image_id,
                })?;
            Ok(TrainingImage {
                image_id: sample.image_id,
                url: image.url.clone(),
                file_name: image.file_name.clone(),
                width: image.width,
                height: image.height,
                boxes: sample.boxes,
            })
        })
        .collect()
}
