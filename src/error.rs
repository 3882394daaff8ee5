use thiserror::Error;

use crate::corpus::ImageId;

/// The main error type for cocolift operations.
#[derive(Debug, Error)]
pub enum CocoliftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {source_name}: {source}")]
    MalformedInput {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot open annotation source '{input}': {message}")]
    SourceUnavailable { input: String, message: String },

    #[error("None of the requested categories were found in the dataset: {}", requested.join(", "))]
    NoMatchingCategories { requested: Vec<String> },

    #[error(
        "Image budget {budget} is too small for {categories} categories \
         (at least {required} images are needed, 15 per category)"
    )]
    InsufficientBudget {
        budget: usize,
        categories: usize,
        required: usize,
    },

    #[error("Image {image_id} is referenced by an annotation but missing from the image table")]
    DataIntegrity { image_id: ImageId },

    #[error("Label registry error: {message}")]
    LabelRegistry { message: String },

    #[error("Failed to upload batch {batch_index}: {message}")]
    BatchFailed { batch_index: usize, message: String },

    #[error("Failed to submit batch {batch_index}: {source}")]
    BatchSubmit {
        batch_index: usize,
        #[source]
        source: Box<CocoliftError>,
    },

    #[error("Remote call '{operation}' failed: {message}")]
    Remote { operation: String, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
