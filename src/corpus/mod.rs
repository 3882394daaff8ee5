//! In-memory annotation corpus.
//!
//! The [`AnnotationStore`] is built once from a COCO instances file (local or
//! remote, see [`source`]) and is read-only afterwards. Every later stage of
//! the pipeline borrows it.
//!
//! # Example
//!
//! ```
//! use cocolift::corpus::io_coco_json::from_coco_str;
//!
//! let store = from_coco_str(r#"{
//!     "images": [{"id": 1, "file_name": "a.jpg", "coco_url": "http://x/a.jpg", "width": 640, "height": 480}],
//!     "categories": [{"id": 1, "name": "dog", "supercategory": "animal"}],
//!     "annotations": [{"id": 1, "image_id": 1, "category_id": 1, "bbox": [1, 2, 3, 4], "segmentation": [[0, 0, 1, 1]]}]
//! }"#).unwrap();
//! assert_eq!(store.images().len(), 1);
//! ```

mod bbox;
mod ids;
pub mod io_coco_json;
mod model;
pub mod source;
mod space;

use std::collections::HashMap;

pub use bbox::BBoxXYWH;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{Annotation, Category, DatasetInfo, Image};
pub use space::{Normalized, Pixel};

/// How many annotations carried each segmentation encoding.
///
/// Geometry is never kept; the counts only feed the parse summary log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentationCounts {
    pub polygons: usize,
    pub rle: usize,
    pub absent: usize,
}

/// Parsed COCO corpus with lookup indexes.
#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    info: DatasetInfo,
    images: Vec<Image>,
    categories: Vec<Category>,
    annotations: Vec<Annotation>,
    segmentation: SegmentationCounts,
    image_index: HashMap<ImageId, usize>,
    annotations_by_image: HashMap<ImageId, Vec<usize>>,
}

impl AnnotationStore {
    /// Builds a store from already parsed records.
    ///
    /// Indexes are built here. If the corpus repeats an image id, the first
    /// occurrence wins lookups.
    pub fn new(
        info: DatasetInfo,
        images: Vec<Image>,
        categories: Vec<Category>,
        annotations: Vec<Annotation>,
    ) -> Self {
        let mut image_index = HashMap::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            image_index.entry(image.id).or_insert(idx);
        }

        let mut annotations_by_image: HashMap<ImageId, Vec<usize>> = HashMap::new();
        for (idx, ann) in annotations.iter().enumerate() {
            annotations_by_image.entry(ann.image_id).or_default().push(idx);
        }

        Self {
            info,
            images,
            categories,
            annotations,
            segmentation: SegmentationCounts::default(),
            image_index,
            annotations_by_image,
        }
    }

    pub(crate) fn with_segmentation_counts(mut self, counts: SegmentationCounts) -> Self {
        self.segmentation = counts;
        self
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn segmentation_counts(&self) -> SegmentationCounts {
        self.segmentation
    }

    /// Looks up an image by id.
    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.image_index.get(&id).map(|&idx| &self.images[idx])
    }

    /// All annotations of one image, in corpus order.
    pub fn annotations_for_image(&self, id: ImageId) -> impl Iterator<Item = &Annotation> + '_ {
        self.annotations_by_image
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.annotations[idx])
    }

    /// Number of annotations that carry a usable bbox.
    pub fn usable_annotation_count(&self) -> usize {
        self.annotations.iter().filter(|a| a.is_usable()).count()
    }
}
