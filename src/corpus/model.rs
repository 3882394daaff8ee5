//! Parsed corpus records.
//!
//! These are the only shapes the rest of the pipeline sees. Anything the COCO
//! file carries beyond them (licenses, segmentation geometry, crowd flags) is
//! dropped by the reader.

use serde::{Deserialize, Serialize};

use super::bbox::BBoxXYWH;
use super::ids::{AnnotationId, CategoryId, ImageId};
use super::space::Pixel;

/// Descriptive metadata from the COCO `info` block.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An image in the corpus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    /// File name as listed in the corpus.
    pub file_name: String,

    /// Publicly reachable URL the upload service fetches the image from.
    pub url: String,

    /// Width in pixels. COCO stores integers, but some exports use floats.
    pub width: f64,

    /// Height in pixels.
    pub height: f64,
}

impl Image {
    /// Creates a new image with the given properties.
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        url: impl Into<String>,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            url: url.into(),
            width,
            height,
        }
    }
}

/// A category (class label).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    /// Name of the category (e.g., "dog").
    pub name: String,

    /// Grouping name (e.g., "animal"). Empty when the corpus omits it.
    #[serde(default)]
    pub supercategory: String,
}

impl Category {
    /// Creates a new category.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }
}

/// One object instance in one image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,

    /// Pixel box, or `None` when the corpus gave no usable bbox. Annotations
    /// without a box never take part in sampling or packing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBoxXYWH<Pixel>>,
}

impl Annotation {
    /// Creates a new annotation with a box.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYWH<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox: Some(bbox),
        }
    }

    /// Creates an annotation with no usable box.
    pub fn without_bbox(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox: None,
        }
    }

    /// True if this annotation has a box and may be used downstream.
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.bbox.is_some()
    }
}
