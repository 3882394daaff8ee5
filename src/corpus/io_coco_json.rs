//! COCO instances JSON reader.
//!
//! The reader streams the document through `serde_json::from_reader`: only
//! `info`, `images`, `annotations` and `categories` are materialized, and
//! every other key (including `licenses`) is skipped with
//! [`IgnoredAny`](serde::de::IgnoredAny).
//!
//! # Segmentation
//!
//! COCO annotations carry a segmentation in one of two shapes: a list of
//! polygons for ordinary objects, or an RLE object (`{"counts", "size"}`) for
//! crowd regions. Only the shape is recorded; the geometry is drained without
//! being allocated, then the record collapses into a plain
//! [`Annotation`](super::Annotation).
//!
//! # Bounding boxes
//!
//! COCO boxes are `[x, y, width, height]` in pixels. A missing, `null`, or
//! empty `bbox` (and, leniently, any length other than four) leaves the
//! annotation without a box, and it is then ignored by sampling.

use std::fmt;
use std::io::Read;

use log::{debug, info};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use super::model::{Annotation, Category, DatasetInfo, Image};
use super::{AnnotationId, AnnotationStore, BBoxXYWH, CategoryId, ImageId, SegmentationCounts};
use crate::error::CocoliftError;

// ============================================================================
// COCO schema types (internal to this module)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CocoDocument {
    #[serde(default)]
    info: Option<CocoInfo>,

    #[serde(default)]
    images: Vec<CocoImage>,

    #[serde(default)]
    annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Default, Deserialize)]
struct CocoInfo {
    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    version: Option<String>,

    #[serde(default)]
    year: Option<u32>,

    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    id: u64,

    #[serde(default)]
    file_name: String,

    #[serde(default)]
    coco_url: Option<String>,

    #[serde(default)]
    flickr_url: Option<String>,

    #[serde(default)]
    width: f64,

    #[serde(default)]
    height: f64,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default)]
    supercategory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    #[serde(default)]
    bbox: Option<Vec<f64>>,

    #[serde(default)]
    segmentation: SegmentationShape,
}

/// Which segmentation encoding an annotation used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SegmentationShape {
    /// `[[x1, y1, x2, y2, ...], ...]`
    Polygons,
    /// `{"counts": ..., "size": [h, w]}`
    Rle,
    #[default]
    Absent,
}

impl<'de> Deserialize<'de> for SegmentationShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ShapeVisitor;

        impl<'de> Visitor<'de> for ShapeVisitor {
            type Value = SegmentationShape;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a polygon list or an RLE object")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(SegmentationShape::Polygons)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(SegmentationShape::Rle)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SegmentationShape::Absent)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SegmentationShape::Absent)
            }
        }

        deserializer.deserialize_any(ShapeVisitor)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a corpus from a local path or an absolute URL.
///
/// # Errors
/// [`CocoliftError::SourceUnavailable`] if the source cannot be opened,
/// [`CocoliftError::MalformedInput`] if it is not a COCO JSON document.
pub fn read_coco_json(input: &str) -> Result<AnnotationStore, CocoliftError> {
    let reader = super::source::open(input)?;
    let store = from_coco_reader(reader).map_err(|source| CocoliftError::MalformedInput {
        source_name: input.to_string(),
        source,
    })?;

    let seg = store.segmentation_counts();
    info!(
        "Loaded {}: {} images, {} categories, {} annotations ({} with boxes)",
        input,
        store.images().len(),
        store.categories().len(),
        store.annotations().len(),
        store.usable_annotation_count()
    );
    debug!(
        "segmentation encodings: {} polygon, {} rle, {} absent",
        seg.polygons, seg.rle, seg.absent
    );
    if let Some(description) = &store.info().description {
        debug!("dataset description: {description}");
    }

    Ok(store)
}

/// Reads a corpus from any byte stream.
pub fn from_coco_reader<R: Read>(reader: R) -> Result<AnnotationStore, serde_json::Error> {
    let doc: CocoDocument = serde_json::from_reader(reader)?;
    Ok(coco_to_store(doc))
}

/// Reads a corpus from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<AnnotationStore, serde_json::Error> {
    let doc: CocoDocument = serde_json::from_str(json)?;
    Ok(coco_to_store(doc))
}

/// Reads a corpus from a JSON byte slice.
///
/// Useful for fuzzing and benchmarks.
pub fn from_coco_slice(bytes: &[u8]) -> Result<AnnotationStore, serde_json::Error> {
    let doc: CocoDocument = serde_json::from_slice(bytes)?;
    Ok(coco_to_store(doc))
}

// ============================================================================
// Conversion: COCO -> store
// ============================================================================

fn coco_to_store(doc: CocoDocument) -> AnnotationStore {
    let info = doc
        .info
        .map(|i| DatasetInfo {
            description: i.description,
            version: i.version,
            year: i.year,
            url: i.url,
        })
        .unwrap_or_default();

    let images = doc
        .images
        .into_iter()
        .map(|img| Image {
            id: ImageId::new(img.id),
            file_name: img.file_name,
            url: img.coco_url.or(img.flickr_url).unwrap_or_default(),
            width: img.width,
            height: img.height,
        })
        .collect();

    let categories = doc
        .categories
        .into_iter()
        .map(|cat| Category {
            id: CategoryId::new(cat.id),
            name: cat.name,
            supercategory: cat.supercategory.unwrap_or_default(),
        })
        .collect();

    let mut seg = SegmentationCounts::default();
    let annotations = doc
        .annotations
        .into_iter()
        .map(|ann| {
            match ann.segmentation {
                SegmentationShape::Polygons => seg.polygons += 1,
                SegmentationShape::Rle => seg.rle += 1,
                SegmentationShape::Absent => seg.absent += 1,
            }

            Annotation {
                id: AnnotationId::new(ann.id),
                image_id: ImageId::new(ann.image_id),
                category_id: CategoryId::new(ann.category_id),
                bbox: ann.bbox.as_deref().and_then(BBoxXYWH::from_coco_slice),
            }
        })
        .collect();

    AnnotationStore::new(info, images, categories, annotations).with_segmentation_counts(seg)
}

// ============================================================================
// Tests
// ============================================================================
