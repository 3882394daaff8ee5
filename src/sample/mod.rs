//! Balanced image sampling.
//!
//! Picks up to a budget of images so that every selected category gets a turn
//! before any category gets a second one. Each category keeps a cursor into
//! its own list of images (in order of first appearance in the corpus); the
//! sampler walks the categories round-robin and lets each one contribute the
//! next image it has that is not already taken. A category whose list runs out
//! simply stops contributing. A full round in which nobody contributes ends the
//! loop, so the loop always terminates.
//!
//! Selection is deterministic: there is no randomness anywhere, and the
//! output order depends only on annotation order and category order.

mod report;

pub use report::{CategoryCount, SampleReport};

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use serde::Serialize;

use crate::corpus::{AnnotationId, AnnotationStore, BBoxXYWH, CategoryId, ImageId, Pixel};
use crate::select::CategorySelection;

/// Per-category list of candidate images, in first-occurrence order.
pub type CategoryImageLists = HashMap<CategoryId, Vec<ImageId>>;

/// One annotation of a sampled image that belongs to a selected category.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectedBoundingBox {
    pub annotation_id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBoxXYWH<Pixel>,
}

/// A sampled image with its filtered boxes. `boxes` is never empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampledImage {
    pub image_id: ImageId,
    pub boxes: Vec<SelectedBoundingBox>,
}

/// Result of [`sample_images`].
#[derive(Clone, Debug)]
pub struct SampleOutcome {
    pub images: Vec<SampledImage>,
    pub report: SampleReport,
}

/// Compute the effective image budget.
///
/// A requested budget of zero means no cap.
pub fn effective_budget(total: usize, requested: usize) -> usize {
    if requested == 0 {
        total
    } else {
        requested.min(total)
    }
}

/// Build each selected category's list of distinct candidate images.
///
/// Only annotations with a usable bbox count. Images appear in the order in
/// which their first qualifying annotation appears in the corpus.
pub fn category_image_lists(
    store: &AnnotationStore,
    selection: &CategorySelection,
) -> CategoryImageLists {
    let mut lists: CategoryImageLists = selection
        .order
        .iter()
        .map(|id| (*id, Vec::new()))
        .collect();
    let mut seen: HashSet<(CategoryId, ImageId)> = HashSet::new();

    for ann in store.annotations() {
        if !ann.is_usable() {
            continue;
        }
        let Some(list) = lists.get_mut(&ann.category_id) else {
            continue;
        };
        if seen.insert((ann.category_id, ann.image_id)) {
            list.push(ann.image_id);
        }
    }

    lists
}

/// Round-robin selection over per-category image lists.
///
/// `order` fixes the rotation. Returns at most `budget` distinct ids, in the
/// order they were picked.
pub fn select_image_ids_balanced(
    lists: &CategoryImageLists,
    order: &[CategoryId],
    budget: usize,
) -> Vec<ImageId> {
    let mut selected: Vec<ImageId> = Vec::with_capacity(budget);
    if budget == 0 {
        return selected;
    }

    let mut taken: HashSet<ImageId> = HashSet::with_capacity(budget);
    let mut cursors: HashMap<CategoryId, usize> = order.iter().map(|id| (*id, 0)).collect();

    loop {
        let mut added_any = false;

        for category in order {
            if selected.len() == budget {
                return selected;
            }

            let Some(images) = lists.get(category) else {
                continue;
            };
            let cursor = cursors.entry(*category).or_insert(0);

            while let Some(&candidate) = images.get(*cursor) {
                *cursor += 1;
                if taken.insert(candidate) {
                    selected.push(candidate);
                    added_any = true;
                    break;
                }
            }
        }

        if !added_any || selected.len() >= budget {
            break;
        }
    }

    selected
}

/// Gather every selected-category box of one image, in corpus order.
pub fn selected_boxes(
    store: &AnnotationStore,
    selection: &CategorySelection,
    image_id: ImageId,
) -> Vec<SelectedBoundingBox> {
    store
        .annotations_for_image(image_id)
        .filter(|ann| selection.contains(ann.category_id))
        .filter_map(|ann| {
            ann.bbox.map(|bbox| SelectedBoundingBox {
                annotation_id: ann.id,
                image_id: ann.image_id,
                category_id: ann.category_id,
                bbox,
            })
        })
        .collect()
}

/// Run the balanced sampler over a corpus.
///
/// Every picked image gets all of its boxes from selected categories, not
/// only the one that got it picked. Images left with no boxes are dropped, so
/// the result can be smaller than the effective budget.
pub fn sample_images(
    store: &AnnotationStore,
    selection: &CategorySelection,
    requested_budget: usize,
) -> SampleOutcome {
    let total = store.images().len();
    let budget = effective_budget(total, requested_budget);

    let lists = category_image_lists(store, selection);
    for category in &selection.order {
        debug!(
            "category {} ({}) has {} candidate images",
            category,
            selection.name(*category).unwrap_or("?"),
            lists.get(category).map_or(0, Vec::len)
        );
    }

    let picked = select_image_ids_balanced(&lists, &selection.order, budget);

    let mut images = Vec::with_capacity(picked.len());
    let mut dropped_empty = 0;
    for image_id in &picked {
        let boxes = selected_boxes(store, selection, *image_id);
        if boxes.is_empty() {
            dropped_empty += 1;
            continue;
        }
        images.push(SampledImage {
            image_id: *image_id,
            boxes,
        });
    }

    let report = SampleReport::build(
        selection,
        &images,
        requested_budget,
        budget,
        picked.len(),
        dropped_empty,
    );
    info!(
        "Sampled {} of {} images (budget {})",
        images.len(),
        total,
        budget
    );

    SampleOutcome { images, report }
}
