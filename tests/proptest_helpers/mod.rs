#![allow(dead_code)]

use std::collections::BTreeSet;

use cocolift::corpus::{
    Annotation, AnnotationId, AnnotationStore, BBoxXYWH, Category, CategoryId, DatasetInfo, Image,
    ImageId,
};
use cocolift::sample::SelectedBoundingBox;
use cocolift::training_set::TrainingImage;
use cocolift::upload::{LabelId, LabelMap};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// (image index, category index, has bbox)
type AnnSeed = (u16, u16, bool);

/// A corpus with `1..=max_images` images, `1..=max_cats` categories and up to
/// `max_anns` annotations. Roughly one annotation in eight has no bbox.
pub fn arb_store(max_images: usize, max_cats: usize, max_anns: usize) -> BoxedStrategy<AnnotationStore> {
    assert!(max_images > 0, "max_images must be > 0");
    assert!(max_cats > 0, "max_cats must be > 0");

    (1usize..=max_images, 1usize..=max_cats, 0usize..=max_anns)
        .prop_flat_map(|(image_count, category_count, ann_count)| {
            (
                proptest::collection::vec((2u32..=4096, 2u32..=4096), image_count..=image_count),
                Just(category_count),
                proptest::collection::vec(ann_seed_strategy(), ann_count..=ann_count),
            )
                .prop_map(|(sizes, category_count, seeds)| build_store(sizes, category_count, seeds))
        })
        .boxed()
}

fn ann_seed_strategy() -> impl Strategy<Value = AnnSeed> {
    (any::<u16>(), any::<u16>(), prop::bool::weighted(0.875))
}

fn build_store(sizes: Vec<(u32, u32)>, category_count: usize, seeds: Vec<AnnSeed>) -> AnnotationStore {
    let images: Vec<Image> = sizes
        .iter()
        .enumerate()
        .map(|(idx, (w, h))| {
            let id = idx as u64 + 1;
            Image::new(
                id,
                format!("{id:06}.jpg"),
                format!("http://img/{id:06}.jpg"),
                *w as f64,
                *h as f64,
            )
        })
        .collect();

    let categories: Vec<Category> = (1..=category_count as u64)
        .map(|id| Category::new(id, format!("cat{id}"), format!("super{}", id % 2)))
        .collect();

    let annotations = seeds
        .into_iter()
        .enumerate()
        .map(|(idx, (img_seed, cat_seed, has_bbox))| {
            let image_id = (img_seed as usize % images.len()) as u64 + 1;
            let category_id = (cat_seed as usize % category_count) as u64 + 1;
            let id = idx as u64 + 1;
            if has_bbox {
                Annotation::new(id, image_id, category_id, BBoxXYWH::new(1.0, 1.0, 8.0, 8.0))
            } else {
                Annotation::without_bbox(id, image_id, category_id)
            }
        })
        .collect();

    AnnotationStore::new(DatasetInfo::default(), images, categories, annotations)
}

/// Training records referencing categories `1..=max_category`, plus a label map
/// that leaves every fifth category unmapped.
pub fn arb_records(
    max_records: usize,
    max_category: u64,
) -> BoxedStrategy<(Vec<TrainingImage>, LabelMap)> {
    let record = (
        proptest::collection::vec(1u64..=max_category, 0..=6),
        prop_oneof![9 => Just(640.0f64), 1 => Just(0.0f64)],
    );
    proptest::collection::vec(record, 0..=max_records)
        .prop_map(move |raw| {
            let records = raw
                .into_iter()
                .enumerate()
                .map(|(idx, (cats, width))| training_image(idx as u64 + 1, &cats, width))
                .collect();
            let labels = (1..=max_category)
                .filter(|c| c % 5 != 0)
                .map(|c| (CategoryId(c), LabelId::new(format!("tag-{c}"))))
                .collect();
            (records, labels)
        })
        .boxed()
}

pub fn training_image(image: u64, cats: &[u64], width: f64) -> TrainingImage {
    TrainingImage {
        image_id: ImageId(image),
        url: format!("http://img/{image}.jpg"),
        file_name: format!("{image}.jpg"),
        width,
        height: 480.0,
        boxes: cats
            .iter()
            .enumerate()
            .map(|(i, cat)| SelectedBoundingBox {
                annotation_id: AnnotationId(image * 100 + i as u64),
                image_id: ImageId(image),
                category_id: CategoryId(*cat),
                bbox: BBoxXYWH::new(10.0, 10.0, 20.0, 20.0),
            })
            .collect(),
    }
}

/// Images that carry at least one usable annotation in `categories`.
pub fn candidate_images(store: &AnnotationStore, categories: &[CategoryId]) -> BTreeSet<ImageId> {
    store
        .annotations()
        .iter()
        .filter(|ann| ann.is_usable() && categories.contains(&ann.category_id))
        .map(|ann| ann.image_id)
        .collect()
}
