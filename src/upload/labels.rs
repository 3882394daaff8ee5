//! Mapping corpus categories to remote labels.

use std::collections::BTreeMap;

use log::{debug, info};

use super::{LabelId, LabelRegistry, Tag};
use crate::corpus::CategoryId;
use crate::error::CocoliftError;
use crate::select::CategorySelection;
use crate::training_set::TrainingImage;

/// Category id to remote label id, fixed for the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    by_category: BTreeMap<CategoryId, LabelId>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: CategoryId, label: LabelId) {
        self.by_category.insert(category, label);
    }

    pub fn get(&self, category: CategoryId) -> Option<&LabelId> {
        self.by_category.get(&category)
    }

    pub fn len(&self) -> usize {
        self.by_category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }
}

impl FromIterator<(CategoryId, LabelId)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (CategoryId, LabelId)>>(iter: I) -> Self {
        Self {
            by_category: iter.into_iter().collect(),
        }
    }
}

/// Look up or create a remote label for every category the training set uses.
///
/// The registry is listed once. Names are matched case-insensitively against
/// existing tags; unknown names are created. Categories are visited in
/// selection order, so label creation order is deterministic.
///
/// # Errors
/// Propagates registry failures. Returns [`CocoliftError::LabelRegistry`] if a
/// box refers to a category that is not part of the selection.
pub fn resolve_labels<R: LabelRegistry + ?Sized>(
    registry: &mut R,
    selection: &CategorySelection,
    records: &[TrainingImage],
) -> Result<LabelMap, CocoliftError> {
    let mut used: Vec<CategoryId> = Vec::new();
    for record in records {
        for bbox in &record.boxes {
            if !used.contains(&bbox.category_id) {
                used.push(bbox.category_id);
            }
        }
    }
    used.sort_by_key(|id| selection.order.iter().position(|s| s == id));

    let mut tags = registry.list_tags()?;
    let mut map = LabelMap::new();
    let mut created = 0;

    for category in used {
        let name = selection
            .name(category)
            .ok_or_else(|| CocoliftError::LabelRegistry {
                message: format!("category {category} is not part of the selection"),
            })?;

        let existing = tags
            .iter()
            .find(|tag| tag.name.to_lowercase() == name.to_lowercase())
            .map(|tag| tag.id.clone());

        let label = match existing {
            Some(id) => id,
            None => {
                let tag = registry.create_tag(name)?;
                debug!("created label '{}' as {}", tag.name, tag.id);
                created += 1;
                let id = tag.id.clone();
                tags.push(tag);
                id
            }
        };
        map.insert(category, label);
    }

    info!(
        "Resolved {} labels ({} created, {} reused)",
        map.len(),
        created,
        map.len() - created
    );
    Ok(map)
}

/// In-memory registry. Used for offline planning and tests.
///
/// Minted ids are `label-<n>`, numbered from 1 in creation order.
#[derive(Clone, Debug, Default)]
pub struct OfflineRegistry {
    tags: Vec<Tag>,
}

impl OfflineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-existing tags, as if the project already had them.
    pub fn with_tags(tags: Vec<Tag>) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

impl LabelRegistry for OfflineRegistry {
    fn list_tags(&mut self) -> Result<Vec<Tag>, CocoliftError> {
        Ok(self.tags.clone())
    }

    fn create_tag(&mut self, name: &str) -> Result<Tag, CocoliftError> {
        let tag = Tag {
            id: LabelId::new(format!("label-{}", self.tags.len() + 1)),
            name: name.to_string(),
        };
        self.tags.push(tag.clone());
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{AnnotationId, BBoxXYWH, ImageId};
    use crate::sample::SelectedBoundingBox;

    fn selection() -> CategorySelection {
        let mut sel = CategorySelection::default();
        for (id, name) in [(18u64, "dog"), (1, "person"), (3, "car")] {
            sel.order.push(CategoryId(id));
            sel.names.insert(CategoryId(id), name.to_string());
        }
        sel
    }

    fn record(image: u64, cats: &[u64]) -> TrainingImage {
        TrainingImage {
            image_id: ImageId(image),
            url: format!("http://img/{image}.jpg"),
            file_name: format!("{image}.jpg"),
            width: 100.0,
            height: 100.0,
            boxes: cats
                .iter()
                .enumerate()
                .map(|(i, cat)| SelectedBoundingBox {
                    annotation_id: AnnotationId(image * 100 + i as u64),
                    image_id: ImageId(image),
                    category_id: CategoryId(*cat),
                    bbox: BBoxXYWH::new(0.0, 0.0, 1.0, 1.0),
                })
                .collect(),
        }
    }

    #[test]
    fn reuses_existing_tags_case_insensitively() {
        let mut registry = OfflineRegistry::with_tags(vec![Tag {
            id: LabelId::new("guid-dog"),
            name: "Dog".to_string(),
        }]);
        let map = resolve_labels(&mut registry, &selection(), &[record(1, &[18, 1])])
            .expect("resolve");

        assert_eq!(map.get(CategoryId(18)), Some(&LabelId::new("guid-dog")));
        assert_eq!(map.get(CategoryId(1)), Some(&LabelId::new("label-2")));
        assert_eq!(registry.tags().len(), 2);
    }

    #[test]
    fn only_used_categories_are_resolved_in_selection_order() {
        let mut registry = OfflineRegistry::new();
        let map = resolve_labels(&mut registry, &selection(), &[record(1, &[3]), record(2, &[18])])
            .expect("resolve");

        assert_eq!(map.len(), 2);
        assert!(map.get(CategoryId(1)).is_none());
        // dog comes before car in the selection, so it is created first.
        assert_eq!(map.get(CategoryId(18)), Some(&LabelId::new("label-1")));
        assert_eq!(map.get(CategoryId(3)), Some(&LabelId::new("label-2")));
    }

    #[test]
    fn same_name_is_created_once() {
        let mut sel = selection();
        sel.order.push(CategoryId(40));
        sel.names.insert(CategoryId(40), "DOG".to_string());

        let mut registry = OfflineRegistry::new();
        let map = resolve_labels(&mut registry, &sel, &[record(1, &[18, 40])]).expect("resolve");
        assert_eq!(registry.tags().len(), 1);
        assert_eq!(map.get(CategoryId(18)), map.get(CategoryId(40)));
    }

    #[test]
    fn unknown_category_is_an_error() {
        let mut registry = OfflineRegistry::new();
        let err = resolve_labels(&mut registry, &selection(), &[record(1, &[99])])
            .expect_err("unknown category");
        assert!(matches!(err, CocoliftError::LabelRegistry { .. }));
    }
}
