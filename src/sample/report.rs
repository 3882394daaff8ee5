//! Sampling report: budget accounting and per-category coverage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::SampledImage;
use crate::corpus::CategoryId;
use crate::select::CategorySelection;

/// Summary of one sampling run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SampleReport {
    /// Budget given by the caller (0 = no cap).
    pub requested_budget: usize,
    /// Budget actually applied after capping at the corpus size.
    pub effective_budget: usize,
    /// Images picked by the round-robin.
    pub selected: usize,
    /// Images kept after box filtering.
    pub kept: usize,
    /// Picked images dropped because no selected-category box survived.
    pub dropped_empty: usize,
    /// Coverage per selected category, in rotation order.
    pub categories: Vec<CategoryCount>,
}

/// How many kept images, and how many boxes, a category ended up with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub id: CategoryId,
    pub name: String,
    pub images: usize,
    pub boxes: usize,
}

impl SampleReport {
    pub(super) fn build(
        selection: &CategorySelection,
        images: &[SampledImage],
        requested_budget: usize,
        effective_budget: usize,
        selected: usize,
        dropped_empty: usize,
    ) -> Self {
        let mut per_category: BTreeMap<CategoryId, (usize, usize)> = BTreeMap::new();
        for image in images {
            let mut seen = Vec::new();
            for bbox in &image.boxes {
                let entry = per_category.entry(bbox.category_id).or_default();
                entry.1 += 1;
                if !seen.contains(&bbox.category_id) {
                    seen.push(bbox.category_id);
                    entry.0 += 1;
                }
            }
        }

        let categories = selection
            .order
            .iter()
            .map(|id| {
                let (images, boxes) = per_category.get(id).copied().unwrap_or_default();
                CategoryCount {
                    id: *id,
                    name: selection.name(*id).unwrap_or_default().to_string(),
                    images,
                    boxes,
                }
            })
            .collect();

        Self {
            requested_budget,
            effective_budget,
            selected,
            kept: images.len(),
            dropped_empty,
            categories,
        }
    }

    /// Categories that ended up with no images at all.
    pub fn empty_categories(&self) -> impl Iterator<Item = &CategoryCount> {
        self.categories.iter().filter(|c| c.images == 0)
    }
}

impl fmt::Display for SampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requested = if self.requested_budget == 0 {
            "no cap".to_string()
        } else {
            self.requested_budget.to_string()
        };
        writeln!(
            f,
            "Sample: {} images kept ({} selected, budget {}, requested {})",
            self.kept, self.selected, self.effective_budget, requested
        )?;
        if self.dropped_empty > 0 {
            writeln!(
                f,
                "  dropped {} image(s) with no boxes in the selected categories",
                self.dropped_empty
            )?;
        }

        writeln!(f, "Categories ({}):", self.categories.len())?;
        for cat in &self.categories {
            writeln!(
                f,
                "  {:>4}  {:<24} {:>6} images {:>7} boxes",
                cat.id.as_u64(),
                cat.name,
                cat.images,
                cat.boxes
            )?;
        }
        Ok(())
    }
}
