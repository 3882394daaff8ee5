//! Category selection.
//!
//! Resolves the user's category list against the corpus category table. A
//! requested name matches a category if it equals either the category name or
//! its supercategory (case-sensitive). An empty request selects everything.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};

use crate::corpus::{Category, CategoryId};
use crate::error::CocoliftError;

/// The upload service refuses to train a label with fewer examples than this.
pub const MIN_IMAGES_PER_LABEL: usize = 15;

/// The working category set for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorySelection {
    /// Selected ids in corpus table order. This order drives the sampler's
    /// round-robin, so it must stay stable.
    pub order: Vec<CategoryId>,

    /// Id to category name for every selected category.
    pub names: BTreeMap<CategoryId, String>,
}

impl CategorySelection {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

/// Resolve requested category or supercategory names.
///
/// Requested names are trimmed and blanks are ignored; if nothing remains,
/// every category is selected.
///
/// # Errors
/// [`CocoliftError::NoMatchingCategories`] if names were requested but none of
/// them matched.
pub fn select_categories(
    categories: &[Category],
    requested: &[String],
) -> Result<CategorySelection, CocoliftError> {
    let requested: HashSet<&str> = requested
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    let mut selection = CategorySelection::default();
    for category in categories {
        let matches = requested.is_empty()
            || requested.contains(category.name.as_str())
            || requested.contains(category.supercategory.as_str());
        // A corpus that repeats a category id keeps the first definition.
        if matches && !selection.contains(category.id) {
            selection.order.push(category.id);
            selection.names.insert(category.id, category.name.clone());
        }
    }

    if !requested.is_empty() && selection.is_empty() {
        let mut requested: Vec<String> = requested.into_iter().map(str::to_string).collect();
        requested.sort();
        return Err(CocoliftError::NoMatchingCategories { requested });
    }

    info!("Selected {} categories", selection.len());
    debug!(
        "selected categories: {}",
        selection
            .order
            .iter()
            .filter_map(|id| selection.name(*id))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(selection)
}

/// Check the image budget against the per-label minimum.
///
/// The floor applies to the budget that can actually be met: the requested
/// budget capped at the number of images in the corpus. A requested budget of
/// zero means "no cap" and always passes.
///
/// # Errors
/// [`CocoliftError::InsufficientBudget`] if
/// `min(requested, available) < 15 × |selection|`.
pub fn check_budget(
    requested: usize,
    available: usize,
    selection: &CategorySelection,
) -> Result<(), CocoliftError> {
    if requested == 0 {
        return Ok(());
    }
    let budget = requested.min(available);
    if budget < requested {
        debug!("image budget {requested} capped at corpus size {available}");
    }

    let required = MIN_IMAGES_PER_LABEL * selection.len();
    if budget < required {
        return Err(CocoliftError::InsufficientBudget {
            budget,
            categories: selection.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Category> {
        vec![
            Category::new(1u64, "person", "person"),
            Category::new(2u64, "bicycle", "vehicle"),
            Category::new(3u64, "car", "vehicle"),
            Category::new(18u64, "dog", "animal"),
            Category::new(17u64, "cat", "animal"),
        ]
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_request_selects_all_in_table_order() {
        let sel = select_categories(&table(), &[]).expect("select");
        assert_eq!(
            sel.order,
            vec![
                CategoryId(1),
                CategoryId(2),
                CategoryId(3),
                CategoryId(18),
                CategoryId(17)
            ]
        );
        assert_eq!(sel.name(CategoryId(18)), Some("dog"));
    }

    #[test]
    fn blank_names_count_as_empty_request() {
        let sel = select_categories(&table(), &names(&["", "  "])).expect("select");
        assert_eq!(sel.len(), 5);
    }

    #[test]
    fn supercategory_matches_all_members() {
        let sel = select_categories(&table(), &names(&["vehicle", "dog"])).expect("select");
        assert_eq!(sel.order, vec![CategoryId(2), CategoryId(3), CategoryId(18)]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let err = select_categories(&table(), &names(&["Dog"])).expect_err("no match");
        match err {
            CocoliftError::NoMatchingCategories { requested } => {
                assert_eq!(requested, vec!["Dog".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn budget_floor_is_fifteen_per_category() {
        let sel = select_categories(&table(), &names(&["animal"])).expect("select");
        assert!(check_budget(30, 1000, &sel).is_ok());
        assert!(check_budget(0, 1000, &sel).is_ok());

        let err = check_budget(29, 1000, &sel).expect_err("too small");
        match err {
            CocoliftError::InsufficientBudget {
                budget,
                categories,
                required,
            } => {
                assert_eq!((budget, categories, required), (29, 2, 30));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn budget_floor_uses_corpus_size_when_smaller() {
        let sel = select_categories(&table(), &names(&["animal"])).expect("select");
        // 100 requested, but only 20 images exist.
        let err = check_budget(100, 20, &sel).expect_err("corpus too small");
        assert!(matches!(
            err,
            CocoliftError::InsufficientBudget {
                budget: 20,
                categories: 2,
                required: 30
            }
        ));
        assert!(check_budget(100, 30, &sel).is_ok());
        // No cap means no floor, whatever the corpus size.
        assert!(check_budget(0, 5, &sel).is_ok());
    }
}
