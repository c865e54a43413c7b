use std::collections::BTreeMap;

use crate::models::{EntityType, SearchResult};

/// Group a ranked list by entity type for presentation. Each group keeps the
/// relative order of `results`; types without hits are omitted.
pub fn group_by_type(results: &[SearchResult]) -> BTreeMap<EntityType, Vec<SearchResult>> {
    let mut grouped: BTreeMap<EntityType, Vec<SearchResult>> = BTreeMap::new();
    for result in results {
        grouped
            .entry(result.entity_type)
            .or_default()
            .push(result.clone());
    }
    grouped
}
