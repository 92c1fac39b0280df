use super::data::ResourceSummary;

/// Case-insensitive substring match of `query` against each summary's name.
///
/// An empty query returns the input unchanged.
#[must_use]
pub fn filter(aggregate: &[ResourceSummary], query: &str) -> Vec<ResourceSummary> {
    if query.is_empty() {
        return aggregate.to_vec();
    }
    let needle = query.to_lowercase();
    aggregate
        .iter()
        .filter(|summary| summary.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
