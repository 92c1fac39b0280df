//! Static classification of catalog type names into display groups.
//!
//! Matching is done on the canonical display name (first letter upper-cased,
//! rest lower-cased), so `ConfigMaps`, `configmaps` and `CONFIGMAPS` all land
//! in the same place.

use super::data::{ResourceTypeName, canonical_display_name};
use itertools::Itertools;
use serde::Serialize;

pub const CORE_GROUP: &str = "Core (v1)";
pub const APPS_GROUP: &str = "Apps";
pub const OTHER_GROUP: &str = "Other";

/// Types offered in the quick access panel
pub const QUICK_ACCESS: [&str; 10] = [
    "Pods",
    "Deployments",
    "Services",
    "Configmaps",
    "Secrets",
    "Ingresses",
    "Namespaces",
    "Persistentvolumeclaims",
    "Horizontalpodautoscalers",
    "Cronjobs",
];

const CORE_TYPES: [&str; 5] = ["Pods", "Services", "Namespaces", "Configmaps", "Secrets"];
const APPS_TYPES: [&str; 3] = ["Deployments", "Statefulsets", "Daemonsets"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeGroup {
    pub name: &'static str,
    pub members: Vec<ResourceTypeName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    pub quick_access: Vec<ResourceTypeName>,
    pub groups: Vec<TypeGroup>,
    #[serde(skip)]
    catalog: Vec<ResourceTypeName>,
}

impl Taxonomy {
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[ResourceTypeName]> {
        self.groups
            .iter()
            .find(|group| group.name == name)
            .map(|group| group.members.as_slice())
    }

    #[must_use]
    pub fn group_of(&self, resource_type: &ResourceTypeName) -> Option<&'static str> {
        self.groups
            .iter()
            .find(|group| group.members.contains(resource_type))
            .map(|group| group.name)
    }

    /// Every classified type in catalog order
    #[must_use]
    pub fn all(&self) -> &[ResourceTypeName] {
        &self.catalog
    }
}

fn group_for(display_name: &str) -> &'static str {
    if CORE_TYPES.contains(&display_name) {
        CORE_GROUP
    } else if APPS_TYPES.contains(&display_name) {
        APPS_GROUP
    } else {
        OTHER_GROUP
    }
}

/// Classifies a catalog. Pure: same input, same output, catalog order kept.
#[must_use]
pub fn classify<S: AsRef<str>>(catalog: &[S]) -> Taxonomy {
    let catalog: Vec<ResourceTypeName> = catalog
        .iter()
        .map(|raw| ResourceTypeName::new(raw.as_ref()))
        .unique()
        .collect();

    let quick_access = catalog
        .iter()
        .filter(|name| QUICK_ACCESS.contains(&canonical_display_name(name.as_str()).as_str()))
        .cloned()
        .collect();

    let groups = [CORE_GROUP, APPS_GROUP, OTHER_GROUP]
        .into_iter()
        .map(|group| TypeGroup {
            name: group,
            members: catalog
                .iter()
                .filter(|name| group_for(&name.display_name()) == group)
                .cloned()
                .collect(),
        })
        .collect();

    Taxonomy {
        quick_access,
        groups,
        catalog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(taxonomy_slice: &[ResourceTypeName]) -> Vec<&str> {
        taxonomy_slice.iter().map(ResourceTypeName::as_str).collect()
    }

    #[test]
    fn test_every_type_in_exactly_one_group() {
        let catalog = [
            "pods", "services", "deployments", "statefulsets", "daemonsets", "ingresses",
            "nodes", "configmaps", "cronjobs",
        ];
        let taxonomy = classify(&catalog);

        for raw in catalog {
            let name = ResourceTypeName::new(raw);
            let hits = taxonomy
                .groups
                .iter()
                .filter(|g| g.members.contains(&name))
                .count();
            assert_eq!(hits, 1, "{raw} should be in exactly one group");
        }
        assert_eq!(names(taxonomy.group(CORE_GROUP).unwrap()), vec!["pods", "services", "configmaps"]);
        assert_eq!(
            names(taxonomy.group(APPS_GROUP).unwrap()),
            vec!["deployments", "statefulsets", "daemonsets"]
        );
        assert_eq!(
            names(taxonomy.group(OTHER_GROUP).unwrap()),
            vec!["ingresses", "nodes", "cronjobs"]
        );
    }

    #[test]
    fn test_quick_access_is_a_view() {
        let taxonomy = classify(&["Nodes", "CronJobs", "pods", "Statefulsets"]);
        assert_eq!(names(&taxonomy.quick_access), vec!["cronjobs", "pods"]);
        assert_eq!(taxonomy.group_of(&"cronjobs".into()), Some(OTHER_GROUP));
        assert_eq!(taxonomy.group_of(&"pods".into()), Some(CORE_GROUP));
    }

    #[test]
    fn test_idempotent_and_order_preserving() {
        let catalog = vec!["secrets".to_string(), "Pods".to_string(), "jobs".to_string()];
        let first = classify(&catalog);
        let second = classify(&catalog);
        assert_eq!(first, second);
        assert_eq!(names(first.group(CORE_GROUP).unwrap()), vec!["secrets", "pods"]);
        assert_eq!(names(first.all()), vec!["secrets", "pods", "jobs"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let taxonomy = classify(&["pods", "PODS", " pods "]);
        assert_eq!(names(taxonomy.group(CORE_GROUP).unwrap()), vec!["pods"]);
        assert_eq!(taxonomy.quick_access.len(), 1);
    }

    #[test]
    fn test_blank_name_lands_in_other() {
        let taxonomy = classify(&["pods", ""]);
        assert_eq!(taxonomy.all().len(), 2);
        assert_eq!(names(taxonomy.group(OTHER_GROUP).unwrap()), vec![""]);
        assert_eq!(taxonomy.group_of(&"".into()), Some(OTHER_GROUP));
    }

    #[test]
    fn test_empty_catalog() {
        let taxonomy = classify::<&str>(&[]);
        assert!(taxonomy.quick_access.is_empty());
        assert_eq!(taxonomy.groups.len(), 3);
        assert!(taxonomy.groups.iter().all(|g| g.members.is_empty()));
    }
}
