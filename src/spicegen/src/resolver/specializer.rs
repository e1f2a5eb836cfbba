//! Resource specialization
//!
//! A resource whose permissions (or relations) only ever accept one concrete
//! subject type gets accessors typed with that subject instead of the
//! generic `resource` type.

use crate::schema::{Resource, ResourceSubjectType, ResourceTable, WILDCARD_SUBJECT_TYPE};
use std::collections::BTreeSet;

/// Narrows the subject types of every resource in `table`.
pub fn specialize(table: ResourceTable) -> ResourceTable {
    table
        .into_iter()
        .map(|(name, resource)| (name, specialize_resource(resource)))
        .collect()
}

/// Narrows `permission_subject_type` and `relation_subject_type`, computed
/// independently of each other.
pub fn specialize_resource(mut resource: Resource) -> Resource {
    resource.permission_subject_type = narrow(&resource.permission_subject_types());
    resource.relation_subject_type = narrow(&resource.relation_subject_types());
    resource
}

fn narrow(subject_types: &BTreeSet<&str>) -> ResourceSubjectType {
    let mut iter = subject_types.iter();
    match (iter.next(), iter.next()) {
        (Some(&only), None) if only != WILDCARD_SUBJECT_TYPE => ResourceSubjectType::Concrete(only.to_string()),
        _ => ResourceSubjectType::Generic,
    }
}
