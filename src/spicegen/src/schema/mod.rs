//! Resolved schema model
//!
//! The types in this module are the output contract of the crate: the code
//! emitter consumes a [`Schema`] and renders it into source files. All maps
//! are ordered so that iteration (and therefore generated output) is stable
//! across runs.

mod types;

pub use types::{
    AllowedSubjectTypes, Caveat, Relation, RelationKind, RelationRef, Resource,
    ResourceSubjectType, ResourceTable, Schema, SubjectRef, DIRECT_SUBJECT_MARKER,
    WILDCARD_SUBJECT_TYPE,
};
