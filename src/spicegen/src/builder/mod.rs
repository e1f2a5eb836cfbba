//! Unresolved resource table construction
//!
//! This module turns the compiled schema graph into the resource table the
//! resolver consumes:
//!
//! - **kind**: relation / permission classification from compiler metadata
//! - **metatag**: `//spicegen:` directives in doc comments
//! - **rewrite**: flattening of permission rewrite trees into edges
//! - **relation**: per-member and per-schema assembly
//!
//! Nothing here resolves subject types; every `allowed_subject_types` is left
//! empty for [`crate::resolver`] to fill in.

pub mod kind;
pub mod metatag;
pub mod relation;
pub mod rewrite;

pub use kind::classify_kind;
pub use metatag::{extract_metatags, parse_metatag, Metatag, MetatagError, Metatags};
pub use relation::{build_relation, build_resource, build_table};
pub use rewrite::walk_rewrite;
