//! Subject-type resolution and resource specialization
//!
//! This module takes the unresolved table produced by [`crate::builder`] and
//! computes, for every relation and permission, the subject types allowed to
//! hold it. Each stage returns a new table; the input is never mutated.
//!
//! # Examples
//!
//! ```
//! use spicegen::compiled::{CompiledSchema, ObjectDefinition, RelationDefinition, SetOperationChild, UsersetRewrite};
//! use spicegen::resolver::{resolve, specialize, ResolverConfig};
//!
//! let compiled = CompiledSchema::new()
//!     .with_definition(ObjectDefinition::new("user"))
//!     .with_definition(
//!         ObjectDefinition::new("document")
//!             .with_member(RelationDefinition::relation("reader").allow("user"))
//!             .with_member(RelationDefinition::permission(
//!                 "view",
//!                 UsersetRewrite::union(vec![SetOperationChild::computed("reader")]),
//!             )),
//!     );
//!
//! let table = spicegen::builder::build_table(&compiled).unwrap();
//! let resolved = specialize(resolve(&table, &ResolverConfig::default()).unwrap());
//!
//! let document = &resolved["document"];
//! assert!(document.permissions["view"].allowed_subject_types.contains("user"));
//! assert_eq!(document.permission_subject_type.type_name(), "user_resource");
//! ```

mod error;
mod specializer;
mod subject_types;


pub use error::{RefChain, ResolutionError, ResolutionErrors};
pub use specializer::{specialize, specialize_resource};
pub use subject_types::{resolve, ResolverConfig};
