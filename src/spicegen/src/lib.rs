//! # Subject-type resolution for compiled SpiceDB schemas (spicegen)
//!
//! Computes, for every relation and permission of a compiled schema, the
//! subject types allowed to hold it, so a code emitter can generate strongly
//! typed accessors:
//! - Direct and subject-relation (`team#member`) type constraints
//! - Arrows (`parent->view`) through other resources
//! - Permissions over permissions, solved as a fixed point
//! - `//spicegen:` metatag overrides and renames
//! - Per-resource narrowing to a single concrete subject type
//!
//! ## Example
//!
//! ```rust
//! use spicegen::compiled::{CompiledSchema, ObjectDefinition, RelationDefinition};
//! use spicegen::{build_schema, SubjectRef};
//!
//! # fn example() -> spicegen::Result<()> {
//! let compiled = CompiledSchema::new()
//!     .with_definition(ObjectDefinition::new("user"))
//!     .with_definition(
//!         ObjectDefinition::new("team")
//!             .with_member(RelationDefinition::relation("member").allow("user")),
//!     )
//!     .with_definition(
//!         ObjectDefinition::new("document")
//!             .with_member(RelationDefinition::relation("reader").allow_via("team", "member")),
//!     );
//!
//! let schema = build_schema(&compiled)?;
//! let reader = &schema.resource("document").unwrap().relations["reader"];
//! assert_eq!(
//!     reader.allowed_subject_types.get("team"),
//!     Some(&SubjectRef::Via("member".to_string()))
//! );
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod builder;
pub mod compiled;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod schema;

pub use config::SpicegenConfig;
pub use error::{Result, SpicegenError};
pub use pipeline::{build_schema, SchemaBuilder};
pub use resolver::{ResolutionError, ResolutionErrors, ResolverConfig};
pub use schema::{
    AllowedSubjectTypes, Relation, RelationKind, RelationRef, Resource, ResourceSubjectType, Schema, SubjectRef,
};
