//! Compiled schema graph (input side)
//!
//! These types mirror what the SpiceDB schema compiler emits for a schema:
//! object definitions whose members carry kind metadata, doc comments,
//! direct type constraints and boolean rewrite trees. Parsing the schema
//! language itself is the compiler's job; this crate only consumes the
//! compiled graph, either built in memory or deserialized from JSON.

mod types;

pub use types::{
    AllowedRelation, CaveatDefinition, CompiledSchema, MemberKind, MetadataMessage,
    ObjectDefinition, RelationDefinition, SetOperation, SetOperationChild, TypeInformation,
    UsersetRewrite,
};
