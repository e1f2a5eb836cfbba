//! End-to-end schema resolution
//!
//! Runs the stages in fixed order: build the unresolved table, resolve
//! subject types, specialize resources, carry caveats, then drop members
//! hidden by the ignore prefix.

use crate::builder::build_table;
use crate::compiled::CompiledSchema;
use crate::error::Result;
use crate::resolver::{resolve, specialize, ResolverConfig};
use crate::schema::{Caveat, Schema};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// Builds a resolved [`Schema`] from a compiled schema graph
///
/// # Examples
///
/// ```
/// use spicegen::compiled::{CompiledSchema, ObjectDefinition, RelationDefinition};
/// use spicegen::pipeline::SchemaBuilder;
/// use spicegen::resolver::ResolverConfig;
///
/// let compiled = CompiledSchema::new()
///     .with_definition(ObjectDefinition::new("user"))
///     .with_definition(
///         ObjectDefinition::new("document")
///             .with_member(RelationDefinition::relation("owner").allow("user"))
///             .with_member(RelationDefinition::relation("_legacy_owner").allow("user")),
///     );
///
/// let schema = SchemaBuilder::new(ResolverConfig::default())
///     .with_ignore_prefix("_")
///     .build(&compiled)
///     .unwrap();
///
/// let document = schema.resource("document").unwrap();
/// assert_eq!(document.relations.len(), 1);
/// assert_eq!(document.relation_subject_type.type_name(), "user_resource");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    config: ResolverConfig,
    ignore_prefix: Option<String>,
}

impl SchemaBuilder {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            ignore_prefix: None,
        }
    }

    /// Hides members whose name starts with `prefix` from the output.
    ///
    /// Resolution still sees every member.
    pub fn with_ignore_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.ignore_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Runs every stage over `compiled`.
    ///
    /// # Errors
    ///
    /// Returns the first builder error, or every resolution error found.
    pub fn build(&self, compiled: &CompiledSchema) -> Result<Schema> {
        let table = build_table(compiled)?;
        let resolved = resolve(&table, &self.config)?;
        let resources = specialize(resolved);

        let caveats: BTreeMap<String, Caveat> = compiled
            .caveat_definitions
            .iter()
            .map(|caveat| {
                (
                    caveat.name.clone(),
                    Caveat {
                        name: caveat.name.clone(),
                        args: caveat.parameter_types.clone(),
                    },
                )
            })
            .collect();

        let mut schema = Schema { resources, caveats };
        if let Some(prefix) = &self.ignore_prefix {
            schema = schema.without_prefix(prefix);
        }

        info!(
            resources = schema.resources.len(),
            permissions = schema.resources.values().map(|r| r.permissions.len()).sum::<usize>(),
            relations = schema.resources.values().map(|r| r.relations.len()).sum::<usize>(),
            caveats = schema.caveats.len(),
            "resolved schema"
        );

        Ok(schema)
    }

    /// Parses a compiled schema from JSON and builds it.
    pub fn build_json(&self, json: &str) -> Result<Schema> {
        let compiled: CompiledSchema = serde_json::from_str(json)?;
        self.build(&compiled)
    }
}

/// Builds a schema with the default resolver settings.
pub fn build_schema(compiled: &CompiledSchema) -> Result<Schema> {
    SchemaBuilder::default().build(compiled)
}

/// Reads a compiled schema from a JSON reader.
pub fn read_compiled<R: Read>(reader: R) -> Result<CompiledSchema> {
    Ok(serde_json::from_reader(reader)?)
}

/// Reads a compiled schema from a JSON file.
pub fn load_compiled(path: impl AsRef<Path>) -> Result<CompiledSchema> {
    let file = File::open(path)?;
    read_compiled(BufReader::new(file))
}
