//! Configuration loading and validation

use crate::pipeline::SchemaBuilder;
use crate::resolver::ResolverConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete spicegen configuration
///
/// ```toml
/// [resolver]
/// max_indirection_depth = 2
/// fail_fast = false
///
/// [output]
/// ignore_prefix = "_"
/// pretty = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpicegenConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputSection {
    /// Members starting with this prefix are left out of the output
    #[serde(default)]
    pub ignore_prefix: String,
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            ignore_prefix: String::new(),
            pretty: default_true(),
        }
    }
}

fn default_true() -> bool { true }

impl SpicegenConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let config: SpicegenConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.resolver.max_indirection_depth == Some(0) {
            anyhow::bail!("resolver.max_indirection_depth must be at least 1");
        }

        if self.output.ignore_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("output.ignore_prefix must not contain whitespace");
        }

        Ok(())
    }

    /// Schema builder configured from this file
    pub fn schema_builder(&self) -> SchemaBuilder {
        SchemaBuilder::new(self.resolver.clone()).with_ignore_prefix(self.output.ignore_prefix.clone())
    }
}
