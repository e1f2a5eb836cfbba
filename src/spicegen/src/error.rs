//! Error types for schema resolution

use crate::resolver::ResolutionErrors;
use thiserror::Error;

/// Errors raised while turning a compiled schema into a resolved [`Schema`]
///
/// [`Schema`]: crate::schema::Schema
#[derive(Debug, Error)]
pub enum SpicegenError {
    /// Member metadata carries neither a relation nor a permission kind
    #[error("cannot classify member '{resource}#{member}' as relation or permission")]
    UnclassifiedMember { resource: String, member: String },

    /// Two object definitions share a name
    #[error("duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// Two members of one definition share a name
    #[error("duplicate member '{member}' on definition '{resource}'")]
    DuplicateMember { resource: String, member: String },

    /// Subject types could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionErrors),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compiled schema or output (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for schema resolution
pub type Result<T> = std::result::Result<T, SpicegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpicegenError::UnclassifiedMember {
            resource: "document".to_string(),
            member: "reader".to_string(),
        };
        assert!(err.to_string().contains("document#reader"));

        let err = SpicegenError::DuplicateMember {
            resource: "document".to_string(),
            member: "reader".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate member 'reader' on definition 'document'"
        );
    }
}
