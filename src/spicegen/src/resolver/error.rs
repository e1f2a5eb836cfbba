//! Resolution diagnostics

use std::fmt;
use thiserror::Error;

/// Members traversed before a failure, outermost first
///
/// Displayed as `document#view -> document#parent -> folder#view`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefChain(Vec<String>);

impl RefChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource_type: &str, member: &str) {
        self.0.push(format!("{}#{}", resource_type, member));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Copy of this chain extended by one more hop
    pub fn with(&self, resource_type: &str, member: &str) -> Self {
        let mut chain = self.clone();
        chain.push(resource_type, member);
        chain
    }

    pub fn hops(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RefChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

/// A single member that could not be resolved
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("{resource}#{member}: unknown resource type '{resource_type}' (via {chain})")]
    UnknownResourceType {
        resource: String,
        member: String,
        resource_type: String,
        chain: RefChain,
    },

    #[error("{resource}#{member}: '{target_type}' has no relation or permission '{target_member}' (via {chain})")]
    UnknownMember {
        resource: String,
        member: String,
        target_type: String,
        target_member: String,
        chain: RefChain,
    },

    #[error("{resource}#{member}: no concrete subject types reachable (via {chain})")]
    NoConcreteSubjectTypes {
        resource: String,
        member: String,
        chain: RefChain,
    },

    #[error("{resource}#{member}: indirection deeper than {max_depth} hops (via {chain})")]
    IndirectionDepthExceeded {
        resource: String,
        member: String,
        max_depth: usize,
        chain: RefChain,
    },
}

impl ResolutionError {
    /// `(resource, member)` the error was raised for
    pub fn member(&self) -> (&str, &str) {
        match self {
            ResolutionError::UnknownResourceType {
                resource, member, ..
            }
            | ResolutionError::UnknownMember {
                resource, member, ..
            }
            | ResolutionError::NoConcreteSubjectTypes {
                resource, member, ..
            }
            | ResolutionError::IndirectionDepthExceeded {
                resource, member, ..
            } => (resource, member),
        }
    }

    pub fn chain(&self) -> &RefChain {
        match self {
            ResolutionError::UnknownResourceType { chain, .. }
            | ResolutionError::UnknownMember { chain, .. }
            | ResolutionError::NoConcreteSubjectTypes { chain, .. }
            | ResolutionError::IndirectionDepthExceeded { chain, .. } => chain,
        }
    }
}

/// Every resolution failure of one run, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionErrors(Vec<ResolutionError>);

impl ResolutionErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ResolutionError) {
        self.0.push(error);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolutionError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ResolutionError> {
        self.0
    }
}

impl fmt::Display for ResolutionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to resolve subject types ({} errors)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionErrors {}

impl From<ResolutionError> for ResolutionErrors {
    fn from(error: ResolutionError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a ResolutionErrors {
    type Item = &'a ResolutionError;
    type IntoIter = std::slice::Iter<'a, ResolutionError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
