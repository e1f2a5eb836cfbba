//! Resolved schema model handed to the code emitter

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::fmt;

/// Subject type key meaning "any subject type, checked at call time"
pub const WILDCARD_SUBJECT_TYPE: &str = "*";

/// Serialized form of [`SubjectRef::Direct`]
pub const DIRECT_SUBJECT_MARKER: &str = "...";

/// Resource table keyed by resource name
pub type ResourceTable = BTreeMap<String, Resource>;

/// How a subject of a given type satisfies a relation
///
/// `Direct` means the subject object itself is the subject. `Via` means the
/// subject must be an object of the type *acting through* the named relation
/// on itself (e.g. `team#member`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectRef {
    Direct,
    Via(String),
}

impl SubjectRef {
    /// Builds a ref from an optional sub-relation name.
    ///
    /// `None`, the empty string and `"..."` all mean `Direct`.
    pub fn from_relation(relation: Option<&str>) -> Self {
        match relation {
            None | Some("") | Some(DIRECT_SUBJECT_MARKER) => SubjectRef::Direct,
            Some(rel) => SubjectRef::Via(rel.to_string()),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, SubjectRef::Direct)
    }

    /// Returns the sub-relation name for `Via` refs
    pub fn relation(&self) -> Option<&str> {
        match self {
            SubjectRef::Direct => None,
            SubjectRef::Via(rel) => Some(rel),
        }
    }
}

impl From<String> for SubjectRef {
    fn from(value: String) -> Self {
        SubjectRef::from_relation(Some(&value))
    }
}

impl From<SubjectRef> for String {
    fn from(value: SubjectRef) -> Self {
        match value {
            SubjectRef::Direct => DIRECT_SUBJECT_MARKER.to_string(),
            SubjectRef::Via(rel) => rel,
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRef::Direct => write!(f, "{}", DIRECT_SUBJECT_MARKER),
            SubjectRef::Via(rel) => write!(f, "{}", rel),
        }
    }
}

/// Subject types allowed on a relation or permission
///
/// Keys are subject type names (or [`WILDCARD_SUBJECT_TYPE`]). Entries are
/// kept sorted so every consumer sees the same order.
///
/// When the same subject type is inserted twice the merge is
/// order-independent: `Direct` beats `Via`, and between two `Via` values the
/// lexicographically smaller relation is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedSubjectTypes(BTreeMap<String, SubjectRef>);

impl AllowedSubjectTypes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The `{"*": "..."}` fallback
    pub fn wildcard() -> Self {
        let mut types = Self::new();
        types.insert(WILDCARD_SUBJECT_TYPE, SubjectRef::Direct);
        types
    }

    /// Inserts an entry, returning `true` if the mapping changed
    pub fn insert(&mut self, subject_type: impl Into<String>, subject_ref: SubjectRef) -> bool {
        match self.0.entry(subject_type.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(subject_ref);
                true
            }
            btree_map::Entry::Occupied(mut slot) => {
                let replace = match (slot.get(), &subject_ref) {
                    (SubjectRef::Direct, _) => false,
                    (SubjectRef::Via(_), SubjectRef::Direct) => true,
                    (SubjectRef::Via(current), SubjectRef::Via(candidate)) => candidate < current,
                };
                if replace {
                    slot.insert(subject_ref);
                }
                replace
            }
        }
    }

    /// Merges every entry of `other`, returning `true` if anything changed
    pub fn extend(&mut self, other: &AllowedSubjectTypes) -> bool {
        let mut changed = false;
        for (subject_type, subject_ref) in other.iter() {
            changed |= self.insert(subject_type.clone(), subject_ref.clone());
        }
        changed
    }

    pub fn get(&self, subject_type: &str) -> Option<&SubjectRef> {
        self.0.get(subject_type)
    }

    pub fn contains(&self, subject_type: &str) -> bool {
        self.0.contains_key(subject_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this is exactly the wildcard fallback
    pub fn is_wildcard(&self) -> bool {
        self.0.len() == 1 && self.contains(WILDCARD_SUBJECT_TYPE)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SubjectRef> {
        self.0.iter()
    }

    pub fn subject_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, SubjectRef)> for AllowedSubjectTypes {
    fn from_iter<I: IntoIterator<Item = (K, SubjectRef)>>(iter: I) -> Self {
        let mut types = Self::new();
        for (subject_type, subject_ref) in iter {
            types.insert(subject_type, subject_ref);
        }
        types
    }
}

impl<'a> IntoIterator for &'a AllowedSubjectTypes {
    type Item = (&'a String, &'a SubjectRef);
    type IntoIter = btree_map::Iter<'a, String, SubjectRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Member kind as classified from compiler metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Relation,
    Permission,
    Unknown,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Relation => write!(f, "relation"),
            RelationKind::Permission => write!(f, "permission"),
            RelationKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// One edge of the rewrite graph (e.g. `team#member` -> `team` / `member`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRef {
    pub resource_type: String,
    pub relation: SubjectRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveat: Option<String>,
}

impl RelationRef {
    pub fn direct(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            relation: SubjectRef::Direct,
            caveat: None,
        }
    }

    pub fn via(resource_type: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            relation: SubjectRef::Via(relation.into()),
            caveat: None,
        }
    }

    pub fn with_caveat(mut self, caveat: impl Into<String>) -> Self {
        self.caveat = Some(caveat.into());
        self
    }
}

impl fmt::Display for RelationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource_type, self.relation)?;
        if let Some(caveat) = &self.caveat {
            write!(f, " with {}", caveat)?;
        }
        Ok(())
    }
}

/// A relation or permission member of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Schema identifier
    pub name: String,

    /// Public-facing name (differs from `name` only with a `rename` metatag)
    pub output_name: String,

    pub kind: RelationKind,

    /// Resolved subject types; empty until the resolver runs
    pub allowed_subject_types: AllowedSubjectTypes,

    /// Subject types declared through `subject_type` metatags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_allowed_subject_types: Option<AllowedSubjectTypes>,

    /// Raw edges produced by the member's rewrite and type constraints
    pub relation_refs: Vec<RelationRef>,
}

impl Relation {
    pub fn new(name: impl Into<String>, kind: RelationKind) -> Self {
        let name = name.into();
        Self {
            output_name: name.clone(),
            name,
            kind,
            allowed_subject_types: AllowedSubjectTypes::new(),
            override_allowed_subject_types: None,
            relation_refs: Vec::new(),
        }
    }

    /// Returns the override mapping if it is present and non-empty
    pub fn active_override(&self) -> Option<&AllowedSubjectTypes> {
        self.override_allowed_subject_types
            .as_ref()
            .filter(|types| !types.is_empty())
    }
}

/// Subject type a resource's generated accessors are typed with
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSubjectType {
    /// Abstract resource type; accepts any subject
    #[default]
    Generic,
    /// Exactly one concrete subject type is ever used
    Concrete(String),
}

impl ResourceSubjectType {
    /// Generated type name: `resource` or `<type>_resource`
    pub fn type_name(&self) -> String {
        match self {
            ResourceSubjectType::Generic => "resource".to_string(),
            ResourceSubjectType::Concrete(subject_type) => format!("{}_resource", subject_type),
        }
    }

    pub fn concrete(&self) -> Option<&str> {
        match self {
            ResourceSubjectType::Generic => None,
            ResourceSubjectType::Concrete(subject_type) => Some(subject_type),
        }
    }
}

impl fmt::Display for ResourceSubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// One object definition of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub permissions: BTreeMap<String, Relation>,
    pub relations: BTreeMap<String, Relation>,
    pub permission_subject_type: ResourceSubjectType,
    pub relation_subject_type: ResourceSubjectType,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeMap::new(),
            relations: BTreeMap::new(),
            permission_subject_type: ResourceSubjectType::Generic,
            relation_subject_type: ResourceSubjectType::Generic,
        }
    }

    /// Looks up a member by name, relations first
    pub fn member(&self, name: &str) -> Option<&Relation> {
        self.relations
            .get(name)
            .or_else(|| self.permissions.get(name))
    }

    pub fn sorted_permissions(&self) -> impl Iterator<Item = &Relation> {
        self.permissions.values()
    }

    pub fn sorted_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Union of subject type keys across all permissions
    pub fn permission_subject_types(&self) -> BTreeSet<&str> {
        self.permissions
            .values()
            .flat_map(|perm| perm.allowed_subject_types.subject_types())
            .collect()
    }

    /// Union of subject type keys across all relations
    pub fn relation_subject_types(&self) -> BTreeSet<&str> {
        self.relations
            .values()
            .flat_map(|rel| rel.allowed_subject_types.subject_types())
            .collect()
    }
}

/// Caveat definition carried through for the emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveat {
    pub name: String,
    /// Argument name to argument type
    pub args: BTreeMap<String, String>,
}

/// Fully resolved schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub resources: ResourceTable,
    pub caveats: BTreeMap<String, Caveat>,
}

impl Schema {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn sorted_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Drops every permission and relation whose name starts with `prefix`.
    ///
    /// Used to hide implicit members (e.g. `_internal_view`) from generated
    /// code. An empty prefix leaves the schema untouched. Subject typing is
    /// not recomputed.
    pub fn without_prefix(mut self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }
        for resource in self.resources.values_mut() {
            resource.permissions.retain(|name, _| !name.starts_with(prefix));
            resource.relations.retain(|name, _| !name.starts_with(prefix));
        }
        self
    }
}
