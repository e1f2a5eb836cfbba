//! Compiled schema graph as produced by the schema compiler

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of the schema compiler: object and caveat definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSchema {
    #[serde(default)]
    pub object_definitions: Vec<ObjectDefinition>,

    #[serde(default)]
    pub caveat_definitions: Vec<CaveatDefinition>,
}

impl CompiledSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, definition: ObjectDefinition) -> Self {
        self.object_definitions.push(definition);
        self
    }

    pub fn with_caveat(mut self, caveat: CaveatDefinition) -> Self {
        self.caveat_definitions.push(caveat);
        self
    }

    pub fn definition(&self, name: &str) -> Option<&ObjectDefinition> {
        self.object_definitions.iter().find(|def| def.name == name)
    }
}

/// A `definition` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub name: String,

    /// Relations and permissions in declaration order
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl ObjectDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: RelationDefinition) -> Self {
        self.relations.push(member);
        self
    }

    pub fn member(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|rel| rel.name == name)
    }
}

/// A `relation` or `permission` member of a definition
///
/// Both kinds share one shape; the compiler tells them apart through
/// [`MetadataMessage::RelationMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,

    #[serde(default)]
    pub metadata: Vec<MetadataMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_information: Option<TypeInformation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userset_rewrite: Option<UsersetRewrite>,
}

impl RelationDefinition {
    fn with_kind(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            metadata: vec![MetadataMessage::RelationMetadata { kind }],
            type_information: None,
            userset_rewrite: None,
        }
    }

    /// A `relation` member with no type constraints yet
    pub fn relation(name: impl Into<String>) -> Self {
        Self::with_kind(name, MemberKind::Relation)
    }

    /// A `permission` member computed by `rewrite`
    pub fn permission(name: impl Into<String>, rewrite: UsersetRewrite) -> Self {
        let mut def = Self::with_kind(name, MemberKind::Permission);
        def.userset_rewrite = Some(rewrite);
        def
    }

    /// A member without any kind metadata
    pub fn unclassified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Vec::new(),
            type_information: None,
            userset_rewrite: None,
        }
    }

    /// Adds a direct type constraint (`relation reader: user`)
    pub fn allow(self, namespace: impl Into<String>) -> Self {
        self.allow_relation(AllowedRelation::new(namespace))
    }

    /// Adds a subject-relation constraint (`relation reader: team#member`)
    pub fn allow_via(self, namespace: impl Into<String>, relation: impl Into<String>) -> Self {
        self.allow_relation(AllowedRelation::new(namespace).with_relation(relation))
    }

    pub fn allow_relation(mut self, allowed: AllowedRelation) -> Self {
        self.type_information
            .get_or_insert_with(TypeInformation::default)
            .allowed_direct_relations
            .push(allowed);
        self
    }

    /// Attaches a doc comment, e.g. `//spicegen:rename=readers`
    pub fn with_comment(mut self, content: impl Into<String>) -> Self {
        self.metadata.push(MetadataMessage::DocComment {
            content: content.into(),
        });
        self
    }

    pub fn with_rewrite(mut self, rewrite: UsersetRewrite) -> Self {
        self.userset_rewrite = Some(rewrite);
        self
    }

    /// Doc comment contents attached to this member
    pub fn doc_comments(&self) -> impl Iterator<Item = &str> {
        self.metadata.iter().filter_map(|message| match message {
            MetadataMessage::DocComment { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Namespaces named by the direct type constraints, in declaration order
    pub fn allowed_namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = Vec::new();
        if let Some(info) = &self.type_information {
            for allowed in &info.allowed_direct_relations {
                if !namespaces.contains(&allowed.namespace.as_str()) {
                    namespaces.push(&allowed.namespace);
                }
            }
        }
        namespaces
    }
}

/// Kind signal attached by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberKind {
    Relation,
    Permission,
    #[serde(other)]
    Unspecified,
}

/// Metadata messages attached to a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataMessage {
    RelationMetadata { kind: MemberKind },
    DocComment { content: String },
    #[serde(other)]
    Other,
}

/// Direct type constraints of a relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInformation {
    #[serde(default)]
    pub allowed_direct_relations: Vec<AllowedRelation>,
}

/// One allowed subject type, e.g. `user`, `team#member`, `user:*`,
/// `user with ip_allowed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedRelation {
    pub namespace: String,

    /// Subject relation; `None` or `"..."` for a direct subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    /// `type:*`
    #[serde(default)]
    pub public_wildcard: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_caveat: Option<String>,
}

impl AllowedRelation {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            relation: None,
            public_wildcard: false,
            required_caveat: None,
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    pub fn public_wildcard(mut self) -> Self {
        self.public_wildcard = true;
        self
    }

    pub fn with_caveat(mut self, caveat: impl Into<String>) -> Self {
        self.required_caveat = Some(caveat.into());
        self
    }
}

/// Root of a permission expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersetRewrite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union: Option<SetOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<SetOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersection: Option<SetOperation>,
}

impl UsersetRewrite {
    pub fn union(children: Vec<SetOperationChild>) -> Self {
        Self {
            union: Some(SetOperation { children }),
            ..Self::default()
        }
    }

    pub fn exclusion(children: Vec<SetOperationChild>) -> Self {
        Self {
            exclusion: Some(SetOperation { children }),
            ..Self::default()
        }
    }

    pub fn intersection(children: Vec<SetOperationChild>) -> Self {
        Self {
            intersection: Some(SetOperation { children }),
            ..Self::default()
        }
    }

    /// Operations in walk order: union, exclusion, intersection
    pub fn operations(&self) -> impl Iterator<Item = &SetOperation> {
        [&self.union, &self.exclusion, &self.intersection]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOperation {
    #[serde(default)]
    pub children: Vec<SetOperationChild>,
}

/// Leaf or nested node of a set operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetOperationChild {
    /// The member's own direct assignments (`_this`)
    This,
    /// Another member of the same definition
    ComputedUserset { relation: String },
    /// `tupleset->computed_userset`
    TupleToUserset {
        tupleset: String,
        computed_userset: String,
    },
    /// Parenthesized sub-expression
    UsersetRewrite { rewrite: UsersetRewrite },
}

impl SetOperationChild {
    pub fn computed(relation: impl Into<String>) -> Self {
        SetOperationChild::ComputedUserset {
            relation: relation.into(),
        }
    }

    pub fn arrow(tupleset: impl Into<String>, computed_userset: impl Into<String>) -> Self {
        SetOperationChild::TupleToUserset {
            tupleset: tupleset.into(),
            computed_userset: computed_userset.into(),
        }
    }

    pub fn nested(rewrite: UsersetRewrite) -> Self {
        SetOperationChild::UsersetRewrite { rewrite }
    }
}

/// A `caveat` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaveatDefinition {
    pub name: String,

    /// Parameter name to type, e.g. `ip` -> `ipaddress`
    #[serde(default)]
    pub parameter_types: BTreeMap<String, String>,
}

impl CaveatDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_types: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameter_types.insert(name.into(), type_name.into());
        self
    }
}
