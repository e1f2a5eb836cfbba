//! Relation builder
//!
//! Turns each compiled member into an unresolved [`Relation`]: kind,
//! metatag overrides, output name and the raw edges the resolver follows.

use super::kind::classify_kind;
use super::metatag::extract_metatags;
use super::rewrite::walk_rewrite;
use crate::compiled::{AllowedRelation, CompiledSchema, ObjectDefinition, RelationDefinition};
use crate::error::{Result, SpicegenError};
use crate::schema::{Relation, RelationKind, RelationRef, Resource, ResourceTable, SubjectRef};
use std::collections::btree_map::Entry;
use tracing::{debug, debug_span};

/// Builds the unresolved relation for one member of `definition`.
///
/// # Errors
///
/// Returns [`SpicegenError::UnclassifiedMember`] when the metadata carries
/// neither a relation nor a permission kind.
pub fn build_relation(definition: &ObjectDefinition, member: &RelationDefinition) -> Result<Relation> {
    let span = debug_span!("build_relation", resource = %definition.name, member = %member.name);
    let _enter = span.enter();

    let kind = classify_kind(&member.metadata);
    if kind == RelationKind::Unknown {
        return Err(SpicegenError::UnclassifiedMember {
            resource: definition.name.clone(),
            member: member.name.clone(),
        });
    }

    let metatags = extract_metatags(member.doc_comments());

    let mut relation = Relation::new(&member.name, kind);
    if let Some(rename) = metatags.rename {
        relation.output_name = rename;
    }
    relation.override_allowed_subject_types = metatags.override_subject_types;

    if relation.active_override().is_none() {
        let mut refs = match &member.userset_rewrite {
            Some(rewrite) => walk_rewrite(definition, rewrite),
            None => Vec::new(),
        };
        if kind == RelationKind::Relation {
            for allowed in member
                .type_information
                .iter()
                .flat_map(|info| &info.allowed_direct_relations)
            {
                let candidate = direct_ref(allowed);
                if !refs.contains(&candidate) {
                    refs.push(candidate);
                }
            }
        }
        relation.relation_refs = refs;
    }

    debug!(
        kind = %relation.kind,
        output_name = %relation.output_name,
        overridden = relation.active_override().is_some(),
        refs = ?relation.relation_refs.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "built member"
    );

    Ok(relation)
}

/// Edge for one direct type constraint; `type:*` counts as a direct subject
fn direct_ref(allowed: &AllowedRelation) -> RelationRef {
    let relation = if allowed.public_wildcard {
        SubjectRef::Direct
    } else {
        SubjectRef::from_relation(allowed.relation.as_deref())
    };
    RelationRef {
        resource_type: allowed.namespace.clone(),
        relation,
        caveat: allowed.required_caveat.clone(),
    }
}

/// Builds the resource for one definition, splitting members by kind.
pub fn build_resource(definition: &ObjectDefinition) -> Result<Resource> {
    let mut resource = Resource::new(&definition.name);

    for member in &definition.relations {
        let relation = build_relation(definition, member)?;
        if resource.member(&relation.name).is_some() {
            return Err(SpicegenError::DuplicateMember {
                resource: definition.name.clone(),
                member: relation.name,
            });
        }
        let members = match relation.kind {
            RelationKind::Permission => &mut resource.permissions,
            _ => &mut resource.relations,
        };
        members.insert(relation.name.clone(), relation);
    }

    Ok(resource)
}

/// Builds the unresolved resource table for the whole schema.
///
/// # Errors
///
/// Fails on the first unclassified member, duplicate definition or
/// duplicate member.
pub fn build_table(schema: &CompiledSchema) -> Result<ResourceTable> {
    let mut table = ResourceTable::new();

    for definition in &schema.object_definitions {
        let resource = build_resource(definition)?;
        match table.entry(definition.name.clone()) {
            Entry::Occupied(_) => {
                return Err(SpicegenError::DuplicateDefinition(definition.name.clone()));
            }
            Entry::Vacant(slot) => {
                slot.insert(resource);
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::{SetOperationChild, UsersetRewrite};

    fn document() -> ObjectDefinition {
        ObjectDefinition::new("document")
            .with_member(RelationDefinition::relation("reader").allow("user").allow_via("team", "member"))
            .with_member(RelationDefinition::permission(
                "view",
                UsersetRewrite::union(vec![SetOperationChild::computed("reader")]),
            ))
    }

    #[test]
    fn test_relation_collects_direct_constraints() {
        let definition = document();
        let relation = build_relation(&definition, definition.member("reader").unwrap()).unwrap();

        assert_eq!(relation.kind, RelationKind::Relation);
        assert_eq!(relation.output_name, "reader");
        assert_eq!(
            relation.relation_refs,
            vec![RelationRef::direct("user"), RelationRef::via("team", "member")]
        );
    }

    #[test]
    fn test_permission_ignores_type_information() {
        let definition = ObjectDefinition::new("document").with_member(
            RelationDefinition::permission(
                "view",
                UsersetRewrite::union(vec![SetOperationChild::computed("reader")]),
            )
            .allow("user"),
        );
        let relation = build_relation(&definition, &definition.relations[0]).unwrap();

        assert_eq!(relation.kind, RelationKind::Permission);
        assert_eq!(relation.relation_refs, vec![RelationRef::via("document", "reader")]);
    }

    #[test]
    fn test_wildcard_and_caveat_constraints() {
        let member = RelationDefinition::relation("viewer")
            .allow_relation(AllowedRelation::new("user").public_wildcard())
            .allow_relation(AllowedRelation::new("user").with_caveat("ip_allowed"));
        let definition = ObjectDefinition::new("document").with_member(member);
        let relation = build_relation(&definition, &definition.relations[0]).unwrap();

        assert_eq!(
            relation.relation_refs,
            vec![
                RelationRef::direct("user"),
                RelationRef::direct("user").with_caveat("ip_allowed"),
            ]
        );
    }

    #[test]
    fn test_override_suppresses_refs() {
        let member = RelationDefinition::permission(
            "view",
            UsersetRewrite::union(vec![SetOperationChild::computed("reader")]),
        )
        .with_comment("//spicegen:subject_type=widget")
        .with_comment("//spicegen:rename=can_view");
        let definition = ObjectDefinition::new("document").with_member(member);
        let relation = build_relation(&definition, &definition.relations[0]).unwrap();

        assert_eq!(relation.output_name, "can_view");
        assert!(relation.relation_refs.is_empty());
        assert!(relation.active_override().unwrap().contains("widget"));
    }

    #[test]
    fn test_unclassified_member_rejected() {
        let definition = ObjectDefinition::new("document")
            .with_member(RelationDefinition::unclassified("mystery"));
        let err = build_relation(&definition, &definition.relations[0]).unwrap_err();
        assert!(matches!(
            err,
            SpicegenError::UnclassifiedMember { ref resource, ref member }
                if resource == "document" && member == "mystery"
        ));
    }

    #[test]
    fn test_build_resource_splits_by_kind() {
        let resource = build_resource(&document()).unwrap();
        assert_eq!(resource.relations.len(), 1);
        assert_eq!(resource.permissions.len(), 1);
        assert!(resource.relations.contains_key("reader"));
        assert!(resource.permissions.contains_key("view"));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let definition = ObjectDefinition::new("document")
            .with_member(RelationDefinition::relation("reader").allow("user"))
            .with_member(RelationDefinition::permission(
                "reader",
                UsersetRewrite::union(vec![SetOperationChild::This]),
            ));
        assert!(matches!(
            build_resource(&definition),
            Err(SpicegenError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let schema = CompiledSchema::new()
            .with_definition(ObjectDefinition::new("user"))
            .with_definition(ObjectDefinition::new("user"));
        assert!(matches!(
            build_table(&schema),
            Err(SpicegenError::DuplicateDefinition(name)) if name == "user"
        ));
    }

    #[test]
    fn test_build_table() {
        let schema = CompiledSchema::new()
            .with_definition(ObjectDefinition::new("user"))
            .with_definition(document());
        let table = build_table(&schema).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["document", "user"]);
    }
}
