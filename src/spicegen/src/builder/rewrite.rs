//! Rewrite-tree walker
//!
//! Flattens a permission's boolean rewrite tree into the list of edges it
//! references. Union, exclusion and intersection are walked alike: a subject
//! type that can reach any branch is a candidate subject type.

use crate::compiled::{ObjectDefinition, SetOperation, SetOperationChild, UsersetRewrite};
use crate::schema::RelationRef;
use std::collections::VecDeque;

/// Walks `rewrite` breadth-first and returns the edges it references.
///
/// `definition` is the definition owning the member; computed usersets point
/// back into it, and its relations give tuplesets their types. Edges are
/// returned in discovery order without duplicates.
pub fn walk_rewrite(definition: &ObjectDefinition, rewrite: &UsersetRewrite) -> Vec<RelationRef> {
    let mut refs: Vec<RelationRef> = Vec::new();
    let mut queue: VecDeque<&SetOperation> = rewrite.operations().collect();

    while let Some(operation) = queue.pop_front() {
        for child in &operation.children {
            match child {
                SetOperationChild::This => {}
                SetOperationChild::ComputedUserset { relation } => {
                    push_unique(&mut refs, RelationRef::via(&definition.name, relation));
                }
                SetOperationChild::TupleToUserset {
                    tupleset,
                    computed_userset,
                } => {
                    for resource_type in tupleset_types(definition, tupleset) {
                        push_unique(&mut refs, RelationRef::via(resource_type, computed_userset));
                    }
                }
                SetOperationChild::UsersetRewrite { rewrite } => {
                    queue.extend(rewrite.operations());
                }
            }
        }
    }

    refs
}

/// Types an arrow's tupleset can point at.
///
/// Uses the direct constraints of the relation named `tupleset` when the
/// definition has one; otherwise the tupleset name is the type.
fn tupleset_types<'a>(definition: &'a ObjectDefinition, tupleset: &'a str) -> Vec<&'a str> {
    let namespaces = definition
        .member(tupleset)
        .map(|member| member.allowed_namespaces())
        .unwrap_or_default();

    if namespaces.is_empty() {
        vec![tupleset]
    } else {
        namespaces
    }
}

fn push_unique(refs: &mut Vec<RelationRef>, candidate: RelationRef) {
    if !refs.contains(&candidate) {
        refs.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::RelationDefinition;

    fn document() -> ObjectDefinition {
        ObjectDefinition::new("document")
            .with_member(RelationDefinition::relation("reader").allow("user"))
            .with_member(RelationDefinition::relation("writer").allow("user"))
            .with_member(RelationDefinition::relation("parent").allow("folder"))
    }

    #[test]
    fn test_this_is_skipped() {
        let rewrite = UsersetRewrite::union(vec![SetOperationChild::This]);
        assert!(walk_rewrite(&document(), &rewrite).is_empty());
    }

    #[test]
    fn test_computed_userset_points_at_owner() {
        let rewrite = UsersetRewrite::union(vec![
            SetOperationChild::computed("reader"),
            SetOperationChild::computed("writer"),
        ]);
        assert_eq!(
            walk_rewrite(&document(), &rewrite),
            vec![
                RelationRef::via("document", "reader"),
                RelationRef::via("document", "writer"),
            ]
        );
    }

    #[test]
    fn test_arrow_uses_tupleset_relation_types() {
        let rewrite = UsersetRewrite::union(vec![SetOperationChild::arrow("parent", "view")]);
        assert_eq!(
            walk_rewrite(&document(), &rewrite),
            vec![RelationRef::via("folder", "view")]
        );
    }

    #[test]
    fn test_arrow_fans_out_over_constrained_types() {
        let definition = ObjectDefinition::new("document").with_member(
            RelationDefinition::relation("parent")
                .allow("folder")
                .allow("drive")
                .allow_via("folder", "owner"),
        );
        let rewrite = UsersetRewrite::union(vec![SetOperationChild::arrow("parent", "view")]);
        assert_eq!(
            walk_rewrite(&definition, &rewrite),
            vec![
                RelationRef::via("folder", "view"),
                RelationRef::via("drive", "view"),
            ]
        );
    }

    #[test]
    fn test_arrow_without_tupleset_relation_uses_name() {
        let definition = ObjectDefinition::new("document");
        let rewrite = UsersetRewrite::union(vec![SetOperationChild::arrow("folder", "view")]);
        assert_eq!(
            walk_rewrite(&definition, &rewrite),
            vec![RelationRef::via("folder", "view")]
        );
    }

    #[test]
    fn test_nested_rewrites_walked_breadth_first() {
        let inner = UsersetRewrite::exclusion(vec![
            SetOperationChild::computed("writer"),
            SetOperationChild::computed("reader"),
        ]);
        let rewrite = UsersetRewrite::union(vec![
            SetOperationChild::nested(inner),
            SetOperationChild::computed("reader"),
            SetOperationChild::arrow("parent", "view"),
        ]);

        assert_eq!(
            walk_rewrite(&document(), &rewrite),
            vec![
                RelationRef::via("document", "reader"),
                RelationRef::via("folder", "view"),
                RelationRef::via("document", "writer"),
            ]
        );
    }

    #[test]
    fn test_all_operations_walked() {
        let rewrite = UsersetRewrite {
            union: Some(SetOperation {
                children: vec![SetOperationChild::computed("reader")],
            }),
            exclusion: Some(SetOperation {
                children: vec![SetOperationChild::computed("writer")],
            }),
            intersection: Some(SetOperation {
                children: vec![SetOperationChild::computed("parent")],
            }),
        };

        let refs = walk_rewrite(&document(), &rewrite);
        let relations: Vec<_> = refs.iter().filter_map(|r| r.relation.relation()).collect();
        assert_eq!(relations, vec!["reader", "writer", "parent"]);
    }
}
