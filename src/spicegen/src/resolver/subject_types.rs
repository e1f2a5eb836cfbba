//! Subject-type resolution
//!
//! Fills in `allowed_subject_types` for every relation and permission of an
//! unresolved resource table:
//!
//! - A non-empty override always wins and is taken verbatim.
//! - Relations map each referenced type to its subject ref, so `team#member`
//!   stays an indirection.
//! - Permissions dereference their edges until only direct subject types are
//!   left. Relations are followed through their raw refs, so every branch of
//!   `team | team#member` is reached. Permissions that reference permissions
//!   (including recursive arrows such as `folder.view = parent->view`) are
//!   solved as a least fixed point over all permissions, iterating in sorted
//!   order until no set changes.
//!
//! Members with no edges at all fall back to the `{"*": "..."}` wildcard.

use super::error::{RefChain, ResolutionError, ResolutionErrors};
use crate::schema::{
    AllowedSubjectTypes, Relation, RelationKind, RelationRef, ResourceTable, SubjectRef,
    WILDCARD_SUBJECT_TYPE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Resolver settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of subject-relation hops followed from a permission.
    ///
    /// `None` follows chains of any length. `Some(2)` allows a permission to
    /// reach a relation and follow one `type#relation` indirection from it.
    pub max_indirection_depth: Option<usize>,

    /// Stop at the first error instead of collecting all of them
    pub fail_fast: bool,
}

impl ResolverConfig {
    pub fn with_max_indirection_depth(mut self, depth: usize) -> Self {
        self.max_indirection_depth = Some(depth);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Signals that `fail_fast` tripped
struct Halt;

/// Resolves subject types for every member of `table`.
///
/// The input table is not modified; a resolved copy is returned.
///
/// # Errors
///
/// Returns every [`ResolutionError`] found (or only the first one with
/// `fail_fast`). No partially resolved table is returned on failure.
pub fn resolve(table: &ResourceTable, config: &ResolverConfig) -> Result<ResourceTable, ResolutionErrors> {
    let mut resolver = SubjectTypeResolver::new(table, config);
    match resolver.run() {
        Ok(()) if resolver.errors.is_empty() => Ok(resolver.resolved),
        _ => Err(resolver.errors),
    }
}

struct SubjectTypeResolver<'a> {
    table: &'a ResourceTable,
    config: &'a ResolverConfig,
    resolved: ResourceTable,
    errors: ResolutionErrors,
}

impl<'a> SubjectTypeResolver<'a> {
    fn new(table: &'a ResourceTable, config: &'a ResolverConfig) -> Self {
        Self {
            table,
            config,
            resolved: table.clone(),
            errors: ResolutionErrors::new(),
        }
    }

    fn report(&mut self, error: ResolutionError) -> Result<(), Halt> {
        debug!(error = %error, "resolution error");
        self.errors.push(error);
        if self.config.fail_fast {
            Err(Halt)
        } else {
            Ok(())
        }
    }

    fn run(&mut self) -> Result<(), Halt> {
        self.resolve_relations()?;
        self.seed_permissions();
        self.solve_permissions()?;
        if self.errors.is_empty() {
            self.check_permissions()?;
        }
        Ok(())
    }

    /// Relations only look one step ahead, so they resolve in a single pass.
    fn resolve_relations(&mut self) -> Result<(), Halt> {
        let table = self.table;
        for (resource_name, resource) in table {
            for (name, relation) in &resource.relations {
                let (subject_types, errors) = self.relation_subject_types(resource_name, relation);
                for error in errors {
                    self.report(error)?;
                }
                if let Some(slot) = self
                    .resolved
                    .get_mut(resource_name)
                    .and_then(|resource| resource.relations.get_mut(name))
                {
                    slot.allowed_subject_types = subject_types;
                }
            }
        }
        Ok(())
    }

    fn relation_subject_types(
        &self,
        resource_name: &str,
        relation: &Relation,
    ) -> (AllowedSubjectTypes, Vec<ResolutionError>) {
        if let Some(overrides) = relation.active_override() {
            return (overrides.clone(), Vec::new());
        }
        if relation.relation_refs.is_empty() {
            return (AllowedSubjectTypes::wildcard(), Vec::new());
        }

        let chain = RefChain::new().with(resource_name, &relation.name);
        let mut subject_types = AllowedSubjectTypes::new();
        let mut errors = Vec::new();

        for relation_ref in &relation.relation_refs {
            let Some(target) = self.table.get(&relation_ref.resource_type) else {
                errors.push(ResolutionError::UnknownResourceType {
                    resource: resource_name.to_string(),
                    member: relation.name.clone(),
                    resource_type: relation_ref.resource_type.clone(),
                    chain: chain.clone(),
                });
                continue;
            };
            if let SubjectRef::Via(sub) = &relation_ref.relation {
                if target.member(sub).is_none() {
                    errors.push(ResolutionError::UnknownMember {
                        resource: resource_name.to_string(),
                        member: relation.name.clone(),
                        target_type: relation_ref.resource_type.clone(),
                        target_member: sub.clone(),
                        chain: chain.clone(),
                    });
                    continue;
                }
            }
            subject_types.insert(relation_ref.resource_type.clone(), relation_ref.relation.clone());
        }

        (subject_types, errors)
    }

    /// Overrides and edge-less permissions are final before iteration starts.
    fn seed_permissions(&mut self) {
        for resource in self.resolved.values_mut() {
            for permission in resource.permissions.values_mut() {
                permission.allowed_subject_types = match permission.active_override() {
                    Some(overrides) => overrides.clone(),
                    None if permission.relation_refs.is_empty() => AllowedSubjectTypes::wildcard(),
                    None => AllowedSubjectTypes::new(),
                };
            }
        }
    }

    fn solve_permissions(&mut self) -> Result<(), Halt> {
        let table = self.table;
        let mut iteration = 0usize;

        loop {
            iteration += 1;
            let mut changed = false;

            for (resource_name, resource) in table {
                for (name, permission) in &resource.permissions {
                    if permission.active_override().is_some() || permission.relation_refs.is_empty() {
                        continue;
                    }

                    let mut expansion = Expansion::new(
                        &self.resolved,
                        self.config.max_indirection_depth,
                        resource_name,
                        name,
                    );
                    for relation_ref in &permission.relation_refs {
                        expansion.expand_ref(relation_ref);
                    }
                    let (subject_types, errors) = expansion.finish();

                    // Structural errors do not depend on iteration; report once.
                    if iteration == 1 {
                        for error in errors {
                            self.report(error)?;
                        }
                    }

                    if let Some(slot) = self
                        .resolved
                        .get_mut(resource_name)
                        .and_then(|resource| resource.permissions.get_mut(name))
                    {
                        changed |= slot.allowed_subject_types.extend(&subject_types);
                    }
                }
            }

            trace!(iteration, changed, "permission fixed-point iteration");
            if !changed || !self.errors.is_empty() {
                break;
            }
        }

        debug!(iterations = iteration, "permission subject types converged");
        Ok(())
    }

    /// A permission with edges that reached nothing is an error.
    fn check_permissions(&mut self) -> Result<(), Halt> {
        let mut empty = Vec::new();
        for (resource_name, resource) in &self.resolved {
            for permission in resource.permissions.values() {
                if permission.allowed_subject_types.is_empty() {
                    let mut chain = RefChain::new().with(resource_name, &permission.name);
                    for relation_ref in &permission.relation_refs {
                        if let SubjectRef::Via(member) = &relation_ref.relation {
                            chain.push(&relation_ref.resource_type, member);
                        }
                    }
                    empty.push(ResolutionError::NoConcreteSubjectTypes {
                        resource: resource_name.clone(),
                        member: permission.name.clone(),
                        chain,
                    });
                }
            }
        }
        for error in empty {
            self.report(error)?;
        }
        Ok(())
    }
}

/// Outgoing edges of a member reached from a permission.
///
/// An inferred relation yields its raw refs: the resolved map keeps one
/// entry per subject type, so `team | team#member` or
/// `team#member | team#admin` would lose a branch. Overridden relations and
/// permissions yield their resolved entries.
fn member_edges(target: &Relation) -> Vec<(&str, &SubjectRef)> {
    let inferred_relation = target.kind == RelationKind::Relation
        && target.active_override().is_none()
        && !target.relation_refs.is_empty();

    if inferred_relation {
        target
            .relation_refs
            .iter()
            .map(|relation_ref| (relation_ref.resource_type.as_str(), &relation_ref.relation))
            .collect()
    } else {
        target
            .allowed_subject_types
            .iter()
            .map(|(subject_type, subject_ref)| (subject_type.as_str(), subject_ref))
            .collect()
    }
}

/// Dereferences the edges of one permission against the current state
struct Expansion<'r> {
    resolved: &'r ResourceTable,
    max_depth: Option<usize>,
    resource: &'r str,
    member: &'r str,
    chain: RefChain,
    path: BTreeSet<(String, String)>,
    subject_types: AllowedSubjectTypes,
    errors: Vec<ResolutionError>,
}

impl<'r> Expansion<'r> {
    fn new(resolved: &'r ResourceTable, max_depth: Option<usize>, resource: &'r str, member: &'r str) -> Self {
        let mut path = BTreeSet::new();
        path.insert((resource.to_string(), member.to_string()));
        Self {
            resolved,
            max_depth,
            resource,
            member,
            chain: RefChain::new().with(resource, member),
            path,
            subject_types: AllowedSubjectTypes::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> (AllowedSubjectTypes, Vec<ResolutionError>) {
        (self.subject_types, self.errors)
    }

    fn expand_ref(&mut self, relation_ref: &RelationRef) {
        match &relation_ref.relation {
            SubjectRef::Direct => {
                if self.resolved.contains_key(&relation_ref.resource_type) {
                    self.subject_types
                        .insert(relation_ref.resource_type.clone(), SubjectRef::Direct);
                } else {
                    self.unknown_type(&relation_ref.resource_type);
                }
            }
            SubjectRef::Via(member) => self.expand_member(&relation_ref.resource_type, member, 1),
        }
    }

    /// Merges the subject types of `resource_type#member`, following its
    /// indirect entries. `depth` is the hop count from the permission.
    fn expand_member(&mut self, resource_type: &str, member: &str, depth: usize) {
        let resolved = self.resolved;
        let Some(resource) = resolved.get(resource_type) else {
            self.unknown_type(resource_type);
            return;
        };
        let Some(target) = resource.member(member) else {
            self.errors.push(ResolutionError::UnknownMember {
                resource: self.resource.to_string(),
                member: self.member.to_string(),
                target_type: resource_type.to_string(),
                target_member: member.to_string(),
                chain: self.chain.clone(),
            });
            return;
        };

        let key = (resource_type.to_string(), member.to_string());
        if !self.path.insert(key.clone()) {
            return;
        }
        self.chain.push(resource_type, member);

        for (subject_type, subject_ref) in member_edges(target) {
            match subject_ref {
                SubjectRef::Via(sub) if subject_type != WILDCARD_SUBJECT_TYPE => {
                    if self.path.contains(&(subject_type.to_string(), sub.clone())) {
                        continue;
                    }
                    if let Some(max_depth) = self.max_depth {
                        if depth >= max_depth {
                            self.errors.push(ResolutionError::IndirectionDepthExceeded {
                                resource: self.resource.to_string(),
                                member: self.member.to_string(),
                                max_depth,
                                chain: self.chain.with(subject_type, sub),
                            });
                            continue;
                        }
                    }
                    self.expand_member(subject_type, sub, depth + 1);
                }
                _ => {
                    self.subject_types.insert(subject_type, SubjectRef::Direct);
                }
            }
        }

        self.chain.pop();
        self.path.remove(&key);
    }

    fn unknown_type(&mut self, resource_type: &str) {
        self.errors.push(ResolutionError::UnknownResourceType {
            resource: self.resource.to_string(),
            member: self.member.to_string(),
            resource_type: resource_type.to_string(),
            chain: self.chain.clone(),
        });
    }
}
