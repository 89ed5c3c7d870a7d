//! Subtraction of one SDL document from another.
//!
//! Paring walks the same structure as merging but removes every left member that the
//! right side names, together with the resolvers bound to removed fields. It is a
//! cleanup tool: paring a merge result with one of its inputs does not give back the
//! other input.
use apollo_compiler::Name;
use apollo_compiler::ast::Definition;
use apollo_compiler::ast::Document;
use apollo_compiler::name;

use crate::merge::ConflictResolvers;
use crate::merge::sdl::DefinitionKey;
use crate::merge::sdl::Named;
use crate::merge::sdl::consolidate;
use crate::merge::sdl::kind;
use crate::resolver::map::ResolverEntry;
use crate::resolver::map::ResolverMap;

/// Removes everything `right` defines from `left`.
///
/// Returns the pared document and a copy of `resolvers` without the resolvers of the
/// removed fields. Resolvers are looked up by `[type, field]` first; fields of root
/// operation types may also be bound flat, by field name alone.
pub fn pare_documents(
    left: &Document,
    right: &Document,
    resolvers: &ResolverMap,
) -> (Document, ResolverMap) {
    let merge_resolvers = ConflictResolvers::default();
    let mut definitions = consolidate(left, &merge_resolvers);
    let root_types = root_type_names(&definitions);
    let mut resolvers = resolvers.clone();

    for subtrahend in consolidate(right, &merge_resolvers) {
        let key = DefinitionKey::of(&subtrahend);
        let Some(index) = definitions
            .iter()
            .position(|existing| key.matches(&DefinitionKey::of(existing)))
        else {
            continue;
        };
        let is_root = matches!(&key, DefinitionKey::Type(name) if root_types.contains(name));
        match pare_definition(&definitions[index], &subtrahend, is_root, &mut resolvers) {
            Pared::Kept(definition) => definitions[index] = definition,
            Pared::Removed => {
                tracing::debug!(key = ?key, kind = kind(&subtrahend), "removing definition");
                definitions.remove(index);
            }
            Pared::Mismatch => {
                tracing::warn!(
                    key = ?key,
                    left = kind(&definitions[index]),
                    right = kind(&subtrahend),
                    "cannot pare definitions of different kinds"
                );
            }
        }
    }

    let mut document = Document::new();
    document.definitions = definitions;
    (document, resolvers)
}

enum Pared {
    Kept(Definition),
    Removed,
    Mismatch,
}

/// Names of the root operation types, explicit or conventional.
fn root_type_names(definitions: &[Definition]) -> Vec<Name> {
    let explicit = definitions.iter().find_map(|definition| match definition {
        Definition::SchemaDefinition(schema) => Some(
            schema
                .root_operations
                .iter()
                .map(|operation| operation.1.clone())
                .collect::<Vec<_>>(),
        ),
        _ => None,
    });
    explicit.unwrap_or_else(|| vec![name!("Query"), name!("Mutation"), name!("Subscription")])
}

/// Removes from `left` the items named in `right`, returning the removed names.
fn subtract<T: Named>(left: &mut Vec<T>, right: &[T]) -> Vec<Name> {
    let mut removed = Vec::new();
    left.retain(|item| {
        let matched = right.iter().any(|other| other.name() == item.name());
        if matched {
            removed.push(item.name().clone());
        }
        !matched
    });
    removed
}

fn remove_field_resolvers(
    resolvers: &mut ResolverMap,
    type_name: &Name,
    fields: &[Name],
    is_root: bool,
) {
    for field in fields {
        if resolvers.remove_at(&[type_name.as_str(), field.as_str()]).is_some() {
            tracing::trace!(type_name = %type_name, field = %field, "removed resolver");
            continue;
        }
        if is_root && matches!(resolvers.get(field), Some(ResolverEntry::Resolver(_))) {
            resolvers.remove(field);
            tracing::trace!(field = %field, "removed root resolver");
        }
    }
}

fn pare_definition(
    left: &Definition,
    right: &Definition,
    is_root: bool,
    resolvers: &mut ResolverMap,
) -> Pared {
    match (left, right) {
        (Definition::ObjectTypeDefinition(l), Definition::ObjectTypeDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            let removed = subtract(&mut def.fields, &r.fields);
            remove_field_resolvers(resolvers, &def.name, &removed, is_root);
            if def.fields.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::ObjectTypeDefinition(pared))
            }
        }
        (Definition::InterfaceTypeDefinition(l), Definition::InterfaceTypeDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            let removed = subtract(&mut def.fields, &r.fields);
            remove_field_resolvers(resolvers, &def.name, &removed, false);
            if def.fields.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::InterfaceTypeDefinition(pared))
            }
        }
        (Definition::InputObjectTypeDefinition(l), Definition::InputObjectTypeDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            subtract(&mut def.fields, &r.fields);
            if def.fields.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::InputObjectTypeDefinition(pared))
            }
        }
        (Definition::EnumTypeDefinition(l), Definition::EnumTypeDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            subtract(&mut def.values, &r.values);
            if def.values.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::EnumTypeDefinition(pared))
            }
        }
        (Definition::UnionTypeDefinition(l), Definition::UnionTypeDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            subtract(&mut def.members, &r.members);
            if def.members.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::UnionTypeDefinition(pared))
            }
        }
        (Definition::SchemaDefinition(l), Definition::SchemaDefinition(r)) => {
            let mut pared = l.clone();
            let def = pared.make_mut();
            subtract(&mut def.directives.0, &r.directives.0);
            def.root_operations.retain(|operation| {
                !r.root_operations
                    .iter()
                    .any(|other| other.0 == operation.0)
            });
            if def.root_operations.is_empty() {
                Pared::Removed
            } else {
                Pared::Kept(Definition::SchemaDefinition(pared))
            }
        }
        // no members to diff
        (Definition::ScalarTypeDefinition(_), Definition::ScalarTypeDefinition(_))
        | (Definition::DirectiveDefinition(_), Definition::DirectiveDefinition(_))
        | (Definition::OperationDefinition(_), Definition::OperationDefinition(_))
        | (Definition::FragmentDefinition(_), Definition::FragmentDefinition(_)) => Pared::Removed,
        _ => Pared::Mismatch,
    }
}
