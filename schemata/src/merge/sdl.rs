use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::Definition;
use apollo_compiler::ast::Document;
use apollo_compiler::name;
use itertools::Itertools;

use crate::merge::ConflictResolvers;
use crate::merge::FieldNode;
use crate::scalar::ScalarConfigs;

/// Items matched by name when two definitions are combined.
pub(crate) trait Named {
    fn name(&self) -> &Name;
}

impl Named for Name {
    fn name(&self) -> &Name {
        self
    }
}

impl Named for Node<ast::Directive> {
    fn name(&self) -> &Name {
        &self.name
    }
}

impl Named for Node<ast::FieldDefinition> {
    fn name(&self) -> &Name {
        &self.name
    }
}

impl Named for Node<ast::InputValueDefinition> {
    fn name(&self) -> &Name {
        &self.name
    }
}

impl Named for Node<ast::EnumValueDefinition> {
    fn name(&self) -> &Name {
        &self.value
    }
}

/// Identity of a top level definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DefinitionKey {
    Schema,
    Type(Name),
    Directive(Name),
    /// Anonymous operations never match anything.
    Executable(Option<Name>),
}

impl DefinitionKey {
    pub(crate) fn of(definition: &Definition) -> Self {
        match definition {
            Definition::SchemaDefinition(_) | Definition::SchemaExtension(_) => Self::Schema,
            Definition::DirectiveDefinition(directive) => Self::Directive(directive.name.clone()),
            Definition::OperationDefinition(operation) => Self::Executable(operation.name.clone()),
            Definition::FragmentDefinition(fragment) => {
                Self::Executable(Some(fragment.name.clone()))
            }
            Definition::ScalarTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::ObjectTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::InterfaceTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::UnionTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::EnumTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::InputObjectTypeDefinition(def) => Self::Type(def.name.clone()),
            Definition::ScalarTypeExtension(def) => Self::Type(def.name.clone()),
            Definition::ObjectTypeExtension(def) => Self::Type(def.name.clone()),
            Definition::InterfaceTypeExtension(def) => Self::Type(def.name.clone()),
            Definition::UnionTypeExtension(def) => Self::Type(def.name.clone()),
            Definition::EnumTypeExtension(def) => Self::Type(def.name.clone()),
            Definition::InputObjectTypeExtension(def) => Self::Type(def.name.clone()),
        }
    }

    pub(crate) fn matches(&self, other: &Self) -> bool {
        !matches!(self, Self::Executable(None)) && self == other
    }
}

/// Short kind tag used in logs.
pub(crate) fn kind(definition: &Definition) -> &'static str {
    match definition {
        Definition::SchemaDefinition(_) | Definition::SchemaExtension(_) => "schema",
        Definition::DirectiveDefinition(_) => "directive",
        Definition::OperationDefinition(_) => "operation",
        Definition::FragmentDefinition(_) => "fragment",
        Definition::ScalarTypeDefinition(_) | Definition::ScalarTypeExtension(_) => "scalar",
        Definition::ObjectTypeDefinition(_) | Definition::ObjectTypeExtension(_) => "object",
        Definition::InterfaceTypeDefinition(_) | Definition::InterfaceTypeExtension(_) => {
            "interface"
        }
        Definition::UnionTypeDefinition(_) | Definition::UnionTypeExtension(_) => "union",
        Definition::EnumTypeDefinition(_) | Definition::EnumTypeExtension(_) => "enum",
        Definition::InputObjectTypeDefinition(_) | Definition::InputObjectTypeExtension(_) => {
            "input object"
        }
    }
}

/// Rewrites an extension as the equivalent definition. Definitions are returned as is.
pub(crate) fn as_definition(definition: &Definition) -> Definition {
    match definition {
        Definition::SchemaExtension(ext) => {
            Definition::SchemaDefinition(Node::new(ast::SchemaDefinition {
                description: None,
                directives: ext.directives.clone(),
                root_operations: ext.root_operations.clone(),
            }))
        }
        Definition::ScalarTypeExtension(ext) => {
            Definition::ScalarTypeDefinition(Node::new(ast::ScalarTypeDefinition {
                description: None,
                name: ext.name.clone(),
                directives: ext.directives.clone(),
            }))
        }
        Definition::ObjectTypeExtension(ext) => {
            Definition::ObjectTypeDefinition(Node::new(ast::ObjectTypeDefinition {
                description: None,
                name: ext.name.clone(),
                implements_interfaces: ext.implements_interfaces.clone(),
                directives: ext.directives.clone(),
                fields: ext.fields.clone(),
            }))
        }
        Definition::InterfaceTypeExtension(ext) => {
            Definition::InterfaceTypeDefinition(Node::new(ast::InterfaceTypeDefinition {
                description: None,
                name: ext.name.clone(),
                implements_interfaces: ext.implements_interfaces.clone(),
                directives: ext.directives.clone(),
                fields: ext.fields.clone(),
            }))
        }
        Definition::UnionTypeExtension(ext) => {
            Definition::UnionTypeDefinition(Node::new(ast::UnionTypeDefinition {
                description: None,
                name: ext.name.clone(),
                directives: ext.directives.clone(),
                members: ext.members.clone(),
            }))
        }
        Definition::EnumTypeExtension(ext) => {
            Definition::EnumTypeDefinition(Node::new(ast::EnumTypeDefinition {
                description: None,
                name: ext.name.clone(),
                directives: ext.directives.clone(),
                values: ext.values.clone(),
            }))
        }
        Definition::InputObjectTypeExtension(ext) => {
            Definition::InputObjectTypeDefinition(Node::new(ast::InputObjectTypeDefinition {
                description: None,
                name: ext.name.clone(),
                directives: ext.directives.clone(),
                fields: ext.fields.clone(),
            }))
        }
        other => other.clone(),
    }
}

/// Definitions of `document` with extensions rewritten as definitions and same-named
/// definitions folded into the first one.
pub(crate) fn consolidate(document: &Document, resolvers: &ConflictResolvers) -> Vec<Definition> {
    let mut definitions = Vec::with_capacity(document.definitions.len());
    for definition in &document.definitions {
        fold_definition(&mut definitions, as_definition(definition), resolvers);
    }
    definitions
}

fn fold_definition(
    definitions: &mut Vec<Definition>,
    definition: Definition,
    resolvers: &ConflictResolvers,
) {
    let key = DefinitionKey::of(&definition);
    match definitions
        .iter()
        .position(|existing| key.matches(&DefinitionKey::of(existing)))
    {
        Some(index) => {
            tracing::trace!(key = ?key, kind = kind(&definition), "combining definitions");
            definitions[index] = merge_definition(&definitions[index], &definition, resolvers);
        }
        None => {
            tracing::trace!(key = ?key, kind = kind(&definition), "appending definition");
            definitions.push(definition);
        }
    }
}

/// Merges `right` into `left`.
///
/// Types only present on one side are kept as they are. Same-named types are combined
/// member by member: directives first, then fields, enum values or union members. A
/// colliding member is resolved through `resolvers` and put back where the left one
/// was.
pub fn merge_documents(left: &Document, right: &Document, resolvers: &ConflictResolvers) -> Document {
    let mut definitions = consolidate(left, resolvers);
    for definition in consolidate(right, resolvers) {
        fold_definition(&mut definitions, definition, resolvers);
    }
    tracing::debug!(definitions = definitions.len(), "merged SDL documents");
    let mut document = Document::new();
    document.definitions = definitions;
    document
}

/// Scalar configurations of the merged schema.
///
/// Only scalars still defined by `merged` are considered; the scalar conflict resolver
/// is asked whenever at least one side configures one.
pub fn merge_scalar_configs(
    left: &ScalarConfigs,
    right: &ScalarConfigs,
    merged: &Document,
    resolvers: &ConflictResolvers,
) -> ScalarConfigs {
    merged
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::ScalarTypeDefinition(scalar) => Some(&scalar.name),
            _ => None,
        })
        .filter_map(|name| {
            let (left, right) = (left.get(name), right.get(name));
            if left.is_none() && right.is_none() {
                return None;
            }
            let config = resolvers.scalar(name, left, right)?;
            tracing::debug!(scalar = %name, "staging scalar configuration");
            Some((name.clone(), config))
        })
        .collect()
}

/// Splices every item of `right` into `left`: unknown names are appended, known ones
/// are replaced in place by the result of `resolve(left_item, right_item)`.
pub(crate) fn combine<T: Named + Clone>(
    left: &mut Vec<T>,
    right: &[T],
    mut resolve: impl FnMut(&T, &T) -> T,
) {
    for item in right {
        match left
            .iter()
            .position(|existing| existing.name() == item.name())
        {
            Some(index) => left[index] = resolve(&left[index], item),
            None => left.push(item.clone()),
        }
    }
}

fn combine_directives(
    owner: &Name,
    left: &mut ast::DirectiveList,
    right: &ast::DirectiveList,
    resolvers: &ConflictResolvers,
) {
    combine(&mut left.0, &right.0, |l, r| resolvers.directive(owner, l, r));
}

fn combine_output_fields(
    type_name: &Name,
    left: &mut Vec<Node<ast::FieldDefinition>>,
    right: &[Node<ast::FieldDefinition>],
    resolvers: &ConflictResolvers,
) {
    combine(left, right, |l, r| {
        match resolvers.field(
            type_name,
            &FieldNode::Output(l.clone()),
            &FieldNode::Output(r.clone()),
        ) {
            FieldNode::Output(field) => field,
            FieldNode::Input(field) => {
                tracing::warn!(type_name = %type_name, field = %field.name, "field resolver returned an input field for an output type, keeping the right field");
                r.clone()
            }
        }
    });
}

fn combine_input_fields(
    type_name: &Name,
    left: &mut Vec<Node<ast::InputValueDefinition>>,
    right: &[Node<ast::InputValueDefinition>],
    resolvers: &ConflictResolvers,
) {
    combine(left, right, |l, r| {
        match resolvers.field(
            type_name,
            &FieldNode::Input(l.clone()),
            &FieldNode::Input(r.clone()),
        ) {
            FieldNode::Input(field) => field,
            FieldNode::Output(field) => {
                tracing::warn!(type_name = %type_name, field = %field.name, "field resolver returned an output field for an input type, keeping the right field");
                r.clone()
            }
        }
    });
}

fn union_names(left: &mut Vec<Name>, right: &[Name]) {
    *left = left.iter().chain(right).unique().cloned().collect();
}

fn merge_description(left: &mut Option<Node<str>>, right: &Option<Node<str>>) {
    if left.is_none() {
        left.clone_from(right);
    }
}

fn merge_definition(
    left: &Definition,
    right: &Definition,
    resolvers: &ConflictResolvers,
) -> Definition {
    match (left, right) {
        (Definition::SchemaDefinition(l), Definition::SchemaDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&name!("schema"), &mut def.directives, &r.directives, resolvers);
            for operation in &r.root_operations {
                match def
                    .root_operations
                    .iter()
                    .position(|existing| existing.0 == operation.0)
                {
                    Some(index) => def.root_operations[index] = operation.clone(),
                    None => def.root_operations.push(operation.clone()),
                }
            }
            Definition::SchemaDefinition(merged)
        }
        (Definition::ObjectTypeDefinition(l), Definition::ObjectTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            combine_output_fields(&def.name, &mut def.fields, &r.fields, resolvers);
            union_names(&mut def.implements_interfaces, &r.implements_interfaces);
            Definition::ObjectTypeDefinition(merged)
        }
        (Definition::InterfaceTypeDefinition(l), Definition::InterfaceTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            combine_output_fields(&def.name, &mut def.fields, &r.fields, resolvers);
            union_names(&mut def.implements_interfaces, &r.implements_interfaces);
            Definition::InterfaceTypeDefinition(merged)
        }
        (Definition::InputObjectTypeDefinition(l), Definition::InputObjectTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            combine_input_fields(&def.name, &mut def.fields, &r.fields, resolvers);
            Definition::InputObjectTypeDefinition(merged)
        }
        (Definition::EnumTypeDefinition(l), Definition::EnumTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            combine(&mut def.values, &r.values, |lv, rv| {
                resolvers.enum_value(&def.name, lv, rv)
            });
            Definition::EnumTypeDefinition(merged)
        }
        (Definition::UnionTypeDefinition(l), Definition::UnionTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            combine(&mut def.members, &r.members, |lm, rm| {
                resolvers.union_member(&def.name, lm, rm)
            });
            Definition::UnionTypeDefinition(merged)
        }
        (Definition::ScalarTypeDefinition(l), Definition::ScalarTypeDefinition(r)) => {
            let mut merged = l.clone();
            let def = merged.make_mut();
            merge_description(&mut def.description, &r.description);
            combine_directives(&def.name, &mut def.directives, &r.directives, resolvers);
            Definition::ScalarTypeDefinition(merged)
        }
        (Definition::DirectiveDefinition(_), Definition::DirectiveDefinition(_))
        | (Definition::OperationDefinition(_), Definition::OperationDefinition(_))
        | (Definition::FragmentDefinition(_), Definition::FragmentDefinition(_)) => left.clone(),
        _ => {
            tracing::warn!(
                key = ?DefinitionKey::of(right),
                left = kind(left),
                right = kind(right),
                "definitions of different kinds share a name, keeping the right one"
            );
            right.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scalar::ScalarConfig;

    fn parse(sdl: &str) -> Document {
        Document::parse(sdl, "test.graphql").unwrap()
    }

    fn merge(left: &str, right: &str) -> String {
        merge_documents(&parse(left), &parse(right), &ConflictResolvers::default()).to_string()
    }

    fn printed(sdl: &str) -> String {
        parse(sdl).to_string()
    }

    #[test]
    fn disjoint_types_are_unioned() {
        assert_eq!(
            merge("type Query { peep: Person }", "type Person { name: String }"),
            printed("type Query { peep: Person } type Person { name: String }")
        );
    }

    #[test]
    fn right_field_wins_in_place() {
        assert_eq!(
            merge(
                "type Person { name: String age: Int }",
                "type Person { gender: String name: ID! }"
            ),
            printed("type Person { name: ID! age: Int gender: String }")
        );
    }

    #[test]
    fn field_resolver_decides_collisions() {
        let resolvers = ConflictResolvers::default().with_field(|_, left, _| left.clone());
        let merged = merge_documents(
            &parse("type Person { name: String }"),
            &parse("type Person { name: ID! }"),
            &resolvers,
        );
        assert_eq!(merged.to_string(), printed("type Person { name: String }"));
    }

    #[test]
    fn extensions_become_definitions() {
        assert_eq!(
            merge(
                "type Query { a: String } extend type Query { b: String }",
                "extend type Query { c: String } extend enum Gender { Male }"
            ),
            printed("type Query { a: String b: String c: String } enum Gender { Male }")
        );
    }

    #[test]
    fn enums_and_unions_combine_members() {
        assert_eq!(
            merge(
                "enum Gender { Male Female } union Thing = A | B",
                "enum Gender { Female Other } union Thing = B | C"
            ),
            printed("enum Gender { Male Female Other } union Thing = A | B | C")
        );
    }

    #[test]
    fn directives_and_interfaces_are_combined() {
        assert_eq!(
            merge(
                "directive @tag(name: String) on OBJECT type Person implements Node @tag(name: \"a\") { id: ID }",
                "directive @tag(name: String) repeatable on OBJECT type Person implements Named @tag(name: \"b\") { name: String }"
            ),
            printed(
                "directive @tag(name: String) on OBJECT type Person implements Node & Named @tag(name: \"b\") { id: ID name: String }"
            )
        );
    }

    #[test]
    fn schema_definitions_merge_root_operations() {
        assert_eq!(
            merge(
                "schema { query: Q } type Q { a: String }",
                "schema { query: Root mutation: M } type M { b: String }"
            ),
            printed("schema { query: Root mutation: M } type Q { a: String } type M { b: String }")
        );
    }

    #[test]
    fn kind_mismatch_keeps_the_right_definition() {
        assert_eq!(
            merge("scalar Thing", "type Thing { a: String }"),
            printed("type Thing { a: String }")
        );
    }

    #[test]
    fn scalar_configs_go_through_the_resolver() {
        let merged = parse("scalar Date scalar Time");
        let left: ScalarConfigs = [(name!("Date"), ScalarConfig::new())].into_iter().collect();
        let right: ScalarConfigs = [
            (name!("Time"), ScalarConfig::new()),
            (name!("Gone"), ScalarConfig::new()),
        ]
        .into_iter()
        .collect();
        let configs =
            merge_scalar_configs(&left, &right, &merged, &ConflictResolvers::default());
        assert_eq!(
            configs.keys().map(Name::as_str).collect::<Vec<_>>(),
            vec!["Date", "Time"]
        );

        let dropping = ConflictResolvers::default().with_scalar(|_, _, _| None);
        assert!(merge_scalar_configs(&left, &right, &merged, &dropping).is_empty());
    }
}
