//! SDL level merging and paring.
//!
//! Both engines work on parsed [`ast::Document`]s. Before anything is compared each
//! side is consolidated: type extensions become plain definitions and same-named
//! definitions are folded together, so a type is only ever defined once per side.
use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;

use crate::config::MergeConfig;
use crate::resolver::ResolverInjector;
use crate::scalar::ScalarConfig;

pub mod pare;
pub mod sdl;

/// A field colliding during a merge: output fields of objects and interfaces, or input
/// fields of input objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldNode {
    Output(Node<ast::FieldDefinition>),
    Input(Node<ast::InputValueDefinition>),
}

impl FieldNode {
    pub fn name(&self) -> &Name {
        match self {
            FieldNode::Output(field) => &field.name,
            FieldNode::Input(field) => &field.name,
        }
    }
}

type FieldResolverFn = dyn Fn(&Name, &FieldNode, &FieldNode) -> FieldNode + Send + Sync;
type DirectiveResolverFn =
    dyn Fn(&Name, &Node<ast::Directive>, &Node<ast::Directive>) -> Node<ast::Directive> + Send + Sync;
type EnumValueResolverFn = dyn Fn(
        &Name,
        &Node<ast::EnumValueDefinition>,
        &Node<ast::EnumValueDefinition>,
    ) -> Node<ast::EnumValueDefinition>
    + Send
    + Sync;
type UnionMemberResolverFn = dyn Fn(&Name, &Name, &Name) -> Name + Send + Sync;
type ScalarResolverFn =
    dyn Fn(&Name, Option<&ScalarConfig>, Option<&ScalarConfig>) -> Option<ScalarConfig> + Send + Sync;

/// Tie-break functions deciding what survives when both sides define the same entity.
///
/// Every resolver receives the name of the enclosing type, then the left and the right
/// item. All of them default to keeping the right item; the scalar resolver keeps the
/// right configuration when there is one and the left one otherwise.
#[derive(Clone)]
pub struct ConflictResolvers {
    field: Arc<FieldResolverFn>,
    directive: Arc<DirectiveResolverFn>,
    enum_value: Arc<EnumValueResolverFn>,
    union_member: Arc<UnionMemberResolverFn>,
    scalar: Arc<ScalarResolverFn>,
}

fn keep_right<T: Clone>(_owner: &Name, _left: &T, right: &T) -> T {
    right.clone()
}

fn prefer_right_scalar(
    _type_name: &Name,
    left: Option<&ScalarConfig>,
    right: Option<&ScalarConfig>,
) -> Option<ScalarConfig> {
    right.or(left).cloned()
}

impl Default for ConflictResolvers {
    fn default() -> Self {
        Self {
            field: Arc::new(keep_right::<FieldNode>),
            directive: Arc::new(keep_right::<Node<ast::Directive>>),
            enum_value: Arc::new(keep_right::<Node<ast::EnumValueDefinition>>),
            union_member: Arc::new(keep_right::<Name>),
            scalar: Arc::new(prefer_right_scalar),
        }
    }
}

impl ConflictResolvers {
    pub fn with_field<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Name, &FieldNode, &FieldNode) -> FieldNode + Send + Sync + 'static,
    {
        self.field = Arc::new(resolver);
        self
    }

    pub fn with_directive<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Name, &Node<ast::Directive>, &Node<ast::Directive>) -> Node<ast::Directive>
            + Send
            + Sync
            + 'static,
    {
        self.directive = Arc::new(resolver);
        self
    }

    pub fn with_enum_value<F>(mut self, resolver: F) -> Self
    where
        F: Fn(
                &Name,
                &Node<ast::EnumValueDefinition>,
                &Node<ast::EnumValueDefinition>,
            ) -> Node<ast::EnumValueDefinition>
            + Send
            + Sync
            + 'static,
    {
        self.enum_value = Arc::new(resolver);
        self
    }

    pub fn with_union_member<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Name, &Name, &Name) -> Name + Send + Sync + 'static,
    {
        self.union_member = Arc::new(resolver);
        self
    }

    pub fn with_scalar<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Name, Option<&ScalarConfig>, Option<&ScalarConfig>) -> Option<ScalarConfig>
            + Send
            + Sync
            + 'static,
    {
        self.scalar = Arc::new(resolver);
        self
    }

    pub fn field(&self, type_name: &Name, left: &FieldNode, right: &FieldNode) -> FieldNode {
        (self.field)(type_name, left, right)
    }

    pub fn directive(
        &self,
        owner: &Name,
        left: &Node<ast::Directive>,
        right: &Node<ast::Directive>,
    ) -> Node<ast::Directive> {
        (self.directive)(owner, left, right)
    }

    pub fn enum_value(
        &self,
        type_name: &Name,
        left: &Node<ast::EnumValueDefinition>,
        right: &Node<ast::EnumValueDefinition>,
    ) -> Node<ast::EnumValueDefinition> {
        (self.enum_value)(type_name, left, right)
    }

    pub fn union_member(&self, type_name: &Name, left: &Name, right: &Name) -> Name {
        (self.union_member)(type_name, left, right)
    }

    pub fn scalar(
        &self,
        type_name: &Name,
        left: Option<&ScalarConfig>,
        right: Option<&ScalarConfig>,
    ) -> Option<ScalarConfig> {
        (self.scalar)(type_name, left, right)
    }
}

impl fmt::Debug for ConflictResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConflictResolvers")
    }
}

/// Options of [`Schemata::merge`](crate::Schemata::merge).
#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub conflict_resolvers: ConflictResolvers,
    /// Applied in order to the call arguments of every merged resolver.
    pub resolver_injectors: Vec<ResolverInjector>,
    /// Wrap every merged resolver so it sees the merged schema.
    pub inject_merged_schema: bool,
    /// Bind the default field resolver to fields that have none.
    pub create_missing_resolvers: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeConfig::default().into()
    }
}

impl From<MergeConfig> for MergeOptions {
    fn from(config: MergeConfig) -> Self {
        Self {
            conflict_resolvers: ConflictResolvers::default(),
            resolver_injectors: Vec::new(),
            inject_merged_schema: config.inject_merged_schema,
            create_missing_resolvers: config.create_missing_resolvers,
        }
    }
}

impl MergeOptions {
    pub fn with_conflict_resolvers(mut self, conflict_resolvers: ConflictResolvers) -> Self {
        self.conflict_resolvers = conflict_resolvers;
        self
    }

    pub fn with_injector(mut self, injector: ResolverInjector) -> Self {
        self.resolver_injectors.push(injector);
        self
    }
}
