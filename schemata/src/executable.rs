use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use indexmap::IndexMap;

use crate::resolver::Resolver;
use crate::resolver::ResolverCall;
use crate::resolver::ResolverResult;
use crate::resolver::map::ResolverEntry;
use crate::resolver::map::ResolverMap;
use crate::scalar::ScalarConfig;
use crate::scalar::ScalarConfigs;

/// A validated schema with resolvers bound to its fields.
///
/// Without bound resolvers this is a plain type schema; [`ExecutableSchema::bind_resolvers`]
/// turns it executable.
#[derive(Clone)]
pub struct ExecutableSchema {
    schema: Arc<Valid<Schema>>,
    resolvers: IndexMap<Name, IndexMap<Name, Resolver>>,
    scalars: ScalarConfigs,
    executable: bool,
}

impl ExecutableSchema {
    pub fn new(schema: Valid<Schema>) -> Self {
        Self {
            schema: Arc::new(schema),
            resolvers: IndexMap::new(),
            scalars: ScalarConfigs::new(),
            executable: false,
        }
    }

    pub fn schema(&self) -> &Arc<Valid<Schema>> {
        &self.schema
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Root operation types defined by the schema, in query, mutation, subscription order.
    pub fn root_types(&self) -> Vec<(OperationType, Name)> {
        [
            OperationType::Query,
            OperationType::Mutation,
            OperationType::Subscription,
        ]
        .into_iter()
        .filter_map(|operation| {
            self.schema
                .root_operation(operation)
                .map(|name| (operation, name.clone()))
        })
        .collect()
    }

    fn is_root_type(&self, type_name: &Name) -> bool {
        self.root_types().iter().any(|(_, root)| root == type_name)
    }

    /// Binds the resolvers of `resolvers` to the fields of the schema and flags it
    /// executable.
    ///
    /// A `[type, field]` entry wins over a flat `field` entry, which only applies to root
    /// operation types. Entries naming no field of the schema are ignored.
    pub fn bind_resolvers(&mut self, resolvers: &ResolverMap) {
        let schema = self.schema.clone();
        for (type_name, ty) in schema.types.iter().filter(|(_, ty)| !ty.is_built_in()) {
            let fields = match ty {
                ExtendedType::Object(object) => object.fields.keys(),
                ExtendedType::Interface(interface) => interface.fields.keys(),
                _ => continue,
            };
            let is_root = self.is_root_type(type_name);
            for field_name in fields {
                let resolver = resolvers.resolver(type_name, field_name).or_else(|| {
                    if !is_root {
                        return None;
                    }
                    match resolvers.get(field_name) {
                        Some(ResolverEntry::Resolver(resolver)) => Some(resolver),
                        _ => None,
                    }
                });
                if let Some(resolver) = resolver {
                    self.bind(type_name.clone(), field_name.clone(), resolver.clone());
                }
            }
        }
        tracing::debug!(bound = self.resolver_count(), "bound resolvers to schema");
        self.executable = true;
    }

    pub fn bind(&mut self, type_name: Name, field_name: Name, resolver: Resolver) {
        self.resolvers
            .entry(type_name)
            .or_default()
            .insert(field_name, resolver);
    }

    pub fn resolver(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.resolvers.get(type_name)?.get(field_name)
    }

    pub fn resolver_count(&self) -> usize {
        self.resolvers.values().map(IndexMap::len).sum()
    }

    pub fn scalars(&self) -> &ScalarConfigs {
        &self.scalars
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarConfig> {
        self.scalars.get(name)
    }

    /// Attaches `config` when the schema defines a scalar named `name`.
    pub fn set_scalar(&mut self, name: Name, config: ScalarConfig) -> bool {
        let defined = matches!(self.schema.types.get(&name), Some(ExtendedType::Scalar(_)));
        if defined {
            self.scalars.insert(name, config);
        } else {
            tracing::debug!(scalar = %name, "schema has no such scalar, configuration dropped");
        }
        defined
    }

    /// Runs the resolver bound to `type_name.field_name`, or the default field resolver.
    ///
    /// `info` is filled in when the call does not carry it yet, and the call sees this
    /// schema unless something already installed one.
    pub async fn resolve(
        &self,
        type_name: &str,
        field_name: &str,
        mut call: ResolverCall,
    ) -> ResolverResult {
        if call.info.parent_type.is_empty() {
            call.info.parent_type = type_name.to_string();
        }
        if call.info.field_name.is_empty() {
            call.info.field_name = field_name.to_string();
        }
        if call.info.schema().is_none() {
            call.info.set_schema(self.schema.clone());
        }
        match self.resolver(type_name, field_name) {
            Some(resolver) => resolver.invoke(call).await,
            None => Resolver::default_field_resolver().invoke(call).await,
        }
    }

    /// The bound resolvers as a resolver map keyed by type and field.
    pub fn to_resolver_map(&self) -> ResolverMap {
        self.resolvers
            .iter()
            .fold(ResolverMap::new(), |map, (type_name, fields)| {
                map.with_type(
                    type_name.as_str(),
                    fields
                        .iter()
                        .map(|(field, resolver)| (field.as_str(), resolver.clone())),
                )
            })
    }
}

impl fmt::Debug for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchema")
            .field("types", &self.schema.types.len())
            .field("resolvers", &self.resolvers)
            .field("scalars", &self.scalars)
            .field("executable", &self.executable)
            .finish()
    }
}
