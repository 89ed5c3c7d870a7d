use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use parking_lot::RwLock;

use crate::error::SchemataError;
use crate::executable::ExecutableSchema;
use crate::merge::ConflictResolvers;
use crate::merge::MergeOptions;
use crate::merge::pare::pare_documents;
use crate::merge::sdl::merge_documents;
use crate::merge::sdl::merge_scalar_configs;
use crate::resolver::Resolver;
use crate::resolver::extended::ExtendedResolver;
use crate::resolver::history::ExtendedResolverMap;
use crate::resolver::map::ResolverMap;
use crate::resolver::walk;
use crate::scalar::ScalarConfig;
use crate::scalar::ScalarConfigs;
use crate::source::SchemaSource;
use crate::source::normalize_source;

const SOURCE_PATH: &str = "schema.graphql";

/// SDL text together with the resolvers, scalar behavior and merge history that go
/// with it.
///
/// The executable schema is built lazily and cached. Changing resolvers or scalars
/// clears the cache, so the cached schema never disagrees with them.
pub struct Schemata {
    sdl: String,
    resolvers: Option<ResolverMap>,
    scalars: ScalarConfigs,
    prev_resolver_maps: Vec<ExtendedResolverMap>,
    schema: RwLock<Option<Arc<ExecutableSchema>>>,
}

impl Schemata {
    /// Wraps `source`.
    ///
    /// A [`Schemata`] source is returned as is. A schema object source is kept as the
    /// cached type schema when it is valid.
    pub fn new(source: impl Into<SchemaSource>) -> Result<Self, SchemataError> {
        let source = source.into();
        if let SchemaSource::Schemata(schemata) = source {
            return Ok(*schemata);
        }
        let sdl = normalize_source(&source)?;
        let cached = source
            .as_schema()
            .and_then(|schema| schema.clone().validate().ok())
            .map(|schema| Arc::new(ExecutableSchema::new(schema)));
        Ok(Self {
            sdl,
            resolvers: None,
            scalars: ScalarConfigs::new(),
            prev_resolver_maps: Vec::new(),
            schema: RwLock::new(cached),
        })
    }

    /// Wraps `source` together with an explicitly supplied resolver map.
    ///
    /// When `source` is a schema object and `resolvers` is not empty the resolvers are
    /// bound right away and the resulting executable schema is cached.
    pub fn from_parts(
        source: impl Into<SchemaSource>,
        resolvers: ResolverMap,
    ) -> Result<Self, SchemataError> {
        let source = source.into();
        let bind_now = source.as_schema().is_some() && !resolvers.is_empty();
        let mut schemata = Self::new(source)?;
        if bind_now {
            let mut executable = ExecutableSchema::new(schemata.type_schema()?);
            executable.bind_resolvers(&resolvers);
            schemata.resolvers = Some(resolvers);
            *schemata.schema.get_mut() = Some(Arc::new(executable));
        } else {
            schemata.set_resolvers(resolvers);
        }
        Ok(schemata)
    }

    /// Same schemata with `resolvers` attached.
    pub fn with_resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.set_resolvers(resolvers);
        self
    }

    /// Replaces the resolvers and clears the cached schema. An empty map removes them.
    pub fn set_resolvers(&mut self, resolvers: ResolverMap) {
        self.resolvers = (!resolvers.is_empty()).then_some(resolvers);
        self.clear_schema();
    }

    /// Same schemata with `config` attached to the scalar `name`.
    pub fn with_scalar(mut self, name: Name, config: ScalarConfig) -> Self {
        self.scalars.insert(name, config);
        self.clear_schema();
        self
    }

    /// Drops the cached schema; the next [`Schemata::schema`] call rebuilds it.
    pub fn clear_schema(&self) {
        *self.schema.write() = None;
    }

    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// Parses the SDL.
    pub fn document(&self) -> Result<ast::Document, SchemataError> {
        if self.sdl.is_empty() {
            return Ok(ast::Document::new());
        }
        Ok(ast::Document::parse(self.sdl.as_str(), SOURCE_PATH)?)
    }

    /// Builds and validates the schema the SDL describes, without resolvers.
    ///
    /// Type extensions without a base definition are applied as definitions.
    pub fn type_schema(&self) -> Result<Valid<Schema>, SchemataError> {
        let schema = Schema::builder()
            .adopt_orphan_extensions()
            .parse(self.sdl.as_str(), SOURCE_PATH)
            .build()?;
        Ok(schema.validate()?)
    }

    /// The cached schema, if one was built.
    pub fn cached_schema(&self) -> Option<Arc<ExecutableSchema>> {
        self.schema.read().clone()
    }

    /// The executable schema, built from the SDL and resolvers unless a usable one is
    /// cached.
    pub fn schema(&self) -> Result<Arc<ExecutableSchema>, SchemataError> {
        if let Some(cached) = self.schema.read().as_ref() {
            if self.resolvers.is_none() || cached.is_executable() {
                tracing::trace!("using cached schema");
                return Ok(cached.clone());
            }
        }
        tracing::debug!(resolvers = self.resolvers.is_some(), "building schema");
        let mut executable = ExecutableSchema::new(self.type_schema()?);
        for (name, config) in &self.scalars {
            executable.set_scalar(name.clone(), config.clone());
        }
        if let Some(resolvers) = &self.resolvers {
            executable.bind_resolvers(resolvers);
        }
        let executable = Arc::new(executable);
        *self.schema.write() = Some(executable.clone());
        Ok(executable)
    }

    /// The stored resolver map, else the resolvers bound to the cached executable schema.
    pub fn resolvers(&self) -> Option<ResolverMap> {
        if let Some(resolvers) = &self.resolvers {
            return Some(resolvers.clone());
        }
        self.schema
            .read()
            .as_ref()
            .filter(|schema| schema.is_executable() && schema.resolver_count() > 0)
            .map(|schema| schema.to_resolver_map())
    }

    pub fn scalars(&self) -> &ScalarConfigs {
        &self.scalars
    }

    /// Snapshots of every contributor of the merges that led to this schemata.
    pub fn prev_resolver_maps(&self) -> &[ExtendedResolverMap] {
        &self.prev_resolver_maps
    }

    pub fn root_types(&self) -> Result<Vec<(OperationType, Name)>, SchemataError> {
        Ok(self.schema()?.root_types())
    }

    /// Calls `visitor` with every field of every object and interface type.
    pub fn for_each_field<F>(&self, mut visitor: F) -> Result<(), SchemataError>
    where
        F: FnMut(&Name, &Name, &ast::FieldDefinition),
    {
        let schema = self.schema()?;
        let types = schema.schema().types.iter();
        for (type_name, ty) in types.filter(|(_, ty)| !ty.is_built_in()) {
            let fields = match ty {
                ExtendedType::Object(object) => &object.fields,
                ExtendedType::Interface(interface) => &interface.fields,
                _ => continue,
            };
            for (field_name, field) in fields {
                visitor(type_name, field_name, field);
            }
        }
        Ok(())
    }

    /// Walks the resolvers; see [`walk::walk_resolver_map`].
    pub fn walk_resolver_map<V>(
        &self,
        visitor: V,
        wrap_non_function_leaves: bool,
    ) -> Result<ResolverMap, SchemataError>
    where
        V: FnMut(&str, &Resolver, &[String], &ResolverMap) -> Option<Resolver>,
    {
        let resolvers = self.resolvers().unwrap_or_default();
        Ok(walk::walk_resolver_map(
            &resolvers,
            visitor,
            wrap_non_function_leaves,
            &[],
        )?)
    }

    /// Merges the SDL of `other` into this one.
    ///
    /// Resolvers are not carried over; scalar configurations are, going through the
    /// scalar conflict resolver.
    pub fn merge_sdl(
        &self,
        other: impl Into<SchemaSource>,
        conflict_resolvers: &ConflictResolvers,
    ) -> Result<Schemata, SchemataError> {
        let other = Schemata::new(other)?;
        let merged = merge_documents(&self.document()?, &other.document()?, conflict_resolvers);
        let scalars = merge_scalar_configs(
            &self.scalars,
            &other.scalars,
            &merged,
            conflict_resolvers,
        );
        let mut schemata = Schemata::new(merged)?;
        schemata.scalars = scalars;
        Ok(schemata)
    }

    /// Merges `other` into this schemata, SDL and resolvers alike.
    ///
    /// The merged resolvers are folded from the whole history of both sides plus a
    /// fresh snapshot of each, later contributors winning. Depending on `options` the
    /// default field resolver fills unbound fields, every resolver is made to see the
    /// merged schema, and the configured injectors are applied.
    pub fn merge(&self, other: &Schemata, options: &MergeOptions) -> Result<Schemata, SchemataError> {
        let mut merged = self.merge_sdl(other, &options.conflict_resolvers)?;

        let history: Vec<ExtendedResolverMap> = self
            .prev_resolver_maps
            .iter()
            .chain(&other.prev_resolver_maps)
            .cloned()
            .chain([
                ExtendedResolverMap::capture(self),
                ExtendedResolverMap::capture(other),
            ])
            .collect();
        let mut resolvers = ExtendedResolverMap::fold(&history);

        if options.create_missing_resolvers {
            let type_schema = merged.type_schema()?;
            add_missing_resolvers(&mut resolvers, &type_schema);
        }
        if !options.resolver_injectors.is_empty() {
            resolvers = walk::walk_resolver_map(
                &resolvers,
                |_, resolver, _, _| Some(resolver.clone().with_injectors(&options.resolver_injectors)),
                true,
                &[],
            )?;
        }
        if options.inject_merged_schema && !resolvers.is_empty() {
            let type_schema = Arc::new(merged.type_schema()?);
            resolvers = walk::walk_resolver_map(
                &resolvers,
                |_, resolver, _, _| {
                    Some(
                        ExtendedResolver::schema_injector(
                            resolver.clone(),
                            type_schema.clone(),
                            None,
                            None,
                        )
                        .into(),
                    )
                },
                true,
                &[],
            )?;
        }

        tracing::debug!(
            history = history.len(),
            resolvers = resolvers.resolver_count(),
            "merged schemata"
        );
        merged.prev_resolver_maps = history;
        merged.set_resolvers(resolvers);
        Ok(merged)
    }

    /// Removes from this schemata everything `other` defines, with the resolvers of the
    /// removed fields.
    ///
    /// The removed resolvers are dropped from every history snapshot too, so a later
    /// merge cannot bring them back.
    pub fn pare_sdl(&self, other: impl Into<SchemaSource>) -> Result<Schemata, SchemataError> {
        let other = Schemata::new(other)?;
        let (left, right) = (self.document()?, other.document()?);
        let resolvers = self.resolvers().unwrap_or_default();
        let (document, resolvers) = pare_documents(&left, &right, &resolvers);
        let prev_resolver_maps = self
            .prev_resolver_maps
            .iter()
            .map(|snapshot| ExtendedResolverMap {
                resolvers: pare_documents(&left, &right, &snapshot.resolvers).1,
                ..snapshot.clone()
            })
            .collect();
        let scalars = self
            .scalars
            .iter()
            .filter(|(name, _)| {
                document.definitions.iter().any(|definition| {
                    matches!(definition, ast::Definition::ScalarTypeDefinition(scalar) if &scalar.name == *name)
                })
            })
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect();
        Ok(Schemata {
            sdl: document.to_string().trim().to_string(),
            resolvers: (!resolvers.is_empty()).then_some(resolvers),
            scalars,
            prev_resolver_maps,
            schema: RwLock::new(None),
        })
    }

    /// Whether the SDL parses.
    pub fn is_valid_sdl(&self) -> bool {
        !self.sdl.is_empty() && self.document().is_ok()
    }

    /// Whether the SDL builds a valid schema.
    pub fn is_valid_schema(&self) -> bool {
        self.type_schema().is_ok()
    }
}

fn add_missing_resolvers(resolvers: &mut ResolverMap, schema: &Schema) {
    let roots: Vec<&Name> = [
        OperationType::Query,
        OperationType::Mutation,
        OperationType::Subscription,
    ]
    .into_iter()
    .filter_map(|operation| schema.root_operation(operation))
    .collect();
    for (type_name, ty) in schema.types.iter().filter(|(_, ty)| !ty.is_built_in()) {
        let ExtendedType::Object(object) = ty else {
            continue;
        };
        for field_name in object.fields.keys() {
            let bound = resolvers.resolver(type_name, field_name).is_some()
                || (roots.contains(&type_name) && resolvers.get(field_name).is_some());
            if !bound {
                resolvers.set_at(
                    &[type_name.as_str()],
                    field_name.as_str(),
                    Resolver::default_field_resolver(),
                );
            }
        }
    }
}

impl Clone for Schemata {
    fn clone(&self) -> Self {
        Self {
            sdl: self.sdl.clone(),
            resolvers: self.resolvers.clone(),
            scalars: self.scalars.clone(),
            prev_resolver_maps: self.prev_resolver_maps.clone(),
            schema: RwLock::new(self.cached_schema()),
        }
    }
}

impl fmt::Debug for Schemata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schemata")
            .field("sdl", &self.sdl)
            .field("resolvers", &self.resolvers)
            .field("scalars", &self.scalars)
            .field("prev_resolver_maps", &self.prev_resolver_maps.len())
            .field("cached", &self.schema.read().is_some())
            .finish()
    }
}

impl fmt::Display for Schemata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sdl)
    }
}

impl AsRef<str> for Schemata {
    fn as_ref(&self) -> &str {
        &self.sdl
    }
}

/// Two schematas are equal when their SDL text is.
impl PartialEq for Schemata {
    fn eq(&self, other: &Self) -> bool {
        self.sdl == other.sdl
    }
}

impl Eq for Schemata {}

impl PartialEq<str> for Schemata {
    fn eq(&self, other: &str) -> bool {
        self.sdl == other
    }
}

impl PartialEq<&str> for Schemata {
    fn eq(&self, other: &&str) -> bool {
        self.sdl == *other
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use serde_json::json;

    use super::*;
    use crate::resolver::ResolverCall;

    fn noop() -> Resolver {
        Resolver::from_fn(|_| Ok(Value::Null))
    }

    #[test]
    fn new_normalizes_and_rejects_empty_sources() {
        let schemata = Schemata::new("\n type Query { peep: String }\n").unwrap();
        assert_eq!(schemata, "type Query { peep: String }");
        assert!(matches!(
            Schemata::new("   "),
            Err(SchemataError::Normalization(_))
        ));
    }

    #[test]
    fn wrapping_a_schemata_returns_it() {
        let schemata = Schemata::new("type Query { peep: String }")
            .unwrap()
            .with_resolvers(ResolverMap::new().with("peep", noop()));
        let wrapped = Schemata::new(&schemata).unwrap();
        assert_eq!(wrapped, schemata);
        assert!(wrapped.resolvers().is_some());
    }

    #[test]
    fn schema_is_cached_until_resolvers_change() {
        let mut schemata = Schemata::new("type Query { peep: String }").unwrap();
        let first = schemata.schema().unwrap();
        assert!(!first.is_executable());
        assert!(Arc::ptr_eq(&first, &schemata.schema().unwrap()));

        schemata.set_resolvers(ResolverMap::new().with("peep", noop()));
        assert!(schemata.cached_schema().is_none());
        let rebuilt = schemata.schema().unwrap();
        assert!(rebuilt.is_executable());
        assert!(rebuilt.resolver("Query", "peep").is_some());
        assert!(Arc::ptr_eq(&rebuilt, &schemata.schema().unwrap()));
    }

    #[test]
    fn explicit_schema_and_resolvers_are_executable_right_away() {
        let schema = Schema::parse_and_validate("type Query { peep: String }", "test.graphql")
            .unwrap();
        let schemata =
            Schemata::from_parts(schema, ResolverMap::new().with("peep", noop())).unwrap();
        let cached = schemata.cached_schema().unwrap();
        assert!(cached.is_executable());
        assert!(Arc::ptr_eq(&cached, &schemata.schema().unwrap()));
    }

    #[test]
    fn resolvers_fall_back_to_the_executable_schema() {
        let schema = Schema::parse_and_validate("type Query { peep: String }", "test.graphql")
            .unwrap();
        let peep = noop();
        let mut schemata =
            Schemata::from_parts(schema, ResolverMap::new().with("peep", peep.clone())).unwrap();
        schemata.resolvers = None;
        let extracted = schemata.resolvers().unwrap();
        assert!(extracted.resolver("Query", "peep").unwrap().ptr_eq(&peep));
    }

    #[test]
    fn orphan_extensions_are_applied() {
        let schemata = Schemata::new("extend type Query { peep: String }").unwrap();
        let schema = schemata.type_schema().unwrap();
        assert!(schema.types.contains_key("Query"));
    }

    #[test]
    fn interrogation_swallows_failures() {
        let broken = Schemata::new("type Query {").unwrap();
        assert!(!broken.is_valid_sdl());
        assert!(!broken.is_valid_schema());
        let dangling = Schemata::new("type Query { peep: Person }").unwrap();
        assert!(dangling.is_valid_sdl());
        assert!(!dangling.is_valid_schema());
        assert!(dangling.schema().is_err());
    }

    #[test]
    fn for_each_field_visits_object_and_interface_fields() {
        let schemata = Schemata::new(
            "interface Named { name: String } type Person implements Named { name: String age: Int } type Query { me: Person }",
        )
        .unwrap();
        let mut seen = Vec::new();
        schemata
            .for_each_field(|type_name, field_name, _| seen.push(format!("{type_name}.{field_name}")))
            .unwrap();
        assert_eq!(
            seen,
            vec!["Named.name", "Person.name", "Person.age", "Query.me"]
        );
    }

    #[test]
    fn root_types_follow_the_schema_definition() {
        let schemata =
            Schemata::new("schema { query: Root } type Root { a: String } type M { b: String }")
                .unwrap();
        let roots = schemata.root_types().unwrap();
        assert_eq!(roots, vec![(OperationType::Query, Name::new("Root").unwrap())]);
    }

    #[test]
    fn scalars_are_attached_when_built() {
        let schemata = Schemata::new("scalar Date type Query { today: Date }")
            .unwrap()
            .with_scalar(
                Name::new("Date").unwrap(),
                ScalarConfig::new().with_serialize(|value| Ok(json!(format!("{value}!")))),
            );
        let schema = schemata.schema().unwrap();
        let date = schema.scalar("Date").unwrap();
        assert_eq!(date.serialize(&json!(1)).unwrap(), json!("1!"));
    }

    #[tokio::test]
    async fn walk_wraps_values_of_the_stored_map() {
        let schemata = Schemata::new("type Query { peep: String }")
            .unwrap()
            .with_resolvers(ResolverMap::new().with("peep", json!("constant")));
        assert!(schemata.walk_resolver_map(walk::keep_resolver, false).is_err());
        let walked = schemata.walk_resolver_map(walk::keep_resolver, true).unwrap();
        let peep = walked.get("peep").unwrap().as_resolver().unwrap();
        assert_eq!(
            peep.invoke(ResolverCall::default()).await.unwrap(),
            json!("constant")
        );
    }

    #[test]
    fn pare_keeps_remaining_scalars_and_resolvers() {
        let schemata = Schemata::new("scalar Date scalar Time type Query { a: Date b: Time }")
            .unwrap()
            .with_scalar(Name::new("Date").unwrap(), ScalarConfig::new())
            .with_scalar(Name::new("Time").unwrap(), ScalarConfig::new())
            .with_resolvers(ResolverMap::new().with("a", noop()).with("b", noop()));
        let pared = schemata
            .pare_sdl("scalar Time type Query { b: Time }")
            .unwrap();
        assert_eq!(pared.scalars().keys().map(Name::as_str).collect::<Vec<_>>(), vec!["Date"]);
        let resolvers = pared.resolvers().unwrap();
        assert!(resolvers.get("a").is_some());
        assert!(resolvers.get("b").is_none());
    }
}
