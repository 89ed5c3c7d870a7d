//! Loading SDL files as importable modules.
use std::path::Path;

use apollo_compiler::ast::Document;
use itertools::Itertools;

use crate::error::SchemataError;
use crate::resolver::map::ResolverMap;
use crate::schemata::Schemata;

/// File extensions recognised as SDL.
pub const SDL_EXTENSIONS: &[&str] = &["graphql", "gql", "sdl", "graphqls", "typedefs"];

/// SDL text turned into everything a consumer may want to import from it.
#[derive(Clone, Debug)]
pub struct GraphQLModule {
    pub document: Document,
    pub schemata: Schemata,
    /// Normalized SDL.
    pub sdl: String,
    /// SDL as it was read.
    pub type_defs: String,
    pub resolvers: Option<ResolverMap>,
}

impl GraphQLModule {
    /// Builds a module from raw SDL text and the resolvers exported alongside it.
    pub fn from_source(
        text: impl Into<String>,
        resolvers: Option<ResolverMap>,
    ) -> Result<Self, SchemataError> {
        let type_defs = text.into();
        let mut schemata = Schemata::new(type_defs.as_str())?;
        if let Some(resolvers) = &resolvers {
            schemata.set_resolvers(resolvers.clone());
        }
        Ok(Self {
            document: schemata.document()?,
            sdl: schemata.sdl().to_string(),
            schemata,
            type_defs,
            resolvers,
        })
    }

    /// Reads the SDL file at `path`.
    pub fn load(
        path: impl AsRef<Path>,
        resolvers: Option<ResolverMap>,
    ) -> Result<Self, SchemataError> {
        let path = path.as_ref();
        let module_error = |reason: String| SchemataError::ModuleLoad {
            path: path.display().to_string(),
            reason,
        };
        let recognised = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| SDL_EXTENSIONS.contains(&extension));
        if !recognised {
            return Err(module_error(format!(
                "expected one of the extensions {}",
                SDL_EXTENSIONS
                    .iter()
                    .map(|extension| format!(".{extension}"))
                    .join(", ")
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|error| module_error(error.to_string()))?;
        tracing::debug!(path = %path.display(), "loaded SDL module");
        Self::from_source(text, resolvers)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::resolver::Resolver;

    #[test]
    fn from_source_exposes_every_view() {
        let module = GraphQLModule::from_source(
            "\ntype Query { peep: String }\n",
            Some(ResolverMap::new().with("peep", Resolver::from_fn(|_| Ok(Value::Null)))),
        )
        .unwrap();
        assert_eq!(module.sdl, "type Query { peep: String }");
        assert_eq!(module.type_defs, "\ntype Query { peep: String }\n");
        assert_eq!(module.document.definitions.len(), 1);
        assert!(module.schemata.resolvers().is_some());
    }

    #[test]
    fn load_rejects_unknown_extensions() {
        let error = GraphQLModule::load("schema.json", None).unwrap_err();
        assert!(matches!(error, SchemataError::ModuleLoad { .. }));
    }
}
