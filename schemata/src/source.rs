use apollo_compiler::Schema;
use apollo_compiler::ast::Document;
use apollo_compiler::validation::Valid;

use crate::error::NormalizationError;
use crate::module::GraphQLModule;
use crate::schemata::Schemata;

/// Anything a [`Schemata`] can be built from.
#[derive(Clone, Debug)]
pub enum SchemaSource {
    Sdl(String),
    Document(Document),
    Schema(Box<Schema>),
    Schemata(Box<Schemata>),
}

impl SchemaSource {
    /// The schema object this source carries, if any.
    pub(crate) fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaSource::Schema(schema) => Some(schema),
            _ => None,
        }
    }
}

impl From<&str> for SchemaSource {
    fn from(sdl: &str) -> Self {
        SchemaSource::Sdl(sdl.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(sdl: String) -> Self {
        SchemaSource::Sdl(sdl)
    }
}

impl From<&String> for SchemaSource {
    fn from(sdl: &String) -> Self {
        SchemaSource::Sdl(sdl.clone())
    }
}

impl From<Document> for SchemaSource {
    fn from(document: Document) -> Self {
        SchemaSource::Document(document)
    }
}

impl From<Schema> for SchemaSource {
    fn from(schema: Schema) -> Self {
        SchemaSource::Schema(Box::new(schema))
    }
}

impl From<Valid<Schema>> for SchemaSource {
    fn from(schema: Valid<Schema>) -> Self {
        SchemaSource::Schema(Box::new(schema.into_inner()))
    }
}

impl From<Schemata> for SchemaSource {
    fn from(schemata: Schemata) -> Self {
        SchemaSource::Schemata(Box::new(schemata))
    }
}

impl From<&Schemata> for SchemaSource {
    fn from(schemata: &Schemata) -> Self {
        SchemaSource::Schemata(Box::new(schemata.clone()))
    }
}

impl From<&GraphQLModule> for SchemaSource {
    fn from(module: &GraphQLModule) -> Self {
        SchemaSource::Sdl(module.sdl.clone())
    }
}

/// Trimmed SDL text of `source`.
///
/// Normalizing text that already is normalized returns it unchanged.
pub fn normalize_source(source: &SchemaSource) -> Result<String, NormalizationError> {
    let sdl = match source {
        SchemaSource::Sdl(sdl) => sdl.trim().to_string(),
        SchemaSource::Document(document) => document.to_string().trim().to_string(),
        SchemaSource::Schema(schema) => schema.to_string().trim().to_string(),
        SchemaSource::Schemata(schemata) => schemata.sdl().to_string(),
    };
    if sdl.is_empty() {
        return Err(NormalizationError::Empty);
    }
    Ok(sdl)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::text("  type Query { peep: String }\n")]
    #[case::document_text("type Query {\n  peep: String\n}")]
    fn normalizing_is_idempotent(#[case] sdl: &str) {
        let once = normalize_source(&sdl.into()).unwrap();
        let twice = normalize_source(&once.clone().into()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, sdl.trim());
    }

    #[test]
    fn documents_and_schemas_are_printed() {
        let document = Document::parse("type Query { peep: String }", "test.graphql").unwrap();
        let printed = document.to_string().trim().to_string();
        assert_eq!(normalize_source(&document.into()).unwrap(), printed);

        let schema = Schema::parse("type Query { peep: String }", "test.graphql").unwrap();
        let sdl = normalize_source(&schema.into()).unwrap();
        assert!(sdl.contains("peep: String"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank(" \n\t ")]
    fn empty_sources_fail(#[case] sdl: &str) {
        assert_eq!(
            normalize_source(&sdl.into()),
            Err(NormalizationError::Empty)
        );
    }
}
