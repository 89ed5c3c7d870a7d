use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::BoxError;

type ValueFn = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;
type LiteralFn = Arc<dyn Fn(&ast::Value) -> Result<Value, BoxError> + Send + Sync>;

/// Scalar configurations keyed by scalar type name.
pub type ScalarConfigs = IndexMap<Name, ScalarConfig>;

/// Runtime behavior of a custom scalar.
#[derive(Clone, Default)]
pub struct ScalarConfig {
    serialize: Option<ValueFn>,
    parse_value: Option<ValueFn>,
    parse_literal: Option<LiteralFn>,
}

impl ScalarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serialize<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    pub fn with_parse_value<F>(mut self, parse_value: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.parse_value = Some(Arc::new(parse_value));
        self
    }

    pub fn with_parse_literal<F>(mut self, parse_literal: F) -> Self
    where
        F: Fn(&ast::Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.parse_literal = Some(Arc::new(parse_literal));
        self
    }

    /// Whether any of the three functions is set.
    pub fn is_configured(&self) -> bool {
        self.serialize.is_some() || self.parse_value.is_some() || self.parse_literal.is_some()
    }

    /// Serializes an internal value; values pass through unchanged without a serializer.
    pub fn serialize(&self, value: &Value) -> Result<Value, BoxError> {
        match &self.serialize {
            Some(serialize) => serialize(value),
            None => Ok(value.clone()),
        }
    }

    pub fn parse_value(&self, value: &Value) -> Result<Value, BoxError> {
        match &self.parse_value {
            Some(parse_value) => parse_value(value),
            None => Ok(value.clone()),
        }
    }

    pub fn parse_literal(&self, literal: &ast::Value) -> Result<Value, BoxError> {
        match &self.parse_literal {
            Some(parse_literal) => parse_literal(literal),
            None => Err(format!("no literal parser for {literal}").into()),
        }
    }
}

impl fmt::Debug for ScalarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarConfig")
            .field("serialize", &self.serialize.is_some())
            .field("parse_value", &self.parse_value.is_some())
            .field("parse_literal", &self.parse_literal.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unset_functions_pass_values_through() {
        let config = ScalarConfig::new();
        assert!(!config.is_configured());
        assert_eq!(config.serialize(&json!(1)).unwrap(), json!(1));
        assert!(config.parse_literal(&ast::Value::Int(3.into())).is_err());
    }

    #[test]
    fn configured_functions_are_used() {
        let config = ScalarConfig::new()
            .with_serialize(|value| Ok(json!(value.to_string())))
            .with_parse_literal(|literal| Ok(json!(literal.to_string())));
        assert!(config.is_configured());
        assert_eq!(config.serialize(&json!(1)).unwrap(), json!("1"));
        assert_eq!(
            config.parse_literal(&ast::Value::Boolean(true)).unwrap(),
            json!("true")
        );
    }
}
