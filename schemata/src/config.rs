//! Serializable merge configuration.
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SchemataError;

fn default_inject_merged_schema() -> bool {
    true
}

/// The serializable part of [`MergeOptions`](crate::merge::MergeOptions).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct MergeConfig {
    /// Wrap every merged resolver so that it sees the merged schema; defaults to true
    #[serde(default = "default_inject_merged_schema")]
    #[schemars(default = "default_inject_merged_schema")]
    pub inject_merged_schema: bool,

    /// Bind the default field resolver to fields without a resolver
    pub create_missing_resolvers: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            inject_merged_schema: default_inject_merged_schema(),
            create_missing_resolvers: false,
        }
    }
}

impl MergeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemataError> {
        serde_yaml::from_str(yaml).map_err(|error| SchemataError::Config {
            message: error.to_string(),
        })
    }
}
