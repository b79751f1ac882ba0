// Endpoint assembly and per-request recognition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AssemblyError;

pub mod assembler;
pub mod runner;

pub use assembler::{assemble_all, assemble_endpoint_config, EndpointConfig, IrsEndpointConfig};
pub use runner::{run_recognition, RecognitionError, RecognitionOutcome};

/// The path segment an endpoint is served under: non-empty, no whitespace,
/// no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointName(String);

impl EndpointName {
    pub fn new(name: impl Into<String>) -> Result<Self, AssemblyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AssemblyError::Config("endpoint name must not be empty".to_string()));
        }
        if name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(AssemblyError::Config(format!(
                "endpoint name '{name}' must not contain whitespace or '/'"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EndpointName {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EndpointName {
    type Error = AssemblyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EndpointName> for String {
    fn from(name: EndpointName) -> Self {
        name.0
    }
}
