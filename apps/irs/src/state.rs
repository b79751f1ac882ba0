use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoint::EndpointConfig;
use crate::errors::AssemblyError;
use crate::llm_client::TextGenerator;

/// Path segments owned by fixed routes.
const RESERVED_PATHS: &[&str] = &["health"];

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Assembled endpoints keyed by path segment. Read-only after startup.
    pub endpoints: Arc<HashMap<String, Arc<EndpointConfig>>>,
    /// Pluggable text generator. Default: the Anthropic `LlmClient`.
    pub generator: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(
        endpoints: Vec<EndpointConfig>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, AssemblyError> {
        let mut by_name = HashMap::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let name = endpoint.endpoint_name.to_string();
            if RESERVED_PATHS.contains(&name.as_str()) {
                return Err(AssemblyError::Config(format!("endpoint name '{name}' is reserved")));
            }
            if by_name.insert(name.clone(), Arc::new(endpoint)).is_some() {
                return Err(AssemblyError::Config(format!(
                    "endpoint '{name}' is configured more than once"
                )));
            }
        }
        Ok(Self {
            endpoints: Arc::new(by_name),
            generator,
        })
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<EndpointConfig>> {
        self.endpoints.get(name).cloned()
    }
}
