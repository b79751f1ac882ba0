//! Endpoint Config Assembler.
//!
//! Resolves an IRS record and everything it references through a
//! [`DataSource`], then produces the immutable [`EndpointConfig`] a server
//! serves. Assembly either completes or fails; there is no partial endpoint.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::ApiKeyStore;
use crate::data_sources::DataSource;
use crate::endpoint::EndpointName;
use crate::errors::{AssemblyError, EntityKind, ValidationError};
use crate::llm_client::ModelConfig;
use crate::models::Intent;
use crate::recognition::{
    compose_expansion_prompt, compose_prompt, select_intents, serialize_intents, ComposedPrompt,
    ContractOptions, ExpansionPrompt, InactiveIntentPolicy, OutputContract,
};

/// Deployment settings for one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct IrsEndpointConfig {
    pub endpoint: EndpointName,
    pub enable_auth: bool,
    /// Adds request metadata to every response.
    pub verbose: bool,
    pub inactive_intents: InactiveIntentPolicy,
    pub contract: ContractOptions,
    /// `None` leaves model choice to the generator.
    pub model: Option<ModelConfig>,
    /// Model for the query-expansion pass; falls back to `model`.
    pub expansion_model: Option<ModelConfig>,
    pub query_expansion: bool,
}

impl IrsEndpointConfig {
    pub fn new(endpoint: EndpointName) -> Self {
        Self {
            endpoint,
            enable_auth: false,
            verbose: false,
            inactive_intents: InactiveIntentPolicy::default(),
            contract: ContractOptions::default(),
            model: None,
            expansion_model: None,
            query_expansion: false,
        }
    }
}

/// A fully resolved, ready-to-serve endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub endpoint_name: EndpointName,
    pub irs_id: String,
    pub prompt: ComposedPrompt,
    pub contract: OutputContract,
    pub output_schema: Value,
    pub auth_enabled: bool,
    /// Present exactly when `auth_enabled` is set.
    pub api_key_store: Option<ApiKeyStore>,
    pub verbose: bool,
    pub model: Option<ModelConfig>,
    pub expansion_model: Option<ModelConfig>,
    pub expansion: Option<ExpansionPrompt>,
}

pub async fn assemble_endpoint_config(
    config: &IrsEndpointConfig,
    source: &dyn DataSource,
) -> Result<EndpointConfig, AssemblyError> {
    debug!(
        "Assembling endpoint '{}' from {} source",
        config.endpoint,
        source.kind()
    );

    let record = source.get_irs_record().await?;
    if !record.status.is_active() {
        return Err(AssemblyError::InactiveService(record.id));
    }

    let intents = source.get_intents(&record.intents).await?;
    check_intent_codes(&intents)?;
    for intent in intents.iter().filter(|i| i.irs_id != record.id) {
        warn!(
            "Intent '{}' belongs to IRS '{}' but is referenced by '{}'",
            intent.id, intent.irs_id, record.id
        );
    }

    let selected = select_intents(&intents, config.inactive_intents);
    if selected.is_empty() {
        return Err(AssemblyError::NoIntents(record.id));
    }

    let serialized = serialize_intents(&selected)?;
    let prompt = compose_prompt(&record.project_description, &serialized, &config.contract);
    let contract = OutputContract::new(&selected, config.contract);
    let expansion = config
        .query_expansion
        .then(|| compose_expansion_prompt(&record.project_description, &serialized));

    let api_key_store = if config.enable_auth {
        if record.api_keys.is_empty() {
            return Err(AssemblyError::NoApiKeys(record.id));
        }
        let keys = source.get_api_keys(&record.api_keys).await?;
        Some(ApiKeyStore::from_records(&keys))
    } else {
        None
    };

    info!(
        "Endpoint '{}' ready: IRS '{}', {} of {} intent(s), auth {}",
        config.endpoint,
        record.id,
        selected.len(),
        intents.len(),
        if config.enable_auth { "on" } else { "off" }
    );

    Ok(EndpointConfig {
        endpoint_name: config.endpoint.clone(),
        irs_id: record.id,
        output_schema: contract.schema(),
        prompt,
        contract,
        auth_enabled: config.enable_auth,
        api_key_store,
        verbose: config.verbose,
        model: config.model.clone(),
        expansion_model: config.expansion_model.clone(),
        expansion,
    })
}

/// Assembles endpoints in order; the first failure aborts the rest.
pub async fn assemble_all(
    configs: &[(IrsEndpointConfig, &dyn DataSource)],
) -> Result<Vec<EndpointConfig>, AssemblyError> {
    let mut endpoints = Vec::with_capacity(configs.len());
    for (config, source) in configs {
        endpoints.push(assemble_endpoint_config(config, *source).await?);
    }
    Ok(endpoints)
}

/// Two intents sharing a code would make a recognized response ambiguous.
fn check_intent_codes(intents: &[Intent]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for intent in intents {
        if !seen.insert(intent.intent_code.as_str()) {
            return Err(ValidationError::new(
                EntityKind::Intent,
                &intent.id,
                format!("duplicate intent_code '{}'", intent.intent_code),
            ));
        }
    }
    Ok(())
}
