use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::endpoint::{EndpointName, IrsEndpointConfig};
use crate::llm_client::{ModelConfig, DEFAULT_MODEL};
use crate::recognition::{ContractOptions, InactiveIntentPolicy};

/// Where the endpoint's records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceKind {
    Memory { fixtures_dir: PathBuf },
    Postgres { database_url: String },
    Remote { base_url: String },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub irs_id: String,
    pub data_source: DataSourceKind,
    pub endpoint: IrsEndpointConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("Required environment variable '{key}' is not set"))
        };
        let flag = |key: &str| -> Result<bool> {
            match lookup(key).as_deref() {
                None | Some("") => Ok(false),
                Some(v) => parse_flag(v).with_context(|| format!("{key} must be a boolean")),
            }
        };

        let data_source = match lookup("IRS_DATA_SOURCE").as_deref().unwrap_or("memory") {
            "memory" => DataSourceKind::Memory {
                fixtures_dir: PathBuf::from(
                    lookup("IRS_FIXTURES_DIR").unwrap_or_else(|| "fixtures".to_string()),
                ),
            },
            "postgres" => DataSourceKind::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            "remote" => DataSourceKind::Remote {
                base_url: require("IRS_REMOTE_URL")?,
            },
            other => bail!("IRS_DATA_SOURCE must be memory, postgres or remote, got '{other}'"),
        };

        let inactive_intents = match lookup("IRS_INACTIVE_INTENTS").as_deref() {
            None | Some("") | Some("exclude") => InactiveIntentPolicy::Exclude,
            Some("deprioritize") => InactiveIntentPolicy::Deprioritize,
            Some(other) => {
                bail!("IRS_INACTIVE_INTENTS must be exclude or deprioritize, got '{other}'")
            }
        };

        let model = model_config(&lookup, "IRS_MODEL", "IRS_TEMPERATURE")?;
        let expansion_model =
            model_config(&lookup, "IRS_EXPANSION_MODEL", "IRS_EXPANSION_TEMPERATURE")?;

        let endpoint_name = lookup("IRS_ENDPOINT").unwrap_or_else(|| "query".to_string());
        let endpoint = IrsEndpointConfig {
            endpoint: EndpointName::new(endpoint_name).context("Invalid IRS_ENDPOINT")?,
            enable_auth: flag("IRS_ENABLE_AUTH")?,
            verbose: flag("IRS_VERBOSE")?,
            inactive_intents,
            contract: ContractOptions {
                need_more_info_ids: flag("IRS_NEED_MORE_INFO_IDS")?,
            },
            model,
            expansion_model,
            query_expansion: flag("IRS_QUERY_EXPANSION")?,
        };

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            irs_id: require("IRS_ID")?,
            data_source,
            endpoint,
        })
    }
}

/// `None` when neither the name nor the temperature key is set; a lone
/// temperature applies to the default model.
fn model_config<F>(lookup: &F, name_key: &str, temperature_key: &str) -> Result<Option<ModelConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let temperature = lookup(temperature_key)
        .map(|t| t.parse::<f32>())
        .transpose()
        .with_context(|| format!("{temperature_key} must be a number"))?;
    match (lookup(name_key), temperature) {
        (None, None) => Ok(None),
        (name, temperature) => Ok(Some(
            ModelConfig::new(name.unwrap_or_else(|| DEFAULT_MODEL.to_string()), temperature)
                .with_context(|| format!("Invalid {name_key} configuration"))?,
        )),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected true or false, got '{other}'"),
    }
}
