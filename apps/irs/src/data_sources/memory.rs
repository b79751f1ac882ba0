use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::data_sources::{in_request_order, DataSource};
use crate::errors::{DataSourceError, EntityKind, NotFoundError};
use crate::models::validation::parse_records;
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

pub const IRS_FILE: &str = "irs.json";
pub const INTENTS_FILE: &str = "intents.json";
pub const API_KEYS_FILE: &str = "api-keys.json";

/// Validated fixture sets, as loaded from disk or built in code.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub irs: Vec<IrsRecord>,
    pub intents: Vec<Intent>,
    pub api_keys: Vec<ApiKeyRecord>,
}

impl Fixtures {
    /// Loads `irs.json`, `intents.json` and `api-keys.json` (each a JSON
    /// array) from a directory. `api-keys.json` may be absent.
    pub fn load_dir(dir: &Path) -> Result<Self, DataSourceError> {
        let irs: Vec<IrsRecord> = parse_records(read_json(&dir.join(IRS_FILE))?)?;
        let intents: Vec<Intent> = parse_records(read_json(&dir.join(INTENTS_FILE))?)?;
        let api_keys_path = dir.join(API_KEYS_FILE);
        let api_keys: Vec<ApiKeyRecord> = if api_keys_path.exists() {
            parse_records(read_json(&api_keys_path)?)?
        } else {
            Vec::new()
        };

        info!(
            "Loaded fixtures from {}: {} IRS record(s), {} intent(s), {} API key(s)",
            dir.display(),
            irs.len(),
            intents.len(),
            api_keys.len()
        );
        Ok(Self {
            irs,
            intents,
            api_keys,
        })
    }
}

fn read_json(path: &Path) -> Result<Value, DataSourceError> {
    let text = fs::read_to_string(path)
        .map_err(|e| DataSourceError::Backend(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| DataSourceError::Backend(format!("Invalid JSON in {}: {e}", path.display())))
}

/// Static-fixture data source.
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    irs_id: String,
    irs: HashMap<String, IrsRecord>,
    intents: HashMap<String, Intent>,
    api_keys: HashMap<String, ApiKeyRecord>,
}

impl InMemoryDataSource {
    pub fn new(irs_id: impl Into<String>, fixtures: Fixtures) -> Self {
        Self {
            irs_id: irs_id.into(),
            irs: fixtures.irs.into_iter().map(|r| (r.id.clone(), r)).collect(),
            intents: fixtures.intents.into_iter().map(|i| (i.id.clone(), i)).collect(),
            api_keys: fixtures.api_keys.into_iter().map(|k| (k.key.clone(), k)).collect(),
        }
    }

    pub fn from_dir(irs_id: impl Into<String>, dir: &Path) -> Result<Self, DataSourceError> {
        Ok(Self::new(irs_id, Fixtures::load_dir(dir)?))
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn get_irs_record(&self) -> Result<IrsRecord, DataSourceError> {
        self.irs
            .get(&self.irs_id)
            .cloned()
            .ok_or_else(|| NotFoundError::new(EntityKind::Irs, &self.irs_id).into())
    }

    async fn get_intents(&self, ids: &[String]) -> Result<Vec<Intent>, DataSourceError> {
        in_request_order(EntityKind::Intent, ids, &self.intents)
    }

    async fn get_api_keys(&self, keys: &[String]) -> Result<Vec<ApiKeyRecord>, DataSourceError> {
        in_request_order(EntityKind::ApiKey, keys, &self.api_keys)
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
