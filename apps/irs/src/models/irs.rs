use serde::{Deserialize, Serialize};

use crate::errors::{EntityKind, ValidationError};
use crate::models::validation::{nullable, require_non_empty, require_usage_limit, Validate};
use crate::models::Status;

/// The service-level record an endpoint is assembled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrsRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Embedded verbatim in the prompt as domain context.
    pub project_description: String,
    pub version: String,
    pub last_update: String,
    pub status: Status,
    /// The key must be present; `null` means unlimited.
    #[serde(deserialize_with = "nullable")]
    pub usage_limit_tokens: Option<f64>,
    pub api_keys: Vec<String>,
    /// Ordered intent ids. Every id must resolve at assembly time.
    pub intents: Vec<String>,
}

impl Validate for IrsRecord {
    const ENTITY: EntityKind = EntityKind::Irs;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(Self::ENTITY, &self.id, "id", &self.id)?;
        require_non_empty(Self::ENTITY, &self.id, "name", &self.name)?;
        require_usage_limit(Self::ENTITY, &self.id, self.usage_limit_tokens)?;
        for intent_id in &self.intents {
            require_non_empty(Self::ENTITY, &self.id, "intents[]", intent_id)?;
        }
        for key in &self.api_keys {
            require_non_empty(Self::ENTITY, &self.id, "api_keys[]", key)?;
        }
        Ok(())
    }
}
