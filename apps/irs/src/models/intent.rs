use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{EntityKind, ValidationError};
use crate::models::validation::{require_non_empty, Validate};
use crate::models::Status;

/// One named piece of structured information an intent extracts from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAttribute {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Free-form label such as "string" or "date". Not parsed.
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub required: bool,
}

/// A recognizable purpose behind a user's input.
///
/// Management fields (`irs_id`, `uid`, `status`, `last_update`) are never
/// shown to the model; everything else is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    /// Lookup back-reference to the owning IRS record.
    pub irs_id: String,
    pub uid: String,
    pub status: Status,
    pub last_update: String,
    /// Returned to callers on successful recognition. Unique within an IRS.
    pub intent_code: String,
    pub name: String,
    pub description: String,
    pub primary_identifying_keywords: Vec<String>,
    pub examples: Vec<String>,
    pub data_attributes: Vec<DataAttribute>,
}

impl Intent {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = &str> {
        self.data_attributes.iter().map(|a| a.id.as_str())
    }
}

impl Validate for Intent {
    const ENTITY: EntityKind = EntityKind::Intent;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(Self::ENTITY, &self.id, "id", &self.id)?;
        require_non_empty(Self::ENTITY, &self.id, "irs_id", &self.irs_id)?;
        require_non_empty(Self::ENTITY, &self.id, "uid", &self.uid)?;
        require_non_empty(Self::ENTITY, &self.id, "intent_code", &self.intent_code)?;
        require_non_empty(Self::ENTITY, &self.id, "name", &self.name)?;

        let mut seen = HashSet::new();
        for attribute in &self.data_attributes {
            require_non_empty(Self::ENTITY, &self.id, "data_attributes[].id", &attribute.id)?;
            require_non_empty(Self::ENTITY, &self.id, "data_attributes[].name", &attribute.name)?;
            if !seen.insert(attribute.id.as_str()) {
                return Err(ValidationError::new(
                    Self::ENTITY,
                    &self.id,
                    format!("duplicate data attribute id '{}'", attribute.id),
                ));
            }
        }
        Ok(())
    }
}
