//! Shared fixtures for unit tests: the grocery inventory service used across
//! the recognition scenarios, and a scripted generator.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm_client::{GenerationRequest, LlmError, TextGenerator};
use crate::models::validation::{parse_api_key, parse_intent, parse_irs_record};
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

pub const TEST_KEY: &str = "a5zwhp0YlcRVkpnOXchIkL1lrmf0MPg24POM0kO6HcM=";
pub const TEST_UID: &str = "DI2UZuaTWjQPzVCRjzPW";

pub fn grocery_irs_json() -> Value {
    json!({
        "id": "grocery-irs",
        "name": "Grocery IRS",
        "description": "Intent recognition for the grocery tracker",
        "project_description": "Grocery inventory tracker",
        "version": "1.0.0",
        "last_update": "2024-06-01T00:00:00Z",
        "status": "active",
        "usage_limit_tokens": null,
        "api_keys": [TEST_KEY],
        "intents": ["intent-add-item"]
    })
}

pub fn add_item_intent_json() -> Value {
    json!({
        "id": "intent-add-item",
        "irs_id": "grocery-irs",
        "uid": TEST_UID,
        "status": "active",
        "last_update": "2024-06-01T00:00:00Z",
        "intent_code": "add-item",
        "name": "Add item",
        "description": "Add a grocery item to the inventory",
        "primary_identifying_keywords": ["add", "bought"],
        "examples": ["add 2 kg of rice", "I bought 6 eggs"],
        "data_attributes": [
            {
                "id": "item_name",
                "name": "Item name",
                "description": "Name of the grocery item",
                "type": "string",
                "required": true
            },
            {
                "id": "item_quantity",
                "name": "Item quantity",
                "description": "How much of the item",
                "type": "string",
                "required": true
            },
            {
                "id": "item_quantity_unit",
                "name": "Quantity unit",
                "description": "Unit of the quantity",
                "type": "string",
                "required": true
            },
            {
                "id": "item_expiry_date",
                "name": "Expiry date",
                "description": "When the item expires",
                "type": "date",
                "required": false
            }
        ]
    })
}

pub fn remove_item_intent_json() -> Value {
    json!({
        "id": "intent-remove-item",
        "irs_id": "grocery-irs",
        "uid": TEST_UID,
        "status": "inactive",
        "last_update": "2024-06-01T00:00:00Z",
        "intent_code": "remove-item",
        "name": "Remove item",
        "description": "Remove a grocery item from the inventory",
        "primary_identifying_keywords": ["remove", "used up"],
        "examples": ["remove the milk"],
        "data_attributes": [
            {
                "id": "item_name",
                "name": "Item name",
                "description": "Name of the grocery item",
                "type": "string",
                "required": true
            }
        ]
    })
}

pub fn api_key_json() -> Value {
    json!({
        "key": TEST_KEY,
        "irs_id": "grocery-irs",
        "uid": TEST_UID,
        "name": "test key",
        "last_used": "2024-06-01T00:00:00Z",
        "status": "active",
        "endpoints": "all"
    })
}

pub fn grocery_irs() -> IrsRecord {
    parse_irs_record(grocery_irs_json()).expect("fixture IRS record is valid")
}

pub fn add_item_intent() -> Intent {
    parse_intent(add_item_intent_json()).expect("fixture intent is valid")
}

pub fn remove_item_intent() -> Intent {
    parse_intent(remove_item_intent_json()).expect("fixture intent is valid")
}

pub fn test_api_key() -> ApiKeyRecord {
    parse_api_key(api_key_json()).expect("fixture API key is valid")
}

/// Model output for "add 4 litres of milk".
pub const RECOGNIZED_MILK: &str = r#"{
  "code": "intent-recognized",
  "output": {
    "intent_code": "add-item",
    "data": {
      "item_name": "milk",
      "item_quantity": "4",
      "item_quantity_unit": "litres",
      "item_expiry_date": null
    }
  }
}"#;

/// Model output for "add milk".
pub const NEED_MORE_INFO_MILK: &str = r#"{
  "code": "need-more-info",
  "output": {
    "data": {
      "missing_data": ["item_quantity", "item_quantity_unit"]
    }
  }
}"#;

/// Model output for input unrelated to any intent.
pub const NOT_RECOGNIZED: &str = r#"{
  "code": "intent-not-recognized",
  "output": {
    "message": "Unable to recognize intent from user input"
  }
}"#;

/// A generator that replays scripted responses and records every request.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<(String, String)>>,
    models: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error)])),
            ..Self::default()
        }
    }

    /// (system, user) pairs in call order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Model name requested by each call, in call order.
    pub fn models(&self) -> Vec<Option<String>> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.system.to_string(), request.user.to_string()));
        self.models
            .lock()
            .unwrap()
            .push(request.model.map(|m| m.name.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}
