//! Intent Serializer: renders an intent as the JSON fragment embedded in the
//! recognition prompt.
//!
//! Output is byte-identical for identical input: keys appear in declaration
//! order, list order follows the input, nothing is sorted.

use serde::Serialize;

use crate::errors::AssemblyError;
use crate::models::{DataAttribute, Intent};

#[derive(Serialize)]
struct IntentView<'a> {
    id: &'a str,
    intent_code: &'a str,
    name: &'a str,
    description: &'a str,
    examples: &'a [String],
    primary_identifying_keywords: &'a [String],
    data_attributes: Vec<AttributeView<'a>>,
}

#[derive(Serialize)]
struct AttributeView<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    attribute_type: &'a str,
    required: bool,
}

impl<'a> From<&'a DataAttribute> for AttributeView<'a> {
    fn from(a: &'a DataAttribute) -> Self {
        Self {
            id: &a.id,
            name: &a.name,
            description: &a.description,
            attribute_type: &a.attribute_type,
            required: a.required,
        }
    }
}

/// Renders the model-facing fields of one intent.
pub fn serialize_intent(intent: &Intent) -> Result<String, AssemblyError> {
    let view = IntentView {
        id: &intent.id,
        intent_code: &intent.intent_code,
        name: &intent.name,
        description: &intent.description,
        examples: &intent.examples,
        primary_identifying_keywords: &intent.primary_identifying_keywords,
        data_attributes: intent.data_attributes.iter().map(AttributeView::from).collect(),
    };
    serde_json::to_string_pretty(&view).map_err(|e| AssemblyError::Serialize {
        intent_id: intent.id.clone(),
        message: e.to_string(),
    })
}

pub fn serialize_intents(intents: &[&Intent]) -> Result<Vec<String>, AssemblyError> {
    intents.iter().map(|i| serialize_intent(i)).collect()
}
