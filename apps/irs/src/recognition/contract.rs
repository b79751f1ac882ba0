//! Output Contract: the closed set of responses a generation model may give.
//!
//! # Shapes
//! - `intent-recognized`: `{ intent_code, data: { attribute-id → value | null } }`
//! - `need-more-info`: `{ data: { missing_data: [attribute-id] } }`, optionally
//!   with `ir_id` / `irs_id` (see [`ContractOptions`])
//! - `intent-not-recognized`: `{ message }`
//!
//! Every raw output is either accepted as exactly one of these or rejected with
//! a [`ResponseContractViolation`]. Nothing is coerced to a default.

use std::collections::HashSet;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::ResponseContractViolation;
use crate::llm_client::strip_json_fences;
use crate::models::Intent;
use crate::recognition::prompts::{
    NEED_MORE_INFO_EXAMPLE, NEED_MORE_INFO_WITH_IDS_EXAMPLE, NOT_RECOGNIZED_EXAMPLE,
    RECOGNIZED_EXAMPLE,
};

pub const INTENT_RECOGNIZED: &str = "intent-recognized";
pub const NEED_MORE_INFO: &str = "need-more-info";
pub const INTENT_NOT_RECOGNIZED: &str = "intent-not-recognized";

/// Schema options that vary per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOptions {
    /// When set, `need-more-info` must echo the request (`ir_id`) and service
    /// (`irs_id`) identifiers.
    pub need_more_info_ids: bool,
}

/// Identifiers handed to the model when `need_more_info_ids` is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIds {
    pub ir_id: String,
    pub irs_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", content = "output", rename_all = "kebab-case")]
pub enum IrsOutput {
    IntentRecognized(Recognized),
    NeedMoreInfo(NeedMoreInfo),
    IntentNotRecognized(NotRecognized),
}

impl IrsOutput {
    pub fn code(&self) -> &'static str {
        match self {
            IrsOutput::IntentRecognized(_) => INTENT_RECOGNIZED,
            IrsOutput::NeedMoreInfo(_) => NEED_MORE_INFO,
            IrsOutput::IntentNotRecognized(_) => INTENT_NOT_RECOGNIZED,
        }
    }

    pub fn not_recognized(message: impl Into<String>) -> Self {
        IrsOutput::IntentNotRecognized(NotRecognized {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recognized {
    pub intent_code: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeedMoreInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irs_id: Option<String>,
    pub data: MissingData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissingData {
    pub missing_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotRecognized {
    pub message: String,
}

/// The three literal shapes embedded in the prompt.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalExamples {
    pub recognized: &'static str,
    pub need_more_info: &'static str,
    pub not_recognized: &'static str,
}

/// The examples pass `parse_output`. Their placeholder intent code and
/// attribute id are not real, so `OutputContract::check` rejects them.
pub fn canonical_examples(options: &ContractOptions) -> CanonicalExamples {
    CanonicalExamples {
        recognized: RECOGNIZED_EXAMPLE,
        need_more_info: if options.need_more_info_ids {
            NEED_MORE_INFO_WITH_IDS_EXAMPLE
        } else {
            NEED_MORE_INFO_EXAMPLE
        },
        not_recognized: NOT_RECOGNIZED_EXAMPLE,
    }
}

/// Shape-only validation of raw model output.
pub fn parse_output(
    raw: &str,
    options: &ContractOptions,
) -> Result<IrsOutput, ResponseContractViolation> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| ResponseContractViolation::MalformedJson(e.to_string()))?;
    parse_output_value(value, options)
}

pub fn parse_output_value(
    value: Value,
    options: &ContractOptions,
) -> Result<IrsOutput, ResponseContractViolation> {
    let Value::Object(mut object) = value else {
        return Err(ResponseContractViolation::NotAnObject);
    };
    let code = match object.remove("code") {
        Some(Value::String(code)) => code,
        _ => return Err(ResponseContractViolation::MissingCode),
    };
    if ![INTENT_RECOGNIZED, NEED_MORE_INFO, INTENT_NOT_RECOGNIZED].contains(&code.as_str()) {
        return Err(ResponseContractViolation::UnknownCode(code));
    }
    let output = object
        .remove("output")
        .ok_or_else(|| ResponseContractViolation::mismatch(&code, "missing 'output'"))?;
    if let Some(extra) = object.keys().next() {
        return Err(ResponseContractViolation::mismatch(
            &code,
            format!("unexpected field '{extra}'"),
        ));
    }

    match code.as_str() {
        INTENT_RECOGNIZED => {
            let payload: Recognized = payload(&code, output)?;
            if payload.intent_code.trim().is_empty() {
                return Err(ResponseContractViolation::mismatch(&code, "empty 'intent_code'"));
            }
            Ok(IrsOutput::IntentRecognized(payload))
        }
        NEED_MORE_INFO => {
            let payload: NeedMoreInfo = payload(&code, output)?;
            if options.need_more_info_ids {
                for (field, value) in [("ir_id", &payload.ir_id), ("irs_id", &payload.irs_id)] {
                    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                        return Err(ResponseContractViolation::mismatch(
                            &code,
                            format!("missing '{field}'"),
                        ));
                    }
                }
            } else if let Some(field) = [("ir_id", &payload.ir_id), ("irs_id", &payload.irs_id)]
                .into_iter()
                .find_map(|(field, value)| value.is_some().then_some(field))
            {
                return Err(ResponseContractViolation::mismatch(
                    &code,
                    format!("unexpected field '{field}'"),
                ));
            }
            Ok(IrsOutput::NeedMoreInfo(payload))
        }
        _ => {
            let payload: NotRecognized = payload(&code, output)?;
            if payload.message.trim().is_empty() {
                return Err(ResponseContractViolation::mismatch(&code, "empty 'message'"));
            }
            Ok(IrsOutput::IntentNotRecognized(payload))
        }
    }
}

fn payload<T: DeserializeOwned>(code: &str, output: Value) -> Result<T, ResponseContractViolation> {
    serde_json::from_value(output).map_err(|e| ResponseContractViolation::mismatch(code, e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IntentShape {
    intent_code: String,
    attribute_ids: Vec<String>,
}

/// The Output Contract bound to the intents of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputContract {
    options: ContractOptions,
    intents: Vec<IntentShape>,
}

impl OutputContract {
    pub fn new(intents: &[&Intent], options: ContractOptions) -> Self {
        let intents = intents
            .iter()
            .map(|i| IntentShape {
                intent_code: i.intent_code.clone(),
                attribute_ids: i.attribute_ids().map(String::from).collect(),
            })
            .collect();
        Self { options, intents }
    }

    pub fn options(&self) -> &ContractOptions {
        &self.options
    }

    pub fn schema(&self) -> Value {
        output_schema(&self.options)
    }

    /// Shape validation followed by the checks that need the intent set.
    pub fn validate(&self, raw: &str) -> Result<IrsOutput, ResponseContractViolation> {
        let output = parse_output(raw, &self.options)?;
        self.check(&output)?;
        Ok(output)
    }

    /// Awaits a single generation and validates its output exactly as
    /// [`validate`](Self::validate) does.
    pub async fn validate_generated<F, E>(&self, generation: F) -> Result<IrsOutput, E>
    where
        F: Future<Output = Result<String, E>>,
        E: From<ResponseContractViolation>,
    {
        let raw = generation.await?;
        Ok(self.validate(&raw)?)
    }

    pub fn check(&self, output: &IrsOutput) -> Result<(), ResponseContractViolation> {
        match output {
            IrsOutput::IntentRecognized(recognized) => {
                let shape = self
                    .intents
                    .iter()
                    .find(|s| s.intent_code == recognized.intent_code)
                    .ok_or_else(|| {
                        ResponseContractViolation::UnknownIntent(recognized.intent_code.clone())
                    })?;
                if let Some(missing) = shape
                    .attribute_ids
                    .iter()
                    .find(|id| !recognized.data.contains_key(id.as_str()))
                {
                    return Err(ResponseContractViolation::MissingAttribute {
                        intent_code: shape.intent_code.clone(),
                        attribute: missing.clone(),
                    });
                }
                if let Some(extra) = recognized
                    .data
                    .keys()
                    .find(|key| !shape.attribute_ids.iter().any(|id| id == *key))
                {
                    return Err(ResponseContractViolation::UndeclaredAttribute {
                        intent_code: shape.intent_code.clone(),
                        attribute: extra.clone(),
                    });
                }
                Ok(())
            }
            IrsOutput::NeedMoreInfo(info) => {
                let known: HashSet<&str> = self
                    .intents
                    .iter()
                    .flat_map(|s| s.attribute_ids.iter().map(String::as_str))
                    .collect();
                match info.data.missing_data.iter().find(|id| !known.contains(id.as_str())) {
                    Some(unknown) => Err(ResponseContractViolation::UnknownMissingAttribute(
                        unknown.clone(),
                    )),
                    None => Ok(()),
                }
            }
            IrsOutput::IntentNotRecognized(_) => Ok(()),
        }
    }
}

/// JSON Schema of the Output Contract, handed to the hosting layer.
pub fn output_schema(options: &ContractOptions) -> Value {
    let mut need_more_info = json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["data"],
        "properties": {
            "data": {
                "type": "object",
                "additionalProperties": false,
                "required": ["missing_data"],
                "properties": {
                    "missing_data": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    });
    if options.need_more_info_ids {
        need_more_info["required"] = json!(["ir_id", "irs_id", "data"]);
        need_more_info["properties"]["ir_id"] = json!({ "type": "string", "minLength": 1 });
        need_more_info["properties"]["irs_id"] = json!({ "type": "string", "minLength": 1 });
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "IrsOutput",
        "oneOf": [
            shape_schema(INTENT_RECOGNIZED, json!({
                "type": "object",
                "additionalProperties": false,
                "required": ["intent_code", "data"],
                "properties": {
                    "intent_code": { "type": "string", "minLength": 1 },
                    "data": { "type": "object" }
                }
            })),
            shape_schema(NEED_MORE_INFO, need_more_info),
            shape_schema(INTENT_NOT_RECOGNIZED, json!({
                "type": "object",
                "additionalProperties": false,
                "required": ["message"],
                "properties": {
                    "message": { "type": "string", "minLength": 1 }
                }
            })),
        ]
    })
}

fn shape_schema(code: &str, output: Value) -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["code", "output"],
        "properties": {
            "code": { "const": code },
            "output": output
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        add_item_intent, remove_item_intent, NEED_MORE_INFO_MILK, NOT_RECOGNIZED, RECOGNIZED_MILK,
    };

    fn grocery_contract(options: ContractOptions) -> OutputContract {
        let intent = add_item_intent();
        OutputContract::new(&[&intent], options)
    }

    /// Shape-level only: the placeholders name no real intent or attribute,
    /// so `OutputContract::validate` rejects the recognized and
    /// need-more-info examples.
    #[test]
    fn test_canonical_examples_pass_validation() {
        for options in [
            ContractOptions::default(),
            ContractOptions {
                need_more_info_ids: true,
            },
        ] {
            let examples = canonical_examples(&options);
            let recognized = parse_output(examples.recognized, &options).unwrap();
            let need_more_info = parse_output(examples.need_more_info, &options).unwrap();
            let not_recognized = parse_output(examples.not_recognized, &options).unwrap();
            assert_eq!(recognized.code(), INTENT_RECOGNIZED);
            assert_eq!(need_more_info.code(), NEED_MORE_INFO);
            assert_eq!(not_recognized.code(), INTENT_NOT_RECOGNIZED);
        }
    }

    #[test]
    fn test_scenario_add_four_litres_of_milk() {
        let output = grocery_contract(ContractOptions::default())
            .validate(RECOGNIZED_MILK)
            .unwrap();
        let expected: Value = json!({
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
        });
        assert_eq!(serde_json::to_value(&output).unwrap(), expected);
    }

    #[test]
    fn test_scenario_add_milk_needs_more_info() {
        let output = grocery_contract(ContractOptions::default())
            .validate(NEED_MORE_INFO_MILK)
            .unwrap();
        match output {
            IrsOutput::NeedMoreInfo(info) => {
                assert_eq!(
                    info.data.missing_data,
                    vec!["item_quantity".to_string(), "item_quantity_unit".to_string()]
                );
                assert_eq!(info.ir_id, None);
            }
            other => panic!("expected need-more-info, got {other:?}"),
        }
    }

    #[test]
    fn test_scenario_unrelated_input_not_recognized() {
        let output = grocery_contract(ContractOptions::default())
            .validate(NOT_RECOGNIZED)
            .unwrap();
        match output {
            IrsOutput::IntentNotRecognized(n) => assert!(!n.message.is_empty()),
            other => panic!("expected intent-not-recognized, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_attribute_key_is_rejected() {
        let raw = r#"{"code":"intent-recognized","output":{"intent_code":"add-item",
            "data":{"item_name":"milk","item_quantity":"4","item_quantity_unit":"litres"}}}"#;
        let err = grocery_contract(ContractOptions::default()).validate(raw).unwrap_err();
        assert_eq!(
            err,
            ResponseContractViolation::MissingAttribute {
                intent_code: "add-item".to_string(),
                attribute: "item_expiry_date".to_string(),
            }
        );
    }

    #[test]
    fn test_undeclared_attribute_key_is_rejected() {
        let raw = r#"{"code":"intent-recognized","output":{"intent_code":"add-item",
            "data":{"item_name":"milk","item_quantity":"4","item_quantity_unit":"litres",
                    "item_expiry_date":null,"store":"corner shop"}}}"#;
        let err = grocery_contract(ContractOptions::default()).validate(raw).unwrap_err();
        assert!(matches!(
            err,
            ResponseContractViolation::UndeclaredAttribute { ref attribute, .. } if attribute == "store"
        ));
    }

    #[test]
    fn test_unknown_intent_code_is_rejected() {
        let raw = r#"{"code":"intent-recognized","output":{"intent_code":"remove-item","data":{}}}"#;
        let err = grocery_contract(ContractOptions::default()).validate(raw).unwrap_err();
        assert_eq!(err, ResponseContractViolation::UnknownIntent("remove-item".to_string()));
    }

    #[test]
    fn test_need_more_info_with_unknown_attribute_is_rejected() {
        let raw = r#"{"code":"need-more-info","output":{"data":{"missing_data":["colour"]}}}"#;
        let err = grocery_contract(ContractOptions::default()).validate(raw).unwrap_err();
        assert_eq!(err, ResponseContractViolation::UnknownMissingAttribute("colour".to_string()));
    }

    #[test]
    fn test_attribute_ids_of_any_selected_intent_are_known() {
        let add = add_item_intent();
        let remove = remove_item_intent();
        let contract = OutputContract::new(&[&add, &remove], ContractOptions::default());
        let raw = r#"{"code":"need-more-info","output":{"data":{"missing_data":["item_name"]}}}"#;
        assert!(contract.validate(raw).is_ok());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let err = parse_output("{\"code\": \"intent-recognized\"", &ContractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::MalformedJson(_)));
    }

    #[test]
    fn test_plain_text_is_rejected() {
        let err = parse_output("Sure! The intent is add-item.", &ContractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::MalformedJson(_)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_output("[1, 2]", &ContractOptions::default()).unwrap_err();
        assert_eq!(err, ResponseContractViolation::NotAnObject);
    }

    #[test]
    fn test_missing_or_non_string_code_is_rejected() {
        let options = ContractOptions::default();
        assert_eq!(
            parse_output(r#"{"output":{"message":"x"}}"#, &options).unwrap_err(),
            ResponseContractViolation::MissingCode
        );
        assert_eq!(
            parse_output(r#"{"code":3,"output":{"message":"x"}}"#, &options).unwrap_err(),
            ResponseContractViolation::MissingCode
        );
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let err = parse_output(r#"{"code":"success","output":{"query":"x"}}"#, &ContractOptions::default())
            .unwrap_err();
        assert_eq!(err, ResponseContractViolation::UnknownCode("success".to_string()));
    }

    #[test]
    fn test_payload_of_another_shape_is_rejected() {
        // A not-recognized payload labelled as recognized must not slip through.
        let err = parse_output(
            r#"{"code":"intent-recognized","output":{"message":"nope"}}"#,
            &ContractOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { ref code, .. } if code == INTENT_RECOGNIZED));
    }

    #[test]
    fn test_extra_top_level_field_is_rejected() {
        let err = parse_output(
            r#"{"code":"intent-not-recognized","output":{"message":"x"},"confidence":0.2}"#,
            &ContractOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_output_is_rejected() {
        let err = parse_output(r#"{"code":"need-more-info"}"#, &ContractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let err = parse_output(
            r#"{"code":"intent-not-recognized","output":{"message":"  "}}"#,
            &ContractOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { .. }));
    }

    #[test]
    fn test_data_must_be_an_object() {
        let err = parse_output(
            r#"{"code":"intent-recognized","output":{"intent_code":"add-item","data":"milk"}}"#,
            &ContractOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { .. }));
    }

    #[test]
    fn test_fenced_output_is_accepted() {
        let raw = format!("```json\n{NOT_RECOGNIZED}\n```");
        assert!(parse_output(&raw, &ContractOptions::default()).is_ok());
    }

    #[test]
    fn test_identifier_option_requires_ids() {
        let with_ids = ContractOptions {
            need_more_info_ids: true,
        };
        let err = parse_output(NEED_MORE_INFO_MILK, &with_ids).unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { ref reason, .. } if reason.contains("ir_id")));

        let raw = r#"{"code":"need-more-info","output":{"ir_id":"r1","irs_id":"grocery-irs",
            "data":{"missing_data":["item_quantity"]}}}"#;
        let output = parse_output(raw, &with_ids).unwrap();
        match output {
            IrsOutput::NeedMoreInfo(info) => assert_eq!(info.irs_id.as_deref(), Some("grocery-irs")),
            other => panic!("expected need-more-info, got {other:?}"),
        }
    }

    #[test]
    fn test_ids_are_rejected_when_option_is_off() {
        let raw = r#"{"code":"need-more-info","output":{"ir_id":"zz","irs_id":"other",
            "data":{"missing_data":["item_quantity"]}}}"#;
        let err = parse_output(raw, &ContractOptions::default()).unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { ref reason, .. } if reason.contains("ir_id")));

        let raw = r#"{"code":"need-more-info","output":{"irs_id":"grocery-irs",
            "data":{"missing_data":["item_quantity"]}}}"#;
        let err = parse_output(raw, &ContractOptions::default()).unwrap_err();
        assert!(matches!(err, ResponseContractViolation::ShapeMismatch { ref reason, .. } if reason.contains("irs_id")));

        let schema = output_schema(&ContractOptions::default());
        let props = schema["oneOf"][1]["properties"]["output"]["properties"]
            .as_object()
            .unwrap();
        assert!(!props.contains_key("ir_id"));
    }

    #[test]
    fn test_each_input_matches_at_most_one_shape() {
        let options = ContractOptions::default();
        let inputs = [
            RECOGNIZED_MILK,
            NEED_MORE_INFO_MILK,
            NOT_RECOGNIZED,
            r#"{"code":"need-more-info","output":{"message":"x"}}"#,
            r#"{"code":"intent-not-recognized","output":{"data":{"missing_data":[]}}}"#,
            r#"{}"#,
            "null",
        ];
        let codes = [INTENT_RECOGNIZED, NEED_MORE_INFO, INTENT_NOT_RECOGNIZED];
        for raw in inputs {
            let accepted = match parse_output(raw, &options) {
                Ok(output) => codes.iter().filter(|c| **c == output.code()).count(),
                Err(_) => 0,
            };
            assert!(accepted <= 1, "{raw} accepted by {accepted} shapes");
        }
    }

    #[tokio::test]
    async fn test_async_validation_matches_sync_validation() {
        let contract = grocery_contract(ContractOptions::default());
        for raw in [RECOGNIZED_MILK, NEED_MORE_INFO_MILK, NOT_RECOGNIZED, "garbage"] {
            let sync = contract.validate(raw);
            let generated: Result<IrsOutput, ResponseContractViolation> = contract
                .validate_generated(async { Ok(raw.to_string()) })
                .await;
            assert_eq!(sync, generated);
        }
    }

    #[test]
    fn test_schema_lists_three_shapes() {
        let schema = grocery_contract(ContractOptions::default()).schema();
        let shapes = schema["oneOf"].as_array().unwrap();
        let codes: Vec<&str> = shapes
            .iter()
            .map(|s| s["properties"]["code"]["const"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec![INTENT_RECOGNIZED, NEED_MORE_INFO, INTENT_NOT_RECOGNIZED]);
        assert!(shapes[1]["properties"]["output"]["properties"].get("ir_id").is_none());
    }

    #[test]
    fn test_schema_requires_ids_when_enabled() {
        let schema = output_schema(&ContractOptions {
            need_more_info_ids: true,
        });
        let required = &schema["oneOf"][1]["properties"]["output"]["required"];
        assert_eq!(required, &json!(["ir_id", "irs_id", "data"]));
    }
}
