//! Query expansion: an optional model pass that rewrites the user's input
//! (worded quantities to digits, spelling of units) before recognition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ResponseContractViolation;
use crate::llm_client::strip_json_fences;
use crate::recognition::composer::fill_template;
use crate::recognition::prompts::QUERY_EXPANSION_TEMPLATE;

const EXPANSION_CODE: &str = "query-expansion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionPrompt {
    system: String,
}

impl ExpansionPrompt {
    pub fn system(&self) -> &str {
        &self.system
    }
}

pub fn compose_expansion_prompt(details: &str, intents: &[String]) -> ExpansionPrompt {
    let intents_block = intents.join("\n\n");
    ExpansionPrompt {
        system: fill_template(
            QUERY_EXPANSION_TEMPLATE,
            &[("details", details), ("intents", &intents_block)],
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "code",
    content = "output",
    rename_all = "lowercase",
    deny_unknown_fields
)]
pub enum ExpansionOutput {
    Success { query: String },
    Error { message: String },
}

/// Validates the expansion model's raw output against its two-shape contract.
pub fn parse_expansion(raw: &str) -> Result<ExpansionOutput, ResponseContractViolation> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| ResponseContractViolation::MalformedJson(e.to_string()))?;
    let output: ExpansionOutput = serde_json::from_value(value)
        .map_err(|e| ResponseContractViolation::mismatch(EXPANSION_CODE, e.to_string()))?;

    let text = match &output {
        ExpansionOutput::Success { query } => query,
        ExpansionOutput::Error { message } => message,
    };
    if text.trim().is_empty() {
        return Err(ResponseContractViolation::mismatch(
            EXPANSION_CODE,
            "empty expansion output",
        ));
    }
    Ok(output)
}
