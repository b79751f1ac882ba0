// All prompt text for intent recognition and query expansion.
// Templates are filled by `composer::fill_template`; only the named slots are
// interpolated, everything else is fixed.

/// Intent recognition system prompt.
/// Slots: {details}, {intents}, {recognized_example}, {need_more_info_example},
///        {not_recognized_example}
pub const IRS_PROMPT_TEMPLATE: &str = r#"You are an expert at recognizing the intent behind a user's input, given the details of every intent that is available. Recognizing the intent and extracting its data is the only task you perform.

The information you receive is organised as follows:

1. Details of the application the user input relates to, enclosed in <details></details> tags. Use them to understand the context in which the input was submitted.
2. Every intent the input may be recognized as, enclosed in <intents></intents> tags. The input must be matched to at most one of these intents.
3. The output formats you must respond with, enclosed in <output_schema></output_schema> tags.
4. The user input itself, provided in the next message and enclosed in <user_input></user_input> tags.

<details>
{details}
</details>

<intents>
{intents}
</intents>

<output_schema>
Respond with a single JSON object and nothing else. Do NOT use markdown code fences.

If an intent is recognized, respond with the shape below. The keys of "data" are the IDs of the recognized intent's data attributes. Include every one of them, and use null for any attribute whose value is not present in the input.

{recognized_example}

If the input cannot be matched to a single intent, or required data attributes of the matched intent cannot be resolved from the input, respond with the shape below, listing the IDs of the missing data attributes.

{need_more_info_example}

If no intent matches the input, or recognition fails for any other reason, respond with the shape below.

{not_recognized_example}
</output_schema>"#;

/// Final user turn. Slot: {query}
pub const USER_TURN_TEMPLATE: &str = "<user_input>\n{query}\n</user_input>";

/// Request identifiers block prepended to the user turn when the
/// need-more-info shape carries them. Slots: {ir_id}, {irs_id}
pub const REQUEST_IDS_TEMPLATE: &str =
    "<request>\nir_id: {ir_id}\nirs_id: {irs_id}\n</request>\n";

// Canonical Output Contract shapes, embedded literally in the prompt.

pub const RECOGNIZED_EXAMPLE: &str = r#"{
  "code": "intent-recognized",
  "output": {
    "intent_code": "code of the recognized intent",
    "data": {
      "data attribute ID": "extracted value, or null if not present in the input"
    }
  }
}"#;

pub const NEED_MORE_INFO_EXAMPLE: &str = r#"{
  "code": "need-more-info",
  "output": {
    "data": {
      "missing_data": ["ID of each missing data attribute"]
    }
  }
}"#;

pub const NEED_MORE_INFO_WITH_IDS_EXAMPLE: &str = r#"{
  "code": "need-more-info",
  "output": {
    "ir_id": "ir_id from the <request> block",
    "irs_id": "irs_id from the <request> block",
    "data": {
      "missing_data": ["ID of each missing data attribute"]
    }
  }
}"#;

pub const NOT_RECOGNIZED_EXAMPLE: &str = r#"{
  "code": "intent-not-recognized",
  "output": {
    "message": "Unable to recognize intent from user input"
  }
}"#;

/// Query expansion system prompt. Slots: {details}, {intents}
pub const QUERY_EXPANSION_TEMPLATE: &str = r#"You are an expert at query expansion. Your task is to reformulate the user input so that another model can recognize its intent and extract the information it contains. Do not identify the intent yourself.

<details>
{details}
</details>

<intents>
{intents}
</intents>

REFORMULATION RULES:
1. Convert quantities written in words to digits (e.g. "four" becomes "4"). Keep the unit of measurement given by the user; only correct its spelling.
2. Keep every piece of information present in the input: item names, quantities, units, dates.
3. Preserve the user's intent exactly. Do not add information that is not in the input.
4. If the input is empty or meaningless, respond with the error shape and explain what is missing.

Respond with a single JSON object and nothing else.

On success:
{
  "code": "success",
  "output": {
    "query": "the reformulated user input"
  }
}

On error or failure:
{
  "code": "error",
  "output": {
    "message": "descriptive error message"
  }
}"#;
