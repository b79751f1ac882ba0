//! Prompt Composer: combines the service description, the serialized
//! intents and the Output Contract examples into the recognition prompt.
//!
//! Pure data-to-text: no I/O, no model calls. The user's input never enters
//! the system text; it is rendered as a separate final turn.

use serde::{Deserialize, Serialize};

use crate::models::Intent;
use crate::recognition::contract::{canonical_examples, ContractOptions, RequestIds};
use crate::recognition::prompts::{
    IRS_PROMPT_TEMPLATE, REQUEST_IDS_TEMPLATE, USER_TURN_TEMPLATE,
};

/// What to do with intents whose status is `inactive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InactiveIntentPolicy {
    /// Inactive intents are left out of the prompt entirely.
    #[default]
    Exclude,
    /// Inactive intents are listed after every active one.
    Deprioritize,
}

/// Picks the intents that take part in recognition, in prompt order.
pub fn select_intents(intents: &[Intent], policy: InactiveIntentPolicy) -> Vec<&Intent> {
    let active = intents.iter().filter(|i| i.is_active());
    match policy {
        InactiveIntentPolicy::Exclude => active.collect(),
        InactiveIntentPolicy::Deprioritize => active
            .chain(intents.iter().filter(|i| !i.is_active()))
            .collect(),
    }
}

/// The finished system prompt for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    system: String,
}

impl ComposedPrompt {
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Renders the final user turn for a query.
    pub fn user_turn(&self, query: &str, request: Option<&RequestIds>) -> String {
        render_user_turn(query, request)
    }
}

/// Builds the recognition prompt from the service description and the
/// already-serialized intents.
pub fn compose_prompt(
    details: &str,
    intents: &[String],
    options: &ContractOptions,
) -> ComposedPrompt {
    let intents_block = intents.join("\n\n");
    let examples = canonical_examples(options);
    let system = fill_template(
        IRS_PROMPT_TEMPLATE,
        &[
            ("details", details),
            ("intents", &intents_block),
            ("recognized_example", examples.recognized),
            ("need_more_info_example", examples.need_more_info),
            ("not_recognized_example", examples.not_recognized),
        ],
    );
    ComposedPrompt { system }
}

pub fn render_user_turn(query: &str, request: Option<&RequestIds>) -> String {
    let turn = fill_template(USER_TURN_TEMPLATE, &[("query", query)]);
    match request {
        Some(ids) => {
            let header = fill_template(
                REQUEST_IDS_TEMPLATE,
                &[("ir_id", &ids.ir_id), ("irs_id", &ids.irs_id)],
            );
            format!("{header}{turn}")
        }
        None => turn,
    }
}

/// Replaces `{slot}` markers in a single pass over the template. Values are
/// inserted verbatim and never re-scanned, so data containing `{intents}` or
/// other braces cannot alter the template.
pub(crate) fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let slot = slots.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::prompts::{
        NEED_MORE_INFO_EXAMPLE, NEED_MORE_INFO_WITH_IDS_EXAMPLE, NOT_RECOGNIZED_EXAMPLE,
        RECOGNIZED_EXAMPLE,
    };
    use crate::recognition::serializer::serialize_intents;
    use crate::test_support::{add_item_intent, remove_item_intent};

    fn grocery_prompt(options: &ContractOptions) -> ComposedPrompt {
        let intents = vec![add_item_intent()];
        let selected = select_intents(&intents, InactiveIntentPolicy::Exclude);
        let serialized = serialize_intents(&selected).unwrap();
        compose_prompt("Grocery inventory tracker", &serialized, options)
    }

    #[test]
    fn test_composed_prompt_is_deterministic() {
        let options = ContractOptions::default();
        let first = grocery_prompt(&options);
        for _ in 0..10 {
            assert_eq!(grocery_prompt(&options), first);
        }
    }

    #[test]
    fn test_sections_appear_in_fixed_order() {
        let prompt = grocery_prompt(&ContractOptions::default());
        let system = prompt.system();

        let role = system.find("You are an expert at recognizing").unwrap();
        let details = system.find("<details>\nGrocery inventory tracker\n</details>").unwrap();
        let intents = system.find("<intents>\n{").unwrap();
        let schema = system.find("<output_schema>\n").unwrap();
        assert!(role < details && details < intents && intents < schema);
        assert!(system.trim_end().ends_with("</output_schema>"));
    }

    #[test]
    fn test_prompt_embeds_canonical_examples_literally() {
        let system = grocery_prompt(&ContractOptions::default()).system().to_string();
        assert!(system.contains(RECOGNIZED_EXAMPLE));
        assert!(system.contains(NEED_MORE_INFO_EXAMPLE));
        assert!(system.contains(NOT_RECOGNIZED_EXAMPLE));
        assert!(!system.contains(NEED_MORE_INFO_WITH_IDS_EXAMPLE));
    }

    #[test]
    fn test_identifier_option_switches_need_more_info_example() {
        let options = ContractOptions {
            need_more_info_ids: true,
        };
        let system = grocery_prompt(&options).system().to_string();
        assert!(system.contains(NEED_MORE_INFO_WITH_IDS_EXAMPLE));
    }

    #[test]
    fn test_prompt_contains_serialized_intent() {
        let system = grocery_prompt(&ContractOptions::default()).system().to_string();
        assert!(system.contains("\"intent_code\": \"add-item\""));
        assert!(system.contains("\"id\": \"item_expiry_date\""));
    }

    #[test]
    fn test_user_input_is_a_separate_turn() {
        let prompt = grocery_prompt(&ContractOptions::default());
        let turn = prompt.user_turn("add 4 litres of milk", None);
        assert_eq!(turn, "<user_input>\nadd 4 litres of milk\n</user_input>");
        assert!(!prompt.system().contains("add 4 litres of milk"));
        assert!(!prompt.system().contains("{query}"));
    }

    #[test]
    fn test_user_turn_carries_request_ids_when_given() {
        let ids = RequestIds {
            ir_id: "req-1".to_string(),
            irs_id: "grocery-irs".to_string(),
        };
        let turn = render_user_turn("add milk", Some(&ids));
        assert_eq!(
            turn,
            "<request>\nir_id: req-1\nirs_id: grocery-irs\n</request>\n<user_input>\nadd milk\n</user_input>"
        );
    }

    #[test]
    fn test_select_intents_excludes_inactive_by_default() {
        let intents = vec![remove_item_intent(), add_item_intent()];
        let selected = select_intents(&intents, InactiveIntentPolicy::default());
        let codes: Vec<&str> = selected.iter().map(|i| i.intent_code.as_str()).collect();
        assert_eq!(codes, vec!["add-item"]);
    }

    #[test]
    fn test_select_intents_deprioritize_lists_inactive_last() {
        let intents = vec![remove_item_intent(), add_item_intent()];
        let selected = select_intents(&intents, InactiveIntentPolicy::Deprioritize);
        let codes: Vec<&str> = selected.iter().map(|i| i.intent_code.as_str()).collect();
        assert_eq!(codes, vec!["add-item", "remove-item"]);
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let filled = fill_template(
            "A={a} B={b} C={unknown} {",
            &[("a", "{b}"), ("b", "2")],
        );
        assert_eq!(filled, "A={b} B=2 C={unknown} {");
    }

    #[test]
    fn test_details_with_braces_do_not_leak_into_other_sections() {
        let prompt = compose_prompt("Tracker for {intents}", &[], &ContractOptions::default());
        assert!(prompt.system().contains("<details>\nTracker for {intents}\n</details>"));
    }
}
