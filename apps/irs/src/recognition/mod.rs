// Intent recognition core: intent serialization, prompt composition, the
// Output Contract and the optional query-expansion pass.
// Everything here is synchronous and free of I/O except
// `OutputContract::validate_generated`, which only awaits the caller's future.

pub mod composer;
pub mod contract;
pub mod expansion;
pub mod prompts;
pub mod serializer;

pub use composer::{compose_prompt, select_intents, ComposedPrompt, InactiveIntentPolicy};
pub use contract::{ContractOptions, IrsOutput, OutputContract, RequestIds};
pub use expansion::{compose_expansion_prompt, ExpansionOutput, ExpansionPrompt};
pub use serializer::{serialize_intent, serialize_intents};
