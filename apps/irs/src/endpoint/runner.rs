//! One recognition request against an assembled endpoint: optional query
//! expansion, then a single generation validated by the Output Contract.

use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::EndpointConfig;
use crate::errors::{AppError, ResponseContractViolation};
use crate::llm_client::{GenerationRequest, LlmError, TextGenerator};
use crate::recognition::composer::render_user_turn;
use crate::recognition::expansion::parse_expansion;
use crate::recognition::{ExpansionOutput, ExpansionPrompt, IrsOutput, RequestIds};

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Contract(#[from] ResponseContractViolation),
}

impl From<RecognitionError> for AppError {
    fn from(e: RecognitionError) -> Self {
        match e {
            RecognitionError::Llm(e) => e.into(),
            RecognitionError::Contract(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOutcome {
    pub output: IrsOutput,
    /// The query recognition actually ran on (after expansion, if any).
    pub query: String,
}

pub async fn run_recognition(
    endpoint: &EndpointConfig,
    generator: &dyn TextGenerator,
    query: &str,
    ids: &RequestIds,
) -> Result<RecognitionOutcome, RecognitionError> {
    let query = match &endpoint.expansion {
        Some(expansion) => match expand_query(endpoint, expansion, generator, query).await? {
            ExpansionOutput::Success { query: expanded } => {
                debug!("Expanded query '{query}' to '{expanded}'");
                expanded
            }
            ExpansionOutput::Error { message } => {
                return Ok(RecognitionOutcome {
                    output: IrsOutput::not_recognized(message),
                    query: query.to_string(),
                });
            }
        },
        None => query.to_string(),
    };

    let request_ids = endpoint.contract.options().need_more_info_ids.then_some(ids);
    let user = endpoint.prompt.user_turn(&query, request_ids);
    let request = GenerationRequest {
        system: endpoint.prompt.system(),
        user: &user,
        model: endpoint.model.as_ref(),
    };

    let output = endpoint
        .contract
        .validate_generated(async {
            generator
                .generate(&request)
                .await
                .map_err(RecognitionError::from)
        })
        .await?;

    if let (Some(_), IrsOutput::NeedMoreInfo(info)) = (request_ids, &output) {
        if info.ir_id.as_deref() != Some(ids.ir_id.as_str()) {
            warn!(
                "need-more-info echoed ir_id {:?}, expected '{}'",
                info.ir_id, ids.ir_id
            );
        }
    }

    debug!("Endpoint '{}' answered {}", endpoint.endpoint_name, output.code());
    Ok(RecognitionOutcome { output, query })
}

async fn expand_query(
    endpoint: &EndpointConfig,
    expansion: &ExpansionPrompt,
    generator: &dyn TextGenerator,
    query: &str,
) -> Result<ExpansionOutput, RecognitionError> {
    let user = render_user_turn(query, None);
    let raw = generator
        .generate(&GenerationRequest {
            system: expansion.system(),
            user: &user,
            model: endpoint.expansion_model.as_ref().or(endpoint.model.as_ref()),
        })
        .await?;
    Ok(parse_expansion(&raw)?)
}
