use serde::{Deserialize, Serialize};

use crate::errors::{EntityKind, ValidationError};
use crate::models::validation::{require_non_empty, require_usage_limit, Validate};
use crate::models::Status;

const ALL_ENDPOINTS: &str = "all";

/// Which endpoints an API key may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEndpoints", into = "RawEndpoints")]
pub enum EndpointAccess {
    All,
    Only(Vec<String>),
}

impl EndpointAccess {
    pub fn allows(&self, endpoint: &str) -> bool {
        match self {
            EndpointAccess::All => true,
            EndpointAccess::Only(names) => names.iter().any(|n| n == endpoint),
        }
    }
}

/// Wire form: either the literal `"all"` or a list of endpoint names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawEndpoints {
    Literal(String),
    List(Vec<String>),
}

impl TryFrom<RawEndpoints> for EndpointAccess {
    type Error = String;

    fn try_from(raw: RawEndpoints) -> Result<Self, Self::Error> {
        match raw {
            RawEndpoints::Literal(s) if s == ALL_ENDPOINTS => Ok(EndpointAccess::All),
            RawEndpoints::Literal(s) => Err(format!(
                "endpoints must be \"{ALL_ENDPOINTS}\" or a list of endpoint names, got \"{s}\""
            )),
            RawEndpoints::List(names) => Ok(EndpointAccess::Only(names)),
        }
    }
}

impl From<EndpointAccess> for RawEndpoints {
    fn from(access: EndpointAccess) -> Self {
        match access {
            EndpointAccess::All => RawEndpoints::Literal(ALL_ENDPOINTS.to_string()),
            EndpointAccess::Only(names) => RawEndpoints::List(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub irs_id: String,
    /// Key owner, checked against the caller's uid.
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub last_used: String,
    pub status: Status,
    pub endpoints: EndpointAccess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit_tokens: Option<f64>,
}

impl Validate for ApiKeyRecord {
    const ENTITY: EntityKind = EntityKind::ApiKey;

    fn record_id(&self) -> &str {
        &self.key
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(Self::ENTITY, &self.key, "key", &self.key)?;
        require_non_empty(Self::ENTITY, &self.key, "irs_id", &self.irs_id)?;
        require_non_empty(Self::ENTITY, &self.key, "uid", &self.uid)?;
        require_usage_limit(Self::ENTITY, &self.key, self.usage_limit_tokens)?;
        if let EndpointAccess::Only(names) = &self.endpoints {
            for name in names {
                require_non_empty(Self::ENTITY, &self.key, "endpoints[]", name)?;
            }
        }
        Ok(())
    }
}
