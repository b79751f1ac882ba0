//! Domain schema for IRS records, intents, data attributes and API keys.
//!
//! These are read-only snapshots: the core never mutates them. Records enter
//! the system through [`validation`], which rejects anything outside the
//! declared shapes before downstream components see it.

use serde::{Deserialize, Serialize};

pub mod api_key;
pub mod intent;
pub mod irs;
pub mod validation;

pub use api_key::{ApiKeyRecord, EndpointAccess};
pub use intent::{DataAttribute, Intent};
pub use irs::IrsRecord;

/// Lifecycle status shared by every record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn is_active(self) -> bool {
        matches!(self, Status::Active)
    }
}
