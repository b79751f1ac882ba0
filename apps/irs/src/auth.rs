//! API-key store built from resolved API-key records.
//!
//! A request is authorized when its key is known and active, the caller's uid
//! matches the key owner, and the key may access the requested endpoint.

use std::collections::HashMap;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

use crate::models::{ApiKeyRecord, EndpointAccess, Status};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("API key is required")]
    MissingKey,

    #[error("uid is required when authentication is enabled")]
    MissingUid,

    #[error("Invalid API key")]
    UnknownKey,

    #[error("API key is inactive")]
    InactiveKey,

    #[error("API key does not belong to this user")]
    UidMismatch,

    #[error("API key is not allowed to access endpoint '{0}'")]
    EndpointNotAllowed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyEntry {
    pub uid: String,
    pub status: Status,
    pub endpoints: EndpointAccess,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyStore {
    keys: HashMap<String, ApiKeyEntry>,
}

impl ApiKeyStore {
    pub fn from_records(records: &[ApiKeyRecord]) -> Self {
        let mut store = Self::default();
        for record in records {
            store.add_key(
                record.key.clone(),
                ApiKeyEntry {
                    uid: record.uid.clone(),
                    status: record.status,
                    endpoints: record.endpoints.clone(),
                },
            );
        }
        store
    }

    pub fn add_key(&mut self, key: String, entry: ApiKeyEntry) {
        self.keys.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn verify(
        &self,
        key: Option<&str>,
        uid: Option<&str>,
        endpoint: &str,
    ) -> Result<&ApiKeyEntry, AuthError> {
        let key = key.filter(|k| !k.is_empty()).ok_or(AuthError::MissingKey)?;
        let uid = uid.filter(|u| !u.is_empty()).ok_or(AuthError::MissingUid)?;
        let entry = self.keys.get(key).ok_or(AuthError::UnknownKey)?;

        if !entry.status.is_active() {
            return Err(AuthError::InactiveKey);
        }
        if entry.uid != uid {
            return Err(AuthError::UidMismatch);
        }
        if !entry.endpoints.allows(endpoint) {
            return Err(AuthError::EndpointNotAllowed(endpoint.to_string()));
        }
        Ok(entry)
    }
}

/// Reads the API key from the `Authorization` header, with or without a
/// `Bearer ` prefix.
pub fn api_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    Some(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}
