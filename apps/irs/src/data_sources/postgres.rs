//! Document-database-backed source: each record is a JSONB document in a
//! PostgreSQL table keyed by its id.
//!
//! ```sql
//! CREATE TABLE irs      (id  TEXT PRIMARY KEY, doc JSONB NOT NULL);
//! CREATE TABLE intents  (id  TEXT PRIMARY KEY, doc JSONB NOT NULL);
//! CREATE TABLE api_keys (id  TEXT PRIMARY KEY, doc JSONB NOT NULL);
//! ```
//!
//! Documents go through the same domain schema as every other source.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::data_sources::{in_request_order, DataSource};
use crate::errors::{DataSourceError, EntityKind, NotFoundError};
use crate::models::validation::{parse_record_for, Validate};
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

/// Table names for the three record kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    irs: String,
    intents: String,
    api_keys: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            irs: "irs".to_string(),
            intents: "intents".to_string(),
            api_keys: "api_keys".to_string(),
        }
    }
}

impl Collections {
    /// Table names are interpolated into SQL, so only plain identifiers are
    /// accepted.
    pub fn new(irs: &str, intents: &str, api_keys: &str) -> Result<Self, DataSourceError> {
        for name in [irs, intents, api_keys] {
            if !is_identifier(name) {
                return Err(DataSourceError::Backend(format!(
                    "Invalid table name '{name}'"
                )));
            }
        }
        Ok(Self {
            irs: irs.to_string(),
            intents: intents.to_string(),
            api_keys: api_keys.to_string(),
        })
    }

    fn table(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Irs => &self.irs,
            EntityKind::Intent => &self.intents,
            EntityKind::ApiKey => &self.api_keys,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
pub struct PostgresDataSource {
    pool: PgPool,
    irs_id: String,
    collections: Collections,
}

impl PostgresDataSource {
    pub fn new(pool: PgPool, irs_id: impl Into<String>, collections: Collections) -> Self {
        Self {
            pool,
            irs_id: irs_id.into(),
            collections,
        }
    }

    /// Fetches all requested documents in one query, then restores request
    /// order.
    async fn fetch_many<T>(&self, ids: &[String]) -> Result<Vec<T>, DataSourceError>
    where
        T: serde::de::DeserializeOwned + Validate + Clone,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, doc FROM {} WHERE id = ANY($1)",
            self.collections.table(T::ENTITY)
        );
        let rows: Vec<(String, Value)> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        debug!(
            "Fetched {} of {} {} document(s)",
            rows.len(),
            ids.len(),
            T::ENTITY
        );

        let mut found = HashMap::with_capacity(rows.len());
        for (id, doc) in rows {
            let record = parse_record_for::<T>(&id, doc)?;
            found.insert(id, record);
        }
        in_request_order(T::ENTITY, ids, &found)
    }
}

#[async_trait]
impl DataSource for PostgresDataSource {
    async fn get_irs_record(&self) -> Result<IrsRecord, DataSourceError> {
        let sql = format!(
            "SELECT doc FROM {} WHERE id = $1",
            self.collections.table(EntityKind::Irs)
        );
        let doc: Option<Value> = sqlx::query_scalar(&sql)
            .bind(&self.irs_id)
            .fetch_optional(&self.pool)
            .await?;
        let doc = doc.ok_or_else(|| NotFoundError::new(EntityKind::Irs, &self.irs_id))?;
        Ok(parse_record_for(&self.irs_id, doc)?)
    }

    async fn get_intents(&self, ids: &[String]) -> Result<Vec<Intent>, DataSourceError> {
        self.fetch_many(ids).await
    }

    async fn get_api_keys(&self, keys: &[String]) -> Result<Vec<ApiKeyRecord>, DataSourceError> {
        self.fetch_many(keys).await
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
