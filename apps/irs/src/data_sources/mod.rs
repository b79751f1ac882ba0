//! Data sources: one async read contract with three interchangeable variants.
//!
//! - `InMemoryDataSource`: static fixtures (JSON files or values built in code)
//! - `PostgresDataSource`: JSONB documents in PostgreSQL tables
//! - `RemoteDataSource`: a remote HTTP service
//!
//! The assembler holds a `&dyn DataSource` and never branches on the variant.
//! Every variant returns records in the order the ids were requested and fails
//! the whole call on the first id it cannot resolve.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::{DataSourceError, EntityKind, NotFoundError};
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

pub mod memory;
pub mod postgres;
pub mod remote;

pub use memory::{Fixtures, InMemoryDataSource};
pub use postgres::{Collections, PostgresDataSource};
pub use remote::RemoteDataSource;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// The IRS record this source was configured for.
    async fn get_irs_record(&self) -> Result<IrsRecord, DataSourceError>;

    async fn get_intents(&self, ids: &[String]) -> Result<Vec<Intent>, DataSourceError>;

    async fn get_api_keys(&self, keys: &[String]) -> Result<Vec<ApiKeyRecord>, DataSourceError>;

    /// Short label for logs.
    fn kind(&self) -> &'static str;
}

/// Reassembles looked-up records in request order. The first id with no
/// record fails the call.
pub(crate) fn in_request_order<T: Clone>(
    kind: EntityKind,
    ids: &[String],
    found: &HashMap<String, T>,
) -> Result<Vec<T>, DataSourceError> {
    ids.iter()
        .map(|id| {
            found
                .get(id)
                .cloned()
                .ok_or_else(|| NotFoundError::new(kind, id).into())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_request_order_preserves_order_and_duplicates() {
        let found: HashMap<String, u32> =
            [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(in_request_order(EntityKind::Intent, &ids, &found).unwrap(), vec![2, 1, 2]);
    }

    #[test]
    fn test_in_request_order_fails_on_first_missing() {
        let found: HashMap<String, u32> = [("a".to_string(), 1)].into_iter().collect();
        let ids = vec!["a".to_string(), "X".to_string(), "Y".to_string()];
        match in_request_order(EntityKind::Intent, &ids, &found) {
            Err(DataSourceError::NotFound(e)) => assert_eq!(e.id, "X"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
