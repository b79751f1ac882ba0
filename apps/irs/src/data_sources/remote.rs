//! Remote-service source. Records are fetched one per request:
//! `GET {base}/irs/{id}`, `GET {base}/intents/{id}`, `GET {base}/api-keys/{key}`.
//! A 404 is a not-found for that id; multi-id lookups run concurrently.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::data_sources::DataSource;
use crate::errors::{DataSourceError, EntityKind, NotFoundError};
use crate::models::validation::{parse_record_for, Validate};
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RemoteDataSource {
    client: Client,
    base_url: Url,
    irs_id: String,
}

impl RemoteDataSource {
    pub fn new(base_url: &str, irs_id: impl Into<String>) -> Result<Self, DataSourceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DataSourceError::Backend(format!("Invalid remote URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DataSourceError::Backend(format!(
                "Remote URL '{base_url}' cannot be used as a base"
            )));
        }
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url,
            irs_id: irs_id.into(),
        })
    }

    fn record_url(&self, kind: EntityKind, id: &str) -> Url {
        let collection = match kind {
            EntityKind::Irs => "irs",
            EntityKind::Intent => "intents",
            EntityKind::ApiKey => "api-keys",
        };
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so path segments are available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection).push(id);
        }
        url
    }

    async fn fetch_one<T>(&self, id: &str) -> Result<T, DataSourceError>
    where
        T: serde::de::DeserializeOwned + Validate,
    {
        let url = self.record_url(T::ENTITY, id);
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(NotFoundError::new(T::ENTITY, id).into()),
            status if status.is_success() => {
                let doc: Value = response.json().await?;
                Ok(parse_record_for(id, doc)?)
            }
            status => Err(DataSourceError::Backend(format!(
                "Remote source returned {status} for {} '{id}'",
                T::ENTITY
            ))),
        }
    }

    /// Concurrent lookups; results keep request order and the first failure
    /// aborts the rest.
    async fn fetch_many<T>(&self, ids: &[String]) -> Result<Vec<T>, DataSourceError>
    where
        T: serde::de::DeserializeOwned + Validate,
    {
        try_join_all(ids.iter().map(|id| self.fetch_one::<T>(id))).await
    }
}

#[async_trait]
impl DataSource for RemoteDataSource {
    async fn get_irs_record(&self) -> Result<IrsRecord, DataSourceError> {
        self.fetch_one(&self.irs_id).await
    }

    async fn get_intents(&self, ids: &[String]) -> Result<Vec<Intent>, DataSourceError> {
        self.fetch_many(ids).await
    }

    async fn get_api_keys(&self, keys: &[String]) -> Result<Vec<ApiKeyRecord>, DataSourceError> {
        self.fetch_many(keys).await
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}
