use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Item, ItemDraft, ItemId},
    protocol::ReorderResponse,
};
use tracing::debug;
use url::Url;

use crate::error::NetworkError;

/// Stateless transport for the item resource.
///
/// Implementors provide the raw wire listing through [`fetch_items`]; callers
/// use [`fetch_all`], which re-sorts by `sort_order` so the wire order is
/// never trusted.
///
/// [`fetch_items`]: PersistenceGateway::fetch_items
/// [`fetch_all`]: PersistenceGateway::fetch_all
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn fetch_items(&self) -> Result<Vec<Item>, NetworkError>;
    async fn create(&self, draft: &ItemDraft) -> Result<Item, NetworkError>;
    async fn update(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item, NetworkError>;
    async fn remove(&self, item_id: ItemId) -> Result<(), NetworkError>;
    /// Submits the complete ordered id list. Position becomes `sort_order`.
    async fn reorder(&self, item_ids: &[ItemId]) -> Result<ReorderResponse, NetworkError>;

    async fn fetch_all(&self) -> Result<Vec<Item>, NetworkError> {
        let mut items = self.fetch_items().await?;
        sort_by_sort_order(&mut items);
        Ok(items)
    }
}

/// Ascending `sort_order`; ties fall back to id so the result is deterministic.
pub fn sort_by_sort_order(items: &mut [Item]) {
    items.sort_by_key(|item| (item.sort_order, item.id));
}

/// Base URL plus a shared reqwest client.
#[derive(Clone)]
pub(crate) struct HttpEndpoint {
    http: Client,
    base_url: Url,
}

impl HttpEndpoint {
    pub(crate) fn new(base_url: &str) -> Result<Self, NetworkError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|e| NetworkError::new("parse server url", None, e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, operation: &'static str, path: &str) -> Result<Url, NetworkError> {
        self.base_url
            .join(path)
            .map_err(|e| NetworkError::new(operation, None, e.to_string()))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, NetworkError> {
        let response = self.send(operation, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::transport(operation, e))
    }

    pub(crate) async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, NetworkError> {
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::transport(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::from_response_body(
                operation,
                status.as_u16(),
                &body,
            ));
        }
        debug!(operation, status = status.as_u16(), "request succeeded");
        Ok(response)
    }
}

/// [`PersistenceGateway`] over the REST item resource.
#[derive(Clone)]
pub struct HttpGateway {
    endpoint: HttpEndpoint,
}

impl HttpGateway {
    pub fn new(server_url: &str) -> Result<Self, NetworkError> {
        Ok(Self {
            endpoint: HttpEndpoint::new(server_url)?,
        })
    }
}

#[async_trait]
impl PersistenceGateway for HttpGateway {
    async fn fetch_items(&self) -> Result<Vec<Item>, NetworkError> {
        const OP: &str = "fetch items";
        let url = self.endpoint.url(OP, "items/")?;
        self.endpoint
            .send_json(OP, self.endpoint.http().get(url))
            .await
    }

    async fn create(&self, draft: &ItemDraft) -> Result<Item, NetworkError> {
        const OP: &str = "create item";
        let url = self.endpoint.url(OP, "items/")?;
        self.endpoint
            .send_json(OP, self.endpoint.http().post(url).json(draft))
            .await
    }

    async fn update(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item, NetworkError> {
        const OP: &str = "update item";
        let url = self.endpoint.url(OP, &format!("items/{item_id}"))?;
        self.endpoint
            .send_json(OP, self.endpoint.http().put(url).json(draft))
            .await
    }

    async fn remove(&self, item_id: ItemId) -> Result<(), NetworkError> {
        const OP: &str = "delete item";
        let url = self.endpoint.url(OP, &format!("items/{item_id}"))?;
        self.endpoint
            .send(OP, self.endpoint.http().delete(url))
            .await?;
        Ok(())
    }

    async fn reorder(&self, item_ids: &[ItemId]) -> Result<ReorderResponse, NetworkError> {
        const OP: &str = "reorder items";
        let url = self.endpoint.url(OP, "items/reorder/")?;
        self.endpoint
            .send_json(OP, self.endpoint.http().put(url).json(item_ids))
            .await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
