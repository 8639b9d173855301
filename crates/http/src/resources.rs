//! Administrative resource calls used by the list and detail screens

use crate::gateway::{ApiError, AuthGateway};
use crate::types::ResourceKind;
use reqwest::Method;
use serde::de::DeserializeOwned;

impl AuthGateway {
    /// List every item of a resource collection
    pub async fn list_resources<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
    ) -> Result<Vec<T>, ApiError> {
        let request = self.request(Method::GET, &kind.collection_path());
        self.execute(request).await
    }

    /// Fetch a single item
    pub async fn get_resource<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, &kind.item_path(id));
        self.execute(request).await
    }

    /// Delete a single item
    pub async fn delete_resource(&self, kind: ResourceKind, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &kind.item_path(id));
        self.execute_empty(request).await
    }
}
