//! services/api/src/adapters/storage.rs
//!
//! Implements the `BlobStorage` port against an HTTP object store that accepts
//! `PUT` and `DELETE` on `{base_url}/{key}` with a bearer token. Uploaded objects
//! are served back from the same URL.

use async_trait::async_trait;
use campus_core::ports::{BlobStorage, PortError, PortResult};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

use crate::config::StorageConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HttpBlobStorage {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpBlobStorage {
    pub fn new(config: &StorageConfig) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl BlobStorage for HttpBlobStorage {
    async fn upload(&self, key: &str, content_type: &str, data: Vec<u8>) -> PortResult<String> {
        let url = self.object_url(key);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("storage request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unavailable(format!(
                "storage rejected upload with status {}",
                response.status()
            )));
        }
        Ok(url)
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("storage request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(PortError::Unavailable(format!(
                "storage rejected delete with status {}",
                status
            ))),
        }
    }
}

/// Used when no storage endpoint is configured.
#[derive(Clone, Default)]
pub struct DisabledStorage;

#[async_trait]
impl BlobStorage for DisabledStorage {
    async fn upload(&self, _key: &str, _content_type: &str, _data: Vec<u8>) -> PortResult<String> {
        Err(PortError::Unavailable("file storage is not configured".to_string()))
    }

    async fn delete(&self, _key: &str) -> PortResult<()> {
        Err(PortError::Unavailable("file storage is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_join_without_double_slashes() {
        let storage = HttpBlobStorage::new(&StorageConfig {
            base_url: "https://files.example.com/bucket".to_string(),
            api_key: "secret".to_string(),
        })
        .unwrap();
        assert_eq!(
            storage.object_url("/resumes/a.pdf"),
            "https://files.example.com/bucket/resumes/a.pdf"
        );
    }
}
