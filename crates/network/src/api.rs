// crates/network/src/api.rs
//! Audiobook REST endpoints

use crate::client::{Client, ClientConfig};
use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use log::{debug, info};
use narrate_core::{Audiobook, AudiobookId, ProgressUpdate};
use narrate_sync::{ProgressReporter, SyncResult};
use reqwest::Url;

/// Client for the audiobook API
///
/// - `GET {base}/audiobooks/{id}` returns an audiobook
/// - `POST {base}/audiobooks/{id}/progress` records a listening position
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, config: ClientConfig) -> NetworkResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(NetworkError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::with_config(config)?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches an audiobook with its chapter list
    pub async fn fetch_audiobook(&self, id: &AudiobookId) -> NetworkResult<Audiobook> {
        let url = self.endpoint(&["audiobooks", id.as_str()])?;
        debug!("GET {}", url);
        let audiobook: Audiobook = self.client.get_json(url).await?;
        info!(
            "Fetched \"{}\" ({} chapters)",
            audiobook.title,
            audiobook.chapter_count()
        );
        Ok(audiobook)
    }

    /// Records a listening position. Never retried.
    pub async fn post_progress(
        &self,
        id: &AudiobookId,
        update: &ProgressUpdate,
    ) -> NetworkResult<()> {
        let url = self.endpoint(&["audiobooks", id.as_str(), "progress"])?;
        debug!("POST {}", url);
        self.client.post_json(url, update).await
    }

    fn endpoint(&self, segments: &[&str]) -> NetworkResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| NetworkError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ProgressReporter for ApiClient {
    async fn report(&self, audiobook: &AudiobookId, update: &ProgressUpdate) -> SyncResult<()> {
        self.post_progress(audiobook, update)
            .await
            .map_err(|e| e.into_sync_error(audiobook.as_str()))
    }
}
