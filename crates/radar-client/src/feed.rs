// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client for the weather-tile service's frame index.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;

use crate::frames::WeatherMaps;

/// Default frame index endpoint
pub const DEFAULT_FEED_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";

/// Errors that can occur while fetching the frame index.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {0}")]
    Status(u16),

    #[error("malformed frame index: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame index has no past radar frames")]
    NoFrames,
}

/// Source of radar frame indexes.
#[async_trait]
pub trait FrameFeed: Send + Sync {
    /// Fetch the current frame index.
    async fn fetch(&self) -> Result<WeatherMaps, FeedError>;
}

/// Configuration for the RainViewer client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Frame index URL.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Frame feed backed by the public RainViewer API.
#[derive(Debug, Clone)]
pub struct RainViewerClient {
    client: reqwest::Client,
    config: FeedConfig,
}

impl RainViewerClient {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("radar-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl FrameFeed for RainViewerClient {
    async fn fetch(&self) -> Result<WeatherMaps, FeedError> {
        debug!("Fetching radar frame index from {}", self.config.url);

        let response = self.client.get(&self.config.url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        // Decode from text so malformed payloads surface as Malformed rather than Request
        let body = response.text().await?;
        let maps: WeatherMaps = serde_json::from_str(&body)?;
        Ok(maps)
    }
}
