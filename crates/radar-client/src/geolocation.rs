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

//! One-shot geolocation.
//!
//! A [`Geolocator`] answers a single position query. The IP-based
//! implementation walks a list of public lookup services and takes the
//! first usable answer.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use thiserror::Error;

/// Geolocation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Upper bound for the whole request.
    pub timeout: Duration,
    /// A cached position younger than this is returned without a lookup.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(300),
        }
    }
}

/// A resolved position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub acquired_at: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            acquired_at: Utc::now(),
        }
    }

    fn age(&self) -> Duration {
        (Utc::now() - self.acquired_at).to_std().unwrap_or_default()
    }
}

/// Capability that resolves the user's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<Position, GeolocationError>;
}

/// An IP geolocation service and the JSON fields carrying its coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLocationProvider {
    pub name: String,
    pub url: String,
    pub latitude_field: String,
    pub longitude_field: String,
}

impl IpLocationProvider {
    pub fn new(name: &str, url: &str, latitude_field: &str, longitude_field: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            latitude_field: latitude_field.to_string(),
            longitude_field: longitude_field.to_string(),
        }
    }

    /// ipapi.co, then ip-api.com (no API key needed for either)
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("ipapi.co", "https://ipapi.co/json/", "latitude", "longitude"),
            Self::new("ip-api.com", "http://ip-api.com/json/", "lat", "lon"),
        ]
    }

    fn extract(&self, value: &serde_json::Value) -> Option<(f64, f64)> {
        let lat = value.get(&self.latitude_field).and_then(serde_json::Value::as_f64)?;
        let lon = value.get(&self.longitude_field).and_then(serde_json::Value::as_f64)?;
        Some((lat, lon))
    }
}

/// Geolocator backed by IP lookup services.
///
/// High accuracy cannot be honored by an IP lookup and is ignored.
#[derive(Debug)]
pub struct IpGeolocator {
    client: reqwest::Client,
    providers: Vec<IpLocationProvider>,
    last_fix: Mutex<Option<Position>>,
}

impl IpGeolocator {
    pub fn new(providers: Vec<IpLocationProvider>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("radar-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            providers,
            last_fix: Mutex::new(None),
        })
    }

    fn cached(&self, maximum_age: Duration) -> Option<Position> {
        let last_fix = self.last_fix.lock().ok()?;
        (*last_fix).filter(|position| position.age() < maximum_age)
    }

    async fn lookup(&self) -> Result<Position, GeolocationError> {
        for provider in &self.providers {
            match self.query(provider).await {
                Some((latitude, longitude)) => {
                    info!("Location found via {}: {}, {}", provider.name, latitude, longitude);
                    return Ok(Position::new(latitude, longitude));
                }
                None => debug!("No usable location from {}", provider.name),
            }
        }

        Err(GeolocationError::PositionUnavailable(
            "no lookup service returned a location".to_string(),
        ))
    }

    async fn query(&self, provider: &IpLocationProvider) -> Option<(f64, f64)> {
        let response = self.client.get(&provider.url).send().await.ok()?;
        if !response.status().is_success() {
            debug!("{} answered HTTP {}", provider.name, response.status());
            return None;
        }
        let value: serde_json::Value = response.json().await.ok()?;
        provider.extract(&value)
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self, options: PositionOptions) -> Result<Position, GeolocationError> {
        if let Some(position) = self.cached(options.maximum_age) {
            debug!("Using cached position from {}", position.acquired_at);
            return Ok(position);
        }

        let position = tokio::time::timeout(options.timeout, self.lookup())
            .await
            .map_err(|_elapsed| GeolocationError::Timeout(options.timeout))??;

        if let Ok(mut last_fix) = self.last_fix.lock() {
            *last_fix = Some(position);
        }

        Ok(position)
    }
}
