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

//! Application configuration management.
//!
//! Persistent settings stored in TOML format via confy. Every field has a
//! serde default so partial or older config files keep loading.

use std::time::Duration;

use radar_client::{
    FeedConfig, PositionOptions, WidgetOptions, DEFAULT_BASE_TILE_TEMPLATE, DEFAULT_FEED_URL,
    DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_RADAR_OPACITY, DEFAULT_TILE_HOST, DEFAULT_ZOOM,
};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "radar-desktop";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Latitude used when no location attribute is given
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    /// Longitude used when no location attribute is given
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    /// Configured map latitude, kept as text; unparsable values fall back to the default
    #[serde(default)]
    pub map_latitude: Option<String>,

    /// Configured map longitude, kept as text
    #[serde(default)]
    pub map_longitude: Option<String>,

    /// Map zoom level used for the initial view and recentering
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Radar overlay opacity (0.0 - 1.0)
    #[serde(default = "default_radar_opacity")]
    pub radar_opacity: f32,

    /// Seconds between radar frame refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Radar frame index URL
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Frame index request timeout in seconds
    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,

    /// Host serving radar tiles
    #[serde(default = "default_tile_host")]
    pub tile_host: String,

    /// Base map tile template with {s}, {z}, {x}, {y} placeholders
    #[serde(default = "default_base_tile_template")]
    pub base_tile_template: String,

    /// Look up the current location on startup
    #[serde(default = "default_true")]
    pub geolocation_enabled: bool,

    /// Geolocation timeout in seconds
    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,

    /// Reuse a detected position younger than this many seconds
    #[serde(default = "default_geolocation_max_age_secs")]
    pub geolocation_max_age_secs: u64,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_latitude() -> f64 {
    DEFAULT_LATITUDE
}

fn default_longitude() -> f64 {
    DEFAULT_LONGITUDE
}

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

fn default_radar_opacity() -> f32 {
    DEFAULT_RADAR_OPACITY
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_feed_timeout_secs() -> u64 {
    15
}

fn default_tile_host() -> String {
    DEFAULT_TILE_HOST.to_string()
}

fn default_base_tile_template() -> String {
    DEFAULT_BASE_TILE_TEMPLATE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_geolocation_timeout_secs() -> u64 {
    10
}

fn default_geolocation_max_age_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
            map_latitude: None,
            map_longitude: None,
            zoom: default_zoom(),
            radar_opacity: default_radar_opacity(),
            refresh_interval_secs: default_refresh_interval_secs(),
            feed_url: default_feed_url(),
            feed_timeout_secs: default_feed_timeout_secs(),
            tile_host: default_tile_host(),
            base_tile_template: default_base_tile_template(),
            geolocation_enabled: true,
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            geolocation_max_age_secs: default_geolocation_max_age_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Widget settings derived from this configuration
    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            zoom: self.zoom,
            refresh_interval: Duration::from_secs(self.refresh_interval_secs.max(1)),
            radar_opacity: self.radar_opacity.clamp(0.0, 1.0),
            tile_host: self.tile_host.clone(),
            base_tile_template: self.base_tile_template.clone(),
            position_options: self.position_options(),
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url.clone(),
            timeout: Duration::from_secs(self.feed_timeout_secs),
        }
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: false,
            timeout: Duration::from_secs(self.geolocation_timeout_secs),
            maximum_age: Duration::from_secs(self.geolocation_max_age_secs),
        }
    }
}
