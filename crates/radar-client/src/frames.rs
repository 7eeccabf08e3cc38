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

//! Radar frame index model and tile URL templates.
//!
//! The weather-tile service publishes an index of timestamped radar frames.
//! Each frame is identified by a path fragment that is spliced into a tile
//! URL template addressed by zoom/x/y.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Default host serving radar tiles
pub const DEFAULT_TILE_HOST: &str = "https://tilecache.rainviewer.com";

/// Tile size segment used in radar tile URLs
const RADAR_TILE_SIZE: u32 = 256;

/// Color scheme (2 = universal blue) and options (smooth, snow) segments
const RADAR_COLOR_SCHEME: u32 = 2;
const RADAR_OPTIONS: &str = "1_1";

/// Frame index as returned by the weather-tile service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WeatherMaps {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub generated: Option<i64>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub radar: Option<RadarFrames>,
}

/// Radar section of the frame index.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RadarFrames {
    /// Historical frames ordered oldest to newest.
    #[serde(default)]
    pub past: Vec<RadarFrame>,
    /// Forecast frames. Parsed but never displayed.
    #[serde(default)]
    pub nowcast: Vec<RadarFrame>,
}

/// A single timestamped radar image reference.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RadarFrame {
    /// Unix timestamp in seconds.
    pub time: i64,
    /// Path fragment, e.g. `/v2/radar/1700000000`.
    pub path: String,
}

impl RadarFrame {
    /// Frame timestamp as UTC time, if representable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

impl WeatherMaps {
    /// Most recent past frame (the last element of the past list)
    pub fn latest_past_frame(&self) -> Option<&RadarFrame> {
        self.radar.as_ref().and_then(|radar| radar.past.last())
    }
}

/// Build the radar tile URL template for a frame path.
///
/// The result keeps `{z}`, `{x}` and `{y}` placeholders for the tile renderer.
pub fn radar_tile_template(tile_host: &str, frame_path: &str) -> String {
    format!(
        "{}{}/{}/{{z}}/{{x}}/{{y}}/{}/{}.png",
        tile_host.trim_end_matches('/'),
        frame_path,
        RADAR_TILE_SIZE,
        RADAR_COLOR_SCHEME,
        RADAR_OPTIONS
    )
}

/// Slippy-map URL template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTemplate {
    template: String,
    subdomains: Vec<char>,
}

impl TileTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: vec!['a', 'b', 'c'],
        }
    }

    /// Override the subdomains substituted for `{s}`
    #[must_use]
    pub fn with_subdomains(mut self, subdomains: &[char]) -> Self {
        self.subdomains = subdomains.to_vec();
        self
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Expand the template for a single tile.
    ///
    /// Subdomains are load balanced on `(x + y) % n`.
    pub fn expand(&self, zoom: u8, x: u32, y: u32) -> String {
        let mut url = self
            .template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string());

        if url.contains("{s}") {
            let subdomain = if self.subdomains.is_empty() {
                String::new()
            } else {
                let index = (u64::from(x) + u64::from(y)) % self.subdomains.len() as u64;
                self.subdomains[usize::try_from(index).unwrap_or(0)].to_string()
            };
            url = url.replace("{s}", &subdomain);
        }

        url
    }
}
