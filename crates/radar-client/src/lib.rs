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

//! Weather radar map widget core.
//!
//! This library holds everything behind a radar overlay map that is not
//! drawing: the frame index of the weather-tile service, one-shot
//! geolocation, session storage, and the widget state machine that ties
//! them together.
//!
//! - **Frames**: wire model of the frame index and tile URL templates
//! - **Feed**: async HTTP client for the frame index
//! - **Geolocation**: one-shot position lookup with timeout and caching
//! - **Widget**: map view, user marker, radar layer and refresh schedule
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use radar_client::{
//!     FeedConfig, Geolocator, HostElement, IpGeolocator, IpLocationProvider, RadarWidget,
//!     RainViewerClient, SessionStore, WidgetOptions, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = Arc::new(RainViewerClient::new(FeedConfig::default())?);
//!     let geolocator: Arc<dyn Geolocator> = Arc::new(IpGeolocator::new(IpLocationProvider::defaults())?);
//!     let widget = RadarWidget::new(feed, Some(geolocator), SessionStore::new(), WidgetOptions::default());
//!
//!     let host = HostElement::new().with_attribute("lat", "40.0");
//!     widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
//!     widget.init_geolocation().await;
//!
//!     if let Some(layer) = widget.radar_layer() {
//!         println!("radar tiles: {}", layer.url_template);
//!     }
//!     Ok(())
//! }
//! ```

pub mod feed;
pub mod frames;
pub mod geolocation;
pub mod host;
pub mod session;
pub mod widget;

pub use feed::{FeedConfig, FeedError, FrameFeed, RainViewerClient, DEFAULT_FEED_URL};
pub use frames::{radar_tile_template, RadarFrame, RadarFrames, TileTemplate, WeatherMaps, DEFAULT_TILE_HOST};
pub use geolocation::{GeolocationError, Geolocator, IpGeolocator, IpLocationProvider, Position, PositionOptions};
pub use host::{HostElement, LAT_ATTRIBUTE, LON_ATTRIBUTE};
pub use session::{SessionStore, SESSION_LAT_KEY, SESSION_LON_KEY};
pub use widget::{
    LocationSource, MapView, MarkerLabel, RadarLayer, RadarWidget, UserMarker, WidgetEvent, WidgetOptions,
    WidgetPhase, WidgetSnapshot, DEFAULT_BASE_TILE_TEMPLATE, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
    DEFAULT_RADAR_OPACITY, DEFAULT_REFRESH_INTERVAL, DEFAULT_ZOOM,
};
