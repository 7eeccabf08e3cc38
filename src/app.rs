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

//! Main application window.
//!
//! Hosts the radar widget on a walkers map. The widget owns all state; this
//! window only mirrors it into tiles and map memory each frame.

use std::sync::Arc;

use eframe::egui;
use log::{debug, info, warn};
use radar_client::{
    Geolocator, HostElement, IpGeolocator, IpLocationProvider, RadarWidget, RainViewerClient, SessionStore,
    WidgetSnapshot, LAT_ATTRIBUTE, LON_ATTRIBUTE,
};
use tokio::sync::broadcast::error::RecvError;
use walkers::{lon_lat, HttpOptions, HttpTiles, Map, MapMemory};

use crate::config::AppConfig;
use crate::map::{tile_cache_dir, BaseTileSource, UserMarkerPlugin};
use crate::ui::StatusBar;
use crate::weather::RadarTiles;

pub struct RadarApp {
    widget: RadarWidget,
    host: HostElement,
    base_tiles: HttpTiles,
    radar_tiles: RadarTiles,
    map_memory: MapMemory,
    /// Map view revision last pushed into `map_memory`
    applied_revision: Option<u64>,
}

impl std::fmt::Debug for RadarApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarApp")
            .field("widget", &self.widget)
            .field("radar_tiles", &self.radar_tiles)
            .finish_non_exhaustive()
    }
}

impl RadarApp {
    /// Build the widget, mount it and start radar and location lookups.
    ///
    /// Must be called with a tokio runtime entered.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let ctx = cc.egui_ctx.clone();

        let feed = Arc::new(RainViewerClient::new(config.feed_config())?);
        let geolocator: Option<Arc<dyn Geolocator>> = if config.geolocation_enabled {
            Some(Arc::new(IpGeolocator::new(IpLocationProvider::defaults())?))
        } else {
            info!("Geolocation disabled by configuration");
            None
        };

        let widget = RadarWidget::new(feed, geolocator, SessionStore::new(), config.widget_options());
        spawn_repaint_listener(&widget, ctx.clone());

        let host = HostElement::new()
            .with_optional_attribute(LAT_ATTRIBUTE, config.map_latitude.clone())
            .with_optional_attribute(LON_ATTRIBUTE, config.map_longitude.clone());
        widget.initialize(&host, config.default_latitude, config.default_longitude);

        let locator = widget.clone();
        tokio::spawn(async move {
            locator.init_geolocation().await;
        });

        let http_options = HttpOptions {
            cache: Some(tile_cache_dir("base")),
            ..Default::default()
        };
        let base_tiles = HttpTiles::with_options(
            BaseTileSource::new(&config.base_tile_template),
            http_options,
            ctx,
        );

        Ok(Self {
            widget,
            host,
            base_tiles,
            radar_tiles: RadarTiles::new(),
            map_memory: MapMemory::default(),
            applied_revision: None,
        })
    }

    /// Mirror widget state into the renderer-side map memory and tiles
    fn sync_with_widget(&mut self, snapshot: &WidgetSnapshot, ctx: &egui::Context) {
        match &snapshot.radar_layer {
            Some(layer) => self.radar_tiles.sync(layer, ctx),
            None => self.radar_tiles.clear(),
        }

        if let Some(map) = &snapshot.map {
            if self.applied_revision != Some(map.revision) {
                // Snap back onto the marker at the widget's zoom
                self.map_memory.follow_my_position();
                if self.map_memory.set_zoom(map.zoom).is_err() {
                    warn!("Zoom level {} not supported by the map", map.zoom);
                }
                self.applied_revision = Some(map.revision);
                debug!("Map view moved to {}, {}", map.latitude, map.longitude);
            }
        }
    }
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.widget.snapshot();
        self.sync_with_widget(&snapshot, ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            StatusBar::from_snapshot(&snapshot).show(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(map_view) = &snapshot.map else {
                ui.centered_and_justified(|ui| {
                    ui.label("Initializing map...");
                });
                return;
            };

            let center = lon_lat(map_view.longitude, map_view.latitude);
            let mut map = Map::new(Some(&mut self.base_tiles), &mut self.map_memory, center);

            if let (Some(tiles), Some(layer)) = (self.radar_tiles.tiles_mut(), &snapshot.radar_layer) {
                map = map.with_layer(tiles, layer.opacity);
            }
            if let Some(marker) = snapshot.marker {
                map = map.with_plugin(UserMarkerPlugin::new(marker));
            }

            ui.add(map);
        });
    }
}

impl Drop for RadarApp {
    fn drop(&mut self) {
        info!("Closing radar window");
        // Ends the refresh schedule
        self.host.remove();
    }
}

/// Repaint whenever the widget reports a change from a background task
fn spawn_repaint_listener(widget: &RadarWidget, ctx: egui::Context) {
    let mut events = widget.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    debug!("Widget event: {:?}", event);
                    ctx.request_repaint();
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} widget events", skipped);
                    ctx.request_repaint();
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
