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

//! RainViewer radar tile source implementation.

use eframe::egui;
use log::debug;
use radar_client::{RadarLayer, TileTemplate};
use walkers::sources::{Attribution, TileSource};
use walkers::{HttpOptions, HttpTiles, TileId};

use crate::map::tile_cache_dir;

/// Tile source for one radar frame
#[derive(Debug, Clone)]
pub struct RainViewerSource {
    template: TileTemplate,
}

impl RainViewerSource {
    /// Create a source from a radar URL template with `{z}/{x}/{y}` placeholders
    pub fn new(url_template: &str) -> Self {
        Self {
            template: TileTemplate::new(url_template),
        }
    }
}

impl TileSource for RainViewerSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.template.expand(tile_id.zoom, tile_id.x, tile_id.y)
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "Radar data © RainViewer",
            url: "https://www.rainviewer.com/",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Renderer-side tiles for the widget's radar layer.
///
/// walkers caches tiles by id, so a frame swap needs a fresh `HttpTiles`.
/// The layer's id and opacity live on the widget and are unaffected.
pub struct RadarTiles {
    /// (layer id, generation) currently loaded
    loaded: Option<(u64, u64)>,
    tiles: Option<HttpTiles>,
}

impl std::fmt::Debug for RadarTiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarTiles")
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl RadarTiles {
    pub fn new() -> Self {
        Self {
            loaded: None,
            tiles: None,
        }
    }

    /// Whether `layer` differs from what is loaded
    pub fn needs_rebuild(&self, layer: &RadarLayer) -> bool {
        self.loaded != Some((layer.id, layer.generation))
    }

    /// Bring the tiles in line with `layer`, rebuilding on a frame swap.
    pub fn sync(&mut self, layer: &RadarLayer, ctx: &egui::Context) {
        if !self.needs_rebuild(layer) && self.tiles.is_some() {
            return;
        }

        debug!("Loading radar tiles for {}", layer.frame_path);

        let http_options = HttpOptions {
            cache: Some(tile_cache_dir("radar")),
            ..Default::default()
        };
        let source = RainViewerSource::new(&layer.url_template);
        self.tiles = Some(HttpTiles::with_options(source, http_options, ctx.clone()));
        self.loaded = Some((layer.id, layer.generation));
    }

    /// Drop the tiles when the widget has no radar layer
    pub fn clear(&mut self) {
        self.tiles = None;
        self.loaded = None;
    }

    pub fn tiles_mut(&mut self) -> Option<&mut HttpTiles> {
        self.tiles.as_mut()
    }
}

impl Default for RadarTiles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_client::{radar_tile_template, DEFAULT_TILE_HOST};

    fn layer(id: u64, generation: u64) -> RadarLayer {
        RadarLayer {
            id,
            opacity: 0.6,
            z_index: 10,
            url_template: radar_tile_template(DEFAULT_TILE_HOST, "/v2/radar/1700000600"),
            frame_path: "/v2/radar/1700000600".to_string(),
            frame_time: None,
            generation,
        }
    }

    #[test]
    fn test_radar_tile_url() {
        let source = RainViewerSource::new(&layer(1, 0).url_template);
        assert_eq!(
            source.tile_url(TileId { x: 32, y: 47, zoom: 7 }),
            "https://tilecache.rainviewer.com/v2/radar/1700000600/256/7/32/47/2/1_1.png"
        );
    }

    #[test]
    fn test_rebuild_tracks_layer_generation() {
        let mut tiles = RadarTiles::new();
        assert!(tiles.needs_rebuild(&layer(1, 0)));

        tiles.loaded = Some((1, 0));
        assert!(!tiles.needs_rebuild(&layer(1, 0)));
        assert!(tiles.needs_rebuild(&layer(1, 1)));
        assert!(tiles.needs_rebuild(&layer(2, 0)));

        tiles.clear();
        assert!(tiles.needs_rebuild(&layer(1, 0)));
        assert!(tiles.tiles_mut().is_none());
    }
}
