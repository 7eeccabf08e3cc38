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

use std::path::PathBuf;

use radar_client::TileTemplate;
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

/// Tile source for the base map, expanded from a slippy-map URL template.
/// `{s}` is load balanced across a-c subdomains.
#[derive(Debug, Clone)]
pub struct BaseTileSource {
    template: TileTemplate,
}

impl BaseTileSource {
    pub fn new(template: &str) -> Self {
        Self {
            template: TileTemplate::new(template),
        }
    }
}

impl TileSource for BaseTileSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.template.expand(tile_id.zoom, tile_id.x, tile_id.y)
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenStreetMap contributors",
            url: "https://www.openstreetmap.org/copyright",
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// On-disk HTTP cache directory for a tile layer
pub fn tile_cache_dir(layer: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("radar-desktop")
        .join("tiles")
        .join(layer)
}
