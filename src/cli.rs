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

//! Command line arguments.

use clap::Parser;

use crate::config::AppConfig;

/// Weather radar map centered on your location
#[derive(Parser, Debug, Default)]
#[command(name = "radar-desktop", version, about)]
pub struct Args {
    /// Map latitude; unparsable values fall back to the configured default
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// Map longitude; unparsable values fall back to the configured default
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<String>,

    /// Skip looking up the current location
    #[arg(long)]
    pub no_geolocation: bool,

    /// Radar overlay opacity (0.0 - 1.0)
    #[arg(long)]
    pub opacity: Option<f32>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    pub save_config: bool,
}

impl Args {
    /// Overlay command line values on the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(lat) = &self.lat {
            config.map_latitude = Some(lat.clone());
        }
        if let Some(lon) = &self.lon {
            config.map_longitude = Some(lon.clone());
        }
        if self.no_geolocation {
            config.geolocation_enabled = false;
        }
        if let Some(opacity) = self.opacity {
            config.radar_opacity = opacity;
        }
    }
}
