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

//! Bottom status bar showing radar and location state.

use chrono::{DateTime, Local, Utc};
use radar_client::{LocationSource, WidgetPhase, WidgetSnapshot};

/// Text shown for each part of the status bar, derived from a widget snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBar {
    pub radar: String,
    pub location: String,
}

impl StatusBar {
    pub fn from_snapshot(snapshot: &WidgetSnapshot) -> Self {
        let frame_time = snapshot.radar_layer.as_ref().and_then(|layer| layer.frame_time);

        let radar = match snapshot.phase {
            WidgetPhase::Uninitialized => "RADAR: --".to_string(),
            WidgetPhase::MapReady => "RADAR: NO DATA".to_string(),
            WidgetPhase::RadarLoading => "RADAR: LOADING".to_string(),
            WidgetPhase::RadarLoaded => format!("RADAR: {}", format_frame_time(frame_time)),
        };

        let location = match (&snapshot.map, snapshot.location_source) {
            (None, _) => "LOC: --".to_string(),
            (Some(map), LocationSource::Default) => {
                format!("LOC: {:.4}, {:.4} (configured)", map.latitude, map.longitude)
            }
            (Some(map), LocationSource::Detected) => {
                format!("LOC: {:.4}, {:.4} (detected)", map.latitude, map.longitude)
            }
        };

        Self { radar, location }
    }

    /// Render into a bottom panel
    pub fn show(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(&self.radar)
                    .color(egui::Color32::from_rgb(100, 180, 220))
                    .size(11.0)
                    .monospace(),
            );
            ui.separator();
            ui.label(
                egui::RichText::new(&self.location)
                    .color(egui::Color32::from_rgb(150, 150, 150))
                    .size(11.0)
                    .monospace(),
            );
        });
    }
}

fn format_frame_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "LIVE".to_string(),
        |time| time.with_timezone(&Local).format("%H:%M").to_string(),
    )
}
