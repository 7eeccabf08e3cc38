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

//! User location marker drawn as a walkers plugin.

use egui::{vec2, Color32, FontId, Rect, Response, Stroke, Ui};
use radar_client::{MarkerLabel, UserMarker};
use walkers::{lon_lat, MapMemory, Plugin, Projector};

const DOT_RADIUS: f32 = 7.0;
const LABEL_OFFSET: f32 = 22.0;
const LABEL_PADDING: egui::Vec2 = vec2(8.0, 4.0);

/// Draws the marker dot and its popup label
#[derive(Debug)]
pub struct UserMarkerPlugin {
    marker: UserMarker,
}

impl UserMarkerPlugin {
    pub fn new(marker: UserMarker) -> Self {
        Self { marker }
    }

    fn dot_color(label: MarkerLabel) -> Color32 {
        match label {
            MarkerLabel::Configured => Color32::from_rgb(52, 120, 246),
            MarkerLabel::Detected => Color32::from_rgb(46, 204, 113),
        }
    }
}

impl Plugin for UserMarkerPlugin {
    fn run(self: Box<Self>, ui: &mut Ui, _response: &Response, projector: &Projector, _memory: &MapMemory) {
        let screen = projector.project(lon_lat(self.marker.longitude, self.marker.latitude));
        let center = egui::pos2(screen.x, screen.y);
        let painter = ui.painter();

        painter.circle(
            center,
            DOT_RADIUS,
            Self::dot_color(self.marker.label),
            Stroke::new(2.0, Color32::WHITE),
        );

        let galley = painter.layout_no_wrap(
            self.marker.label.text().to_string(),
            FontId::proportional(13.0),
            Color32::from_rgb(30, 30, 30),
        );
        let popup = Rect::from_center_size(
            center - vec2(0.0, LABEL_OFFSET),
            galley.size() + LABEL_PADDING * 2.0,
        );
        painter.rect_filled(popup, 4.0, Color32::from_white_alpha(235));
        painter.galley(popup.min + LABEL_PADDING, galley, Color32::BLACK);
    }
}
