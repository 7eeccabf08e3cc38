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

//! Radar map widget state and orchestration.
//!
//! The widget owns the map view, the user marker, the radar overlay layer and
//! the refresh schedule. It renders nothing itself; a front end reads
//! [`RadarWidget::snapshot`] and repaints on [`WidgetEvent`]s.
//!
//! Operations that start background work spawn onto the current tokio
//! runtime. Outside a runtime the map is still built, but no radar frames
//! are loaded.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::feed::{FeedError, FrameFeed};
use crate::frames::{radar_tile_template, RadarFrame, DEFAULT_TILE_HOST};
use crate::geolocation::{Geolocator, PositionOptions};
use crate::host::{HostElement, LAT_ATTRIBUTE, LON_ATTRIBUTE};
use crate::session::{SessionStore, SESSION_LAT_KEY, SESSION_LON_KEY};

/// Fallback center when the host carries no usable coordinates (Chicago)
pub const DEFAULT_LATITUDE: f64 = 41.8781;
pub const DEFAULT_LONGITUDE: f64 = -87.6298;

/// Zoom level used for the initial view and every recenter
pub const DEFAULT_ZOOM: f64 = 7.0;

/// Interval between radar refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

pub const DEFAULT_RADAR_OPACITY: f32 = 0.6;

/// Base map tile template
pub const DEFAULT_BASE_TILE_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Z-index of the radar overlay, above the base layer at 0
const RADAR_Z_INDEX: i32 = 10;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Widget configuration.
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub zoom: f64,
    pub refresh_interval: Duration,
    pub radar_opacity: f32,
    pub tile_host: String,
    pub base_tile_template: String,
    pub position_options: PositionOptions,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            radar_opacity: DEFAULT_RADAR_OPACITY,
            tile_host: DEFAULT_TILE_HOST.to_string(),
            base_tile_template: DEFAULT_BASE_TILE_TEMPLATE.to_string(),
            position_options: PositionOptions::default(),
        }
    }
}

/// Current center and zoom of the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    /// Bumped on every center change so renderers can detect moves.
    pub revision: u64,
    pub base_tile_template: String,
}

impl MapView {
    fn set_view(&mut self, latitude: f64, longitude: f64, zoom: f64) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.zoom = zoom;
        self.revision += 1;
    }

    pub fn center(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Where the marker position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLabel {
    Configured,
    Detected,
}

impl MarkerLabel {
    pub fn text(self) -> &'static str {
        match self {
            MarkerLabel::Configured => "Your Location",
            MarkerLabel::Detected => "Detected Location",
        }
    }
}

/// Point annotation for the user's location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: MarkerLabel,
}

impl UserMarker {
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// The radar overlay. Its identity survives frame swaps.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarLayer {
    pub id: u64,
    pub opacity: f32,
    pub z_index: i32,
    pub url_template: String,
    pub frame_path: String,
    pub frame_time: Option<DateTime<Utc>>,
    /// Bumped on every URL swap.
    pub generation: u64,
}

impl RadarLayer {
    fn new(id: u64, opacity: f32, url_template: String, frame: &RadarFrame) -> Self {
        Self {
            id,
            opacity,
            z_index: RADAR_Z_INDEX,
            url_template,
            frame_path: frame.path.clone(),
            frame_time: frame.timestamp(),
            generation: 0,
        }
    }

    fn set_url(&mut self, url_template: String, frame: &RadarFrame) {
        if self.url_template == url_template {
            return;
        }
        self.url_template = url_template;
        self.frame_path = frame.path.clone();
        self.frame_time = frame.timestamp();
        self.generation += 1;
    }
}

/// Lifecycle phase of the map and its radar overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetPhase {
    Uninitialized,
    MapReady,
    RadarLoading,
    RadarLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Default,
    Detected,
}

/// Notifications for front ends.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    MapReady,
    RadarUpdated { layer_id: u64, generation: u64 },
    RadarFailed(String),
    Recentered { latitude: f64, longitude: f64 },
    ScheduleStopped,
}

/// Point-in-time copy of the widget state.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSnapshot {
    pub phase: WidgetPhase,
    pub location_source: LocationSource,
    pub map: Option<MapView>,
    pub marker: Option<UserMarker>,
    pub radar_layer: Option<RadarLayer>,
}

#[derive(Debug)]
struct WidgetState {
    phase: WidgetPhase,
    location_source: LocationSource,
    map: Option<MapView>,
    marker: Option<UserMarker>,
    radar_layer: Option<RadarLayer>,
    host: Option<HostElement>,
    next_layer_id: u64,
}

impl WidgetState {
    fn new() -> Self {
        Self {
            phase: WidgetPhase::Uninitialized,
            location_source: LocationSource::Default,
            map: None,
            marker: None,
            radar_layer: None,
            host: None,
            next_layer_id: 1,
        }
    }

    fn settled_phase(&self) -> WidgetPhase {
        if self.radar_layer.is_some() {
            WidgetPhase::RadarLoaded
        } else {
            WidgetPhase::MapReady
        }
    }
}

/// Active refresh interval. Dropping it stops the interval.
#[derive(Debug)]
struct RefreshSchedule {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshSchedule {
    fn is_active(&self) -> bool {
        !self.cancel_token.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for RefreshSchedule {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct Inner {
    feed: Arc<dyn FrameFeed>,
    geolocator: Option<Arc<dyn Geolocator>>,
    session: SessionStore,
    options: WidgetOptions,
    state: Mutex<WidgetState>,
    schedule: Mutex<Option<RefreshSchedule>>,
    event_tx: broadcast::Sender<WidgetEvent>,
}

/// Weather radar map widget.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RadarWidget {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RadarWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarWidget")
            .field("options", &self.inner.options)
            .field("has_geolocation", &self.inner.geolocator.is_some())
            .finish_non_exhaustive()
    }
}

impl RadarWidget {
    /// Create an uninitialized widget.
    ///
    /// `geolocator` is `None` when the platform has no geolocation capability.
    pub fn new(
        feed: Arc<dyn FrameFeed>,
        geolocator: Option<Arc<dyn Geolocator>>,
        session: SessionStore,
        options: WidgetOptions,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                feed,
                geolocator,
                session,
                options,
                state: Mutex::new(WidgetState::new()),
                schedule: Mutex::new(None),
                event_tx,
            }),
        }
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.inner.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.event_tx.subscribe()
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine
        let _ = self.inner.event_tx.send(event);
    }

    /// Build the map on `host` and start loading radar frames.
    ///
    /// Coordinates come from the host's `lat`/`lon` attributes, each falling
    /// back to its default when absent or unparsable. Any schedule left by a
    /// previous initialization is cancelled first.
    pub fn initialize(&self, host: &HostElement, default_lat: f64, default_lon: f64) {
        self.cancel_schedule();

        let latitude = host.coordinate(LAT_ATTRIBUTE).unwrap_or(default_lat);
        let longitude = host.coordinate(LON_ATTRIBUTE).unwrap_or(default_lon);
        let zoom = self.inner.options.zoom;

        if let Ok(mut state) = self.inner.state.lock() {
            state.map = Some(MapView {
                latitude,
                longitude,
                zoom,
                revision: 0,
                base_tile_template: self.inner.options.base_tile_template.clone(),
            });
            state.marker = Some(UserMarker {
                latitude,
                longitude,
                label: MarkerLabel::Configured,
            });
            state.radar_layer = None;
            state.location_source = LocationSource::Default;
            state.phase = WidgetPhase::MapReady;
            state.host = Some(host.clone());
        }

        info!("Radar map initialized at {}, {} (zoom {})", latitude, longitude, zoom);
        self.emit(WidgetEvent::MapReady);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let widget = self.clone();
                handle.spawn(async move {
                    widget.refresh_radar_layer().await;
                });
            }
            Err(e) => error!("No tokio runtime, radar frames not loaded: {}", e),
        }
    }

    /// Fetch the newest radar frame, apply it, and (re)start the refresh interval.
    ///
    /// Failures are logged and leave the current layer untouched.
    pub async fn refresh_radar_layer(&self) {
        self.load_latest_frame().await;

        if self.host_attached() {
            self.schedule_refresh();
        } else {
            debug!("Host detached, not scheduling radar refresh");
        }
    }

    /// One fetch-and-apply cycle.
    async fn load_latest_frame(&self) {
        if let Ok(mut state) = self.inner.state.lock() {
            if state.map.is_some() {
                state.phase = WidgetPhase::RadarLoading;
            }
        }

        let frame = self.inner.feed.fetch().await.and_then(|maps| {
            maps.latest_past_frame().cloned().ok_or(FeedError::NoFrames)
        });

        match frame {
            Ok(frame) => self.apply_frame(&frame),
            Err(e) => {
                error!("Error fetching radar data: {}", e);
                if let Ok(mut state) = self.inner.state.lock() {
                    if state.map.is_some() {
                        state.phase = state.settled_phase();
                    }
                }
                self.emit(WidgetEvent::RadarFailed(e.to_string()));
            }
        }
    }

    fn apply_frame(&self, frame: &RadarFrame) {
        let url_template = radar_tile_template(&self.inner.options.tile_host, &frame.path);

        let applied = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            if state.map.is_none() {
                debug!("Map not initialized, dropping radar frame {}", frame.path);
                None
            } else {
                if state.radar_layer.is_none() {
                    let id = state.next_layer_id;
                    state.next_layer_id += 1;
                    let opacity = self.inner.options.radar_opacity;
                    state.radar_layer = Some(RadarLayer::new(id, opacity, url_template, frame));
                } else if let Some(layer) = state.radar_layer.as_mut() {
                    layer.set_url(url_template, frame);
                }
                state.phase = WidgetPhase::RadarLoaded;
                state
                    .radar_layer
                    .as_ref()
                    .map(|layer| (layer.id, layer.generation))
            }
        };

        if let Some((layer_id, generation)) = applied {
            info!("Radar layer {} showing frame {} (generation {})", layer_id, frame.path, generation);
            self.emit(WidgetEvent::RadarUpdated { layer_id, generation });
        }
    }

    /// Replace the refresh interval, cancelling the previous one.
    fn schedule_refresh(&self) {
        let Some(host) = self.host() else {
            return;
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("No tokio runtime, radar refresh not scheduled: {}", e);
                return;
            }
        };

        let cancel_token = CancellationToken::new();
        let period = self.inner.options.refresh_interval;
        let widget = self.clone();
        let task_cancel = cancel_token.clone();

        let task = handle.spawn(async move {
            widget.refresh_loop(host, task_cancel, period).await;
        });

        if let Ok(mut schedule) = self.inner.schedule.lock() {
            // Dropping the previous schedule cancels it
            *schedule = Some(RefreshSchedule { cancel_token, task });
        } else {
            cancel_token.cancel();
        }
        debug!("Radar refresh scheduled every {:?}", period);
    }

    async fn refresh_loop(&self, host: HostElement, cancel_token: CancellationToken, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!("Radar refresh schedule replaced");
                    return;
                }
                () = host.removed() => {
                    info!("Radar host removed, stopping refresh");
                    self.emit(WidgetEvent::ScheduleStopped);
                    return;
                }
                _ = interval.tick() => {}
            }

            if !host.is_attached() {
                self.emit(WidgetEvent::ScheduleStopped);
                return;
            }

            self.load_latest_frame().await;
        }
    }

    fn cancel_schedule(&self) {
        if let Ok(mut schedule) = self.inner.schedule.lock() {
            if schedule.take().is_some() {
                debug!("Cancelled previous radar refresh schedule");
            }
        }
    }

    /// Whether a refresh interval is currently running
    pub fn has_active_schedule(&self) -> bool {
        self.inner
            .schedule
            .lock()
            .map(|schedule| schedule.as_ref().is_some_and(RefreshSchedule::is_active))
            .unwrap_or(false)
    }

    fn host(&self) -> Option<HostElement> {
        self.inner.state.lock().ok().and_then(|state| state.host.clone())
    }

    fn host_attached(&self) -> bool {
        self.host().is_some_and(|host| host.is_attached())
    }

    /// Ask for the user's position once and recenter on success.
    pub async fn init_geolocation(&self) {
        let Some(geolocator) = self.inner.geolocator.clone() else {
            info!("Geolocation not supported");
            return;
        };

        match geolocator.current_position(self.inner.options.position_options).await {
            Ok(position) => {
                info!("Location detected: {}, {}", position.latitude, position.longitude);
                self.inner.session.set_item(SESSION_LAT_KEY, position.latitude.to_string());
                self.inner.session.set_item(SESSION_LON_KEY, position.longitude.to_string());
                self.recenter_on(position.latitude, position.longitude);
            }
            Err(e) => {
                warn!("Geolocation error: {}", e);
            }
        }
    }

    /// Move the map and marker to a detected position.
    ///
    /// Does nothing until the map and marker exist.
    pub fn recenter_on(&self, lat: f64, lon: f64) {
        let zoom = self.inner.options.zoom;

        let moved = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            let state = &mut *state;
            match (state.map.as_mut(), state.marker.as_mut()) {
                (Some(map), Some(marker)) => {
                    map.set_view(lat, lon, zoom);
                    marker.latitude = lat;
                    marker.longitude = lon;
                    marker.label = MarkerLabel::Detected;
                    state.location_source = LocationSource::Detected;
                    true
                }
                _ => false,
            }
        };

        if moved {
            self.emit(WidgetEvent::Recentered {
                latitude: lat,
                longitude: lon,
            });
        }
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        match self.inner.state.lock() {
            Ok(state) => WidgetSnapshot {
                phase: state.phase,
                location_source: state.location_source,
                map: state.map.clone(),
                marker: state.marker,
                radar_layer: state.radar_layer.clone(),
            },
            Err(_) => WidgetSnapshot {
                phase: WidgetPhase::Uninitialized,
                location_source: LocationSource::Default,
                map: None,
                marker: None,
                radar_layer: None,
            },
        }
    }

    pub fn phase(&self) -> WidgetPhase {
        self.snapshot().phase
    }

    pub fn location_source(&self) -> LocationSource {
        self.snapshot().location_source
    }

    pub fn map_view(&self) -> Option<MapView> {
        self.snapshot().map
    }

    pub fn marker(&self) -> Option<UserMarker> {
        self.snapshot().marker
    }

    pub fn radar_layer(&self) -> Option<RadarLayer> {
        self.snapshot().radar_layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{RadarFrames, WeatherMaps};
    use crate::geolocation::{GeolocationError, Position};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    enum Reply {
        Frames(Vec<&'static str>),
        MissingRadar,
        Status(u16),
    }

    /// Feed that replays scripted replies, repeating the last one.
    struct ScriptedFeed {
        replies: Mutex<Vec<Reply>>,
        fetches: AtomicUsize,
    }

    impl ScriptedFeed {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FrameFeed for ScriptedFeed {
        async fn fetch(&self) -> Result<WeatherMaps, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.remove(0)
                } else {
                    replies[0].clone()
                }
            };

            match reply {
                Reply::Frames(paths) => Ok(WeatherMaps {
                    radar: Some(RadarFrames {
                        past: paths
                            .into_iter()
                            .enumerate()
                            .map(|(i, path)| RadarFrame {
                                time: 1_700_000_000 + i64::try_from(i).unwrap() * 600,
                                path: path.to_string(),
                            })
                            .collect(),
                        nowcast: Vec::new(),
                    }),
                    ..WeatherMaps::default()
                }),
                Reply::MissingRadar => Ok(WeatherMaps::default()),
                Reply::Status(code) => Err(FeedError::Status(code)),
            }
        }
    }

    struct FixedGeolocator(Result<Position, GeolocationError>);

    #[async_trait]
    impl Geolocator for FixedGeolocator {
        async fn current_position(&self, options: PositionOptions) -> Result<Position, GeolocationError> {
            assert!(!options.enable_high_accuracy);
            assert_eq!(options.timeout, Duration::from_secs(10));
            assert_eq!(options.maximum_age, Duration::from_secs(300));
            self.0.clone()
        }
    }

    fn widget_with(feed: Arc<ScriptedFeed>, geolocator: Option<Arc<dyn Geolocator>>) -> (RadarWidget, SessionStore) {
        let session = SessionStore::new();
        let widget = RadarWidget::new(feed, geolocator, session.clone(), WidgetOptions::default());
        (widget, session)
    }

    async fn next_radar_event(rx: &mut broadcast::Receiver<WidgetEvent>) -> WidgetEvent {
        loop {
            match rx.recv().await.unwrap() {
                event @ (WidgetEvent::RadarUpdated { .. } | WidgetEvent::RadarFailed(_)) => return event,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_initialize_uses_host_coordinates() {
        let (widget, _) = widget_with(ScriptedFeed::new(vec![Reply::Frames(vec!["/v2/radar/1"])]), None);
        let host = HostElement::new()
            .with_attribute(LAT_ATTRIBUTE, "40.5")
            .with_attribute(LON_ATTRIBUTE, "-90.25");

        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);

        let map = widget.map_view().unwrap();
        assert_eq!(map.center(), (40.5, -90.25));
        assert_eq!(map.zoom, DEFAULT_ZOOM);
        let marker = widget.marker().unwrap();
        assert_eq!(marker.position(), (40.5, -90.25));
        assert_eq!(marker.label, MarkerLabel::Configured);
        assert_eq!(widget.location_source(), LocationSource::Default);
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_defaults() {
        let (widget, _) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), None);

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        assert_eq!(widget.map_view().unwrap().center(), (41.8781, -87.6298));

        let host = HostElement::new()
            .with_attribute(LAT_ATTRIBUTE, "north")
            .with_attribute(LON_ATTRIBUTE, "");
        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        assert_eq!(widget.map_view().unwrap().center(), (41.8781, -87.6298));
        assert_eq!(widget.map_view().unwrap().zoom, DEFAULT_ZOOM);
    }

    #[tokio::test]
    async fn test_initialize_reads_numeric_prefix() {
        let (widget, _) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), None);
        let host = HostElement::new()
            .with_attribute(LAT_ATTRIBUTE, "40.5deg")
            .with_attribute(LON_ATTRIBUTE, "-88.25 W");

        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        assert_eq!(widget.map_view().unwrap().center(), (40.5, -88.25));

        let host = HostElement::new()
            .with_attribute(LAT_ATTRIBUTE, "0")
            .with_attribute(LON_ATTRIBUTE, "0");
        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        assert_eq!(widget.map_view().unwrap().center(), (0.0, 0.0));
    }

    #[test]
    fn test_initialize_outside_runtime_builds_map() {
        let feed = ScriptedFeed::new(vec![Reply::Frames(vec!["/v2/radar/1"])]);
        let (widget, _) = widget_with(feed.clone(), None);
        let mut rx = widget.subscribe();

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);

        assert_eq!(widget.phase(), WidgetPhase::MapReady);
        assert_eq!(widget.map_view().unwrap().center(), (DEFAULT_LATITUDE, DEFAULT_LONGITUDE));
        assert!(matches!(rx.try_recv(), Ok(WidgetEvent::MapReady)));
        assert!(widget.radar_layer().is_none());
        assert!(!widget.has_active_schedule());
        assert_eq!(feed.fetches(), 0);
    }

    #[tokio::test]
    async fn test_radar_layer_uses_latest_frame() {
        let feed = ScriptedFeed::new(vec![Reply::Frames(vec![
            "/v2/radar/oldest",
            "/v2/radar/middle",
            "/v2/radar/newest",
        ])]);
        let (widget, _) = widget_with(feed, None);
        let mut rx = widget.subscribe();

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        let event = tokio::time::timeout(Duration::from_secs(5), next_radar_event(&mut rx))
            .await
            .unwrap();
        assert!(matches!(event, WidgetEvent::RadarUpdated { generation: 0, .. }));

        let layer = widget.radar_layer().unwrap();
        assert!(layer.url_template.contains("/v2/radar/newest"));
        assert!(!layer.url_template.contains("/v2/radar/oldest"));
        assert_eq!(
            layer.url_template,
            "https://tilecache.rainviewer.com/v2/radar/newest/256/{z}/{x}/{y}/2/1_1.png"
        );
        assert_eq!(widget.phase(), WidgetPhase::RadarLoaded);
    }

    #[tokio::test]
    async fn test_empty_or_missing_frames_create_no_layer() {
        for reply in [Reply::Frames(Vec::new()), Reply::MissingRadar, Reply::Status(500)] {
            let (widget, _) = widget_with(ScriptedFeed::new(vec![reply]), None);
            let mut rx = widget.subscribe();

            widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
            let event = tokio::time::timeout(Duration::from_secs(5), next_radar_event(&mut rx))
                .await
                .unwrap();

            assert!(matches!(event, WidgetEvent::RadarFailed(_)));
            assert!(widget.radar_layer().is_none());
            assert_eq!(widget.phase(), WidgetPhase::MapReady);
        }
    }

    #[tokio::test]
    async fn test_refresh_swaps_url_and_keeps_layer_identity() {
        let feed = ScriptedFeed::new(vec![
            Reply::Frames(vec!["/v2/radar/a"]),
            Reply::Status(502),
            Reply::Frames(vec!["/v2/radar/a", "/v2/radar/b"]),
        ]);
        let (widget, _) = widget_with(feed, None);
        let mut rx = widget.subscribe();

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        tokio::time::timeout(Duration::from_secs(5), next_radar_event(&mut rx))
            .await
            .unwrap();
        let first = widget.radar_layer().unwrap();

        // Failure leaves the existing layer untouched
        widget.refresh_radar_layer().await;
        assert_eq!(widget.radar_layer().unwrap(), first);
        assert_eq!(widget.phase(), WidgetPhase::RadarLoaded);

        widget.refresh_radar_layer().await;
        let second = widget.radar_layer().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.opacity, first.opacity);
        assert_eq!(second.z_index, first.z_index);
        assert_eq!(second.generation, first.generation + 1);
        assert!(second.url_template.contains("/v2/radar/b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_refresh_keeps_single_schedule() {
        let feed = ScriptedFeed::new(vec![Reply::Frames(vec!["/v2/radar/1"])]);
        let (widget, _) = widget_with(Arc::clone(&feed), None);

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        widget.refresh_radar_layer().await;
        widget.refresh_radar_layer().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(widget.has_active_schedule());

        let before = feed.fetches();
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(feed.fetches(), before + 1);

        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL).await;
        assert_eq!(feed.fetches(), before + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_removal_stops_schedule() {
        let feed = ScriptedFeed::new(vec![Reply::Frames(vec!["/v2/radar/1"])]);
        let (widget, _) = widget_with(Arc::clone(&feed), None);
        let host = HostElement::new();
        let mut rx = widget.subscribe();

        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        widget.refresh_radar_layer().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        host.remove();
        loop {
            if rx.recv().await.unwrap() == WidgetEvent::ScheduleStopped {
                break;
            }
        }
        assert!(!widget.has_active_schedule());

        let before = feed.fetches();
        tokio::time::sleep(DEFAULT_REFRESH_INTERVAL * 3).await;
        assert_eq!(feed.fetches(), before);

        // A detached host never gets a new schedule
        widget.refresh_radar_layer().await;
        assert!(!widget.has_active_schedule());
    }

    #[tokio::test]
    async fn test_reinitialize_cancels_schedule() {
        let (widget, _) = widget_with(ScriptedFeed::new(vec![Reply::Frames(vec!["/v2/radar/1"])]), None);
        let host = HostElement::new();

        widget.initialize(&host, DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        widget.refresh_radar_layer().await;
        assert!(widget.has_active_schedule());

        widget.initialize(&host, 10.0, 20.0);
        assert!(!widget.has_active_schedule());
        assert!(widget.radar_layer().is_none());
        assert_eq!(widget.map_view().unwrap().center(), (10.0, 20.0));
    }

    #[tokio::test]
    async fn test_recenter_before_initialize_is_noop() {
        let (widget, _) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), None);
        let mut rx = widget.subscribe();

        widget.recenter_on(40.0, -88.0);

        assert_eq!(widget.phase(), WidgetPhase::Uninitialized);
        assert!(widget.map_view().is_none());
        assert!(widget.marker().is_none());
        assert_eq!(widget.location_source(), LocationSource::Default);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_geolocation_success_recenters() {
        let geolocator: Arc<dyn Geolocator> = Arc::new(FixedGeolocator(Ok(Position::new(40.0, -88.0))));
        let (widget, session) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), Some(geolocator));

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        let revision = widget.map_view().unwrap().revision;
        widget.init_geolocation().await;

        let map = widget.map_view().unwrap();
        assert_eq!(map.center(), (40.0, -88.0));
        assert_eq!(map.zoom, DEFAULT_ZOOM);
        assert!(map.revision > revision);

        let marker = widget.marker().unwrap();
        assert_eq!(marker.position(), (40.0, -88.0));
        assert_eq!(marker.label, MarkerLabel::Detected);
        assert_eq!(marker.label.text(), "Detected Location");
        assert_eq!(widget.location_source(), LocationSource::Detected);

        assert_eq!(session.get_item("userLat").as_deref(), Some("40"));
        assert_eq!(session.get_item("userLon").as_deref(), Some("-88"));
    }

    #[tokio::test]
    async fn test_geolocation_failure_keeps_default_center() {
        let geolocator: Arc<dyn Geolocator> = Arc::new(FixedGeolocator(Err(GeolocationError::PermissionDenied)));
        let (widget, session) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), Some(geolocator));

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        widget.init_geolocation().await;

        assert_eq!(widget.map_view().unwrap().center(), (DEFAULT_LATITUDE, DEFAULT_LONGITUDE));
        assert_eq!(widget.marker().unwrap().label, MarkerLabel::Configured);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_geolocation_unavailable_is_noop() {
        let (widget, session) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), None);

        widget.initialize(&HostElement::new(), DEFAULT_LATITUDE, DEFAULT_LONGITUDE);
        widget.init_geolocation().await;

        assert_eq!(widget.location_source(), LocationSource::Default);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_geolocation_before_initialize_only_stores_session() {
        let geolocator: Arc<dyn Geolocator> = Arc::new(FixedGeolocator(Ok(Position::new(40.0, -88.0))));
        let (widget, session) = widget_with(ScriptedFeed::new(vec![Reply::MissingRadar]), Some(geolocator));

        widget.init_geolocation().await;

        assert!(widget.map_view().is_none());
        assert_eq!(session.len(), 2);
    }
}
