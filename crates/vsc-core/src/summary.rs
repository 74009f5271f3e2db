//! Per-session output record.

use serde::Serialize;

use crate::enrich::GeoInfo;

/// Condensed view of one playback session.
///
/// Field order is the output order. Every field is always present; unknown
/// values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub tracking_id: Option<String>,
    pub media_id: Option<String>,
    pub earliest_time: Option<String>,
    pub latest_time: Option<String>,
    pub incomplete_stream: Option<bool>,
    pub finished_playback: bool,
    pub first_event_type: Option<String>,
    pub last_event_type: Option<String>,
    pub buffer_start_events: u64,
    pub playing_duration: Option<f64>,
    pub source: Option<String>,
    pub component: Option<String>,
    pub auto_bitrate: Option<bool>,
    pub client_id: Option<String>,
    pub title: Option<String>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub video_length: Option<String>,
    pub position_earliest_play: Option<String>,
    pub position_latest_play: Option<String>,
    pub buffering_events: u64,
    pub buffering_length: Option<f64>,
    /// Locations of closed buffering intervals. Not part of the output line.
    #[serde(skip_serializing)]
    pub buffering_positions: Option<Vec<String>>,
    pub initial_buffering_length: i64,
    pub auto_bitrate_events: u64,
    pub user_bitrate_events: u64,
    pub isp_name: Option<String>,
    pub geo_city: Option<String>,
    pub geo_longitude: Option<f64>,
    pub geo_latitude: Option<f64>,
    pub geo_postal_code: Option<String>,
    pub geo_metro_code: Option<u16>,
    pub geo_country_code: Option<String>,
    pub geo_country_name: Option<String>,
}

impl SessionSummary {
    /// Copies geo lookup results into the `geo_*` fields.
    pub fn apply_geo(&mut self, geo: GeoInfo) {
        self.geo_city = geo.city;
        self.geo_longitude = geo.longitude;
        self.geo_latitude = geo.latitude;
        self.geo_postal_code = geo.postal_code;
        self.geo_metro_code = geo.metro_code;
        self.geo_country_code = geo.country_code;
        self.geo_country_name = geo.country_name;
    }

    /// Whether the session produced a usable playing duration.
    pub const fn has_duration(&self) -> bool {
        self.playing_duration.is_some()
    }
}
