use serde::{Deserialize, Serialize};

/// Format of the `localtime` field as WeatherAPI.com emits it.
pub const LOCALTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One immutable weather reading for a location at a point in time.
///
/// A snapshot is either fully populated or does not exist; no field is
/// optional. It is produced by a successful provider decode, or once by
/// [`WeatherSnapshot::demo`], and is replaced wholesale rather than mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Location display name, e.g. "Colombo".
    pub location: String,
    /// Country of the location.
    pub country: String,
    /// Provider-local observation time, formatted as [`LOCALTIME_FORMAT`].
    pub localtime: String,
    /// Air temperature in °C.
    pub temp_c: f64,
    /// Human-readable condition text, e.g. "Partly cloudy".
    pub condition: String,
    /// Provider icon reference (opaque; empty for the demo snapshot).
    pub icon: String,
    /// Relative humidity in percent.
    pub humidity: u8,
    /// Wind speed in km/h.
    pub wind_kph: f64,
    /// UV index.
    pub uv: f64,
    /// Visibility in km.
    pub vis_km: f64,
}

impl WeatherSnapshot {
    /// The hardcoded demo reading shown when live data cannot be fetched.
    ///
    /// `localtime` is stamped by the caller, normally with the time the
    /// fallback is synthesized.
    pub fn demo(localtime: String) -> Self {
        Self {
            location: "Colombo".to_string(),
            country: "Sri Lanka".to_string(),
            localtime,
            temp_c: 29.0,
            condition: "Partly cloudy".to_string(),
            icon: String::new(),
            humidity: 78,
            wind_kph: 15.0,
            uv: 8.0,
            vis_km: 10.0,
        }
    }
}
