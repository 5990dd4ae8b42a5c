use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::WeatherSnapshot;

use super::{FetchError, WeatherFetch};

/// Client for the WeatherAPI.com current-conditions endpoint.
///
/// Performs exactly one `GET <endpoint>?key=..&q=..&aqi=no` per call. No
/// retries and no bespoke timeout here; the transport default applies.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self { api_key, endpoint, http: Client::new() }
    }
}

#[async_trait]
impl WeatherFetch for WeatherApiClient {
    async fn fetch_current(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        debug!(endpoint = %self.endpoint, %location, "fetching current conditions");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("key", self.api_key.as_str()), ("q", location), ("aqi", "no")])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: WaResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(snapshot_from_response(parsed))
    }
}

fn snapshot_from_response(res: WaResponse) -> WeatherSnapshot {
    WeatherSnapshot {
        location: res.location.name,
        country: res.location.country,
        localtime: res.location.localtime,
        temp_c: res.current.temp_c,
        condition: res.current.condition.text,
        icon: res.current.condition.icon,
        humidity: res.current.humidity,
        wind_kph: res.current.wind_kph,
        uv: res.current.uv,
        vis_km: res.current.vis_km,
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    condition: WaCondition,
    humidity: u8,
    wind_kph: f64,
    uv: f64,
    vis_km: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

// Truncates on a char boundary; slicing at a fixed byte offset would panic
// on multi-byte provider bodies.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
