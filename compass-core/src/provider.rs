use crate::model::WeatherSnapshot;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod weatherapi;

/// Error from a single fetch attempt.
///
/// Variants hold display strings rather than source objects so an error can
/// live inside controller state and be cloned and compared there. The user
/// never sees these directly; the controller turns them into view state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

/// A source of current weather conditions.
///
/// Exactly one network request per call; retries are the controller's job.
#[async_trait]
pub trait WeatherFetch: Send + Sync + Debug {
    async fn fetch_current(&self, location: &str) -> Result<WeatherSnapshot, FetchError>;
}
