//! Core library for the `compass` weather dashboard.
//!
//! This crate defines:
//! - Configuration handling (API key, location, refresh policy)
//! - The weather provider abstraction and the WeatherAPI.com client
//! - The query controller: retry budget, single-flight coalescing, demo fallback
//! - The shared domain model ([`WeatherSnapshot`])
//!
//! It is used by `compass-cli`, but can also be reused by other binaries.

pub mod config;
pub mod controller;
pub mod model;
pub mod provider;

pub use config::{Config, PLACEHOLDER_API_KEY};
pub use controller::{Notice, QueryController, QueryState, ViewState};
pub use model::{LOCALTIME_FORMAT, WeatherSnapshot};
pub use provider::{FetchError, WeatherFetch, weatherapi::WeatherApiClient};
