//! Data models for the report pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and display name
//! - Kind: The three report kinds and their naming
//! - Weather: A single time-indexed sample and its named variables
//! - Forecast: Ordered series of samples and the per-report bundle
//! - Color: RGB colours shared by charts and documents

pub mod color;
pub mod forecast;
pub mod kind;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use color::Rgb;
pub use forecast::{Forecast, ForecastSeries, Granularity};
pub use kind::ReportKind;
pub use location::Location;
pub use weather::{Sample, Variable};
