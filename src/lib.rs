//! Sentinel - surf, night-sky and weather forecast reports
//!
//! This library fetches forecast series from Open-Meteo, derives the
//! metrics each report needs, renders charts and writes them into a PDF
//! under a deterministic path.

pub mod api;
pub mod chart;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod report;

// Re-export core types for public API
pub use api::{ForecastSource, OpenMeteoClient};
pub use chart::{ChartArtifact, ChartRenderer, ChartSpec, PlottersRenderer};
pub use config::SentinelConfig;
pub use dispatch::{Dispatcher, EmailDispatcher, TelegramDispatcher};
pub use document::{DocumentSpec, MetadataRow, ReportDocument, compose};
pub use error::{
    ChartRenderError, DispatchError, DocumentWriteError, FetchError, InsufficientData, Outcome,
    ReportError,
};
pub use models::{Forecast, ForecastSeries, Location, ReportKind, Sample, Variable};
pub use report::{GeneratedReport, ReportOrchestrator, ReportProfile, report_path};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
