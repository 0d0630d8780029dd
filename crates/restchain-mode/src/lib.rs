//! restchain-mode - Mode Analytics dashboard metadata extraction
//!
//! Builds the two-level spaces→reports chain against the Mode API and shapes
//! merged records into [`DashboardMetadata`] entities.

pub mod config;
pub mod extractor;
pub mod model;

pub use config::{ModeArgs, ModeConfig};
pub use extractor::ModeDashboardExtractor;
pub use model::DashboardMetadata;
