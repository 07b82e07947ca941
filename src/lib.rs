pub mod clean;
pub mod config;
pub mod distance;
pub mod engineer;
pub mod error;
pub mod fuzzy;
pub mod geo_data;
pub mod geocode;
pub mod listing;
pub mod logging;
pub mod mapping;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod table;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{build_tables, run, RunSummary};
