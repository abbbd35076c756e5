pub mod career;
pub mod cohort;
pub mod config;
pub mod dataset;
pub mod dataset_export;
pub mod error;
pub mod features;
pub mod literal;
pub mod normalize;
pub mod record;
pub mod table;

pub use error::{PipelineError, Result};
