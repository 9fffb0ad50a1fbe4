pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod viz;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::study_config::StudyConfig;
pub use core::{etl::EtlEngine, pipeline::DidPipeline};
pub use utils::error::{EtlError, Result};
