pub mod aggregate;
pub mod estimate;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{Observation, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
