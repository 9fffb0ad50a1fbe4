use crate::domain::model::{ColumnMap, Observation, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Panel CSV location: a local path or an http(s) URL.
    fn source(&self) -> &str;
    fn output_path(&self) -> &str;
    /// Marker date for the diagnostic figures (the shutoff date).
    fn treatment_date(&self) -> NaiveDate;
    /// Critical value for the confidence interval.
    fn confidence_z(&self) -> f64;
    fn columns(&self) -> ColumnMap;
    /// Bundle the run's artifacts into a zip as well.
    fn archive_output(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Observation>>;
    async fn transform(&self, data: Vec<Observation>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
