use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Drives a pipeline through extract, transform and load, with optional
/// per-phase resource reporting.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting DID analysis run");

        // Extract
        tracing::info!("Extracting panel data...");
        let observations = self.pipeline.extract().await?;
        tracing::info!("Extracted {} observations", observations.len());
        self.monitor.log_stats("extract");

        // Transform
        tracing::info!("Estimating treatment effect...");
        let result = self.pipeline.transform(observations).await?;
        tracing::info!(
            "Estimated gamma {:.4} from {} treated and {} untreated DMAs",
            result.estimate.gamma_hat,
            result.estimate.n_treated,
            result.estimate.n_untreated
        );
        self.monitor.log_stats("transform");
        println!("{}", result.artifacts.table_text);

        // Load
        tracing::info!("Writing artifacts...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_stats("load");

        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
