#[cfg(feature = "cli")]
pub mod cli;
pub mod study_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::ColumnMap;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "did-etl")]
#[command(about = "Difference-in-differences analysis of a two-group revenue panel")]
pub struct CliConfig {
    /// Panel CSV, a local path or an http(s) URL
    #[arg(long, default_value = "input/PaidSearch.csv")]
    pub source: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Date the treated DMAs lost paid search
    #[arg(long, default_value = "2012-05-22")]
    pub treatment_date: NaiveDate,

    /// Critical value for the confidence interval
    #[arg(long, default_value = "1.96")]
    pub confidence_z: f64,

    #[arg(long, help = "Also bundle the artifacts into did_output.zip")]
    pub archive: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source(&self) -> &str {
        &self.source
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn treatment_date(&self) -> NaiveDate {
        self.treatment_date
    }

    fn confidence_z(&self) -> f64 {
        self.confidence_z
    }

    fn columns(&self) -> ColumnMap {
        ColumnMap::default()
    }

    fn archive_output(&self) -> bool {
        self.archive
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_source("source", &self.source)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_positive_f64("confidence_z", self.confidence_z)?;
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_study() {
        let config = CliConfig::try_parse_from(["did-etl"]).unwrap();

        assert_eq!(config.source, "input/PaidSearch.csv");
        assert_eq!(config.output_path, "./output");
        assert_eq!(
            config.treatment_date,
            NaiveDate::from_ymd_opt(2012, 5, 22).unwrap()
        );
        assert_eq!(config.confidence_z, 1.96);
        assert!(!config.archive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = CliConfig::try_parse_from([
            "did-etl",
            "--source",
            "https://example.com/panel.csv",
            "--treatment-date",
            "2013-01-15",
            "--confidence-z",
            "2.576",
            "--archive",
        ])
        .unwrap();

        assert_eq!(config.source, "https://example.com/panel.csv");
        assert_eq!(
            config.treatment_date,
            NaiveDate::from_ymd_opt(2013, 1, 15).unwrap()
        );
        assert_eq!(config.confidence_z, 2.576);
        assert!(config.archive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_treatment_date_is_rejected_at_parse() {
        let result = CliConfig::try_parse_from(["did-etl", "--treatment-date", "not-a-date"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_positive_z_fails_validation() {
        let mut config = CliConfig::try_parse_from(["did-etl"]).unwrap();
        config.confidence_z = -1.0;
        assert!(config.validate().is_err());
    }
}
