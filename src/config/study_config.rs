use crate::core::estimate::DEFAULT_CONFIDENCE_Z;
use crate::core::ConfigProvider;
use crate::domain::model::ColumnMap;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// TOML description of one study run. Dates are quoted ISO strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub study: StudySection,
    pub source: SourceSection,
    #[serde(default)]
    pub columns: ColumnMap,
    pub estimate: Option<EstimateSection>,
    pub load: LoadSection,
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySection {
    pub name: String,
    pub description: Option<String>,
    /// Date the treated units lost the intervention.
    pub treatment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Local path or http(s) URL of the panel CSV.
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateSection {
    pub confidence_z: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    pub output_path: String,
    pub archive: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
}

impl StudyConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PANEL_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string("study.name", &self.study.name)?;
        crate::utils::validation::validate_source("source.location", &self.source.location)?;
        crate::utils::validation::validate_path("load.output_path", &self.load.output_path)?;
        crate::utils::validation::validate_positive_f64("estimate.confidence_z", self.confidence_z())?;

        for (field, name) in [
            ("columns.date", &self.columns.date),
            ("columns.revenue", &self.columns.revenue),
            ("columns.unit", &self.columns.unit),
            ("columns.group", &self.columns.group),
            ("columns.period", &self.columns.period),
        ] {
            crate::utils::validation::validate_non_empty_string(field, name)?;
        }

        Ok(())
    }

    pub fn confidence_z(&self) -> f64 {
        self.estimate
            .as_ref()
            .and_then(|e| e.confidence_z)
            .unwrap_or(DEFAULT_CONFIDENCE_Z)
    }

    pub fn archive(&self) -> bool {
        self.load.archive.unwrap_or(false)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for StudyConfig {
    fn source(&self) -> &str {
        &self.source.location
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn treatment_date(&self) -> NaiveDate {
        self.study.treatment_date
    }

    fn confidence_z(&self) -> f64 {
        self.confidence_z()
    }

    fn columns(&self) -> ColumnMap {
        self.columns.clone()
    }

    fn archive_output(&self) -> bool {
        self.archive()
    }
}

impl Validate for StudyConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
