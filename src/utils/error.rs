use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Source error: {message}")]
    SourceError { message: String },

    #[error("Input schema error in column '{column}': {message}")]
    SchemaError { column: String, message: String },

    #[error("Non-positive revenue {value} for DMA '{dma}' on {date}; log transform undefined")]
    NonPositiveRevenue {
        dma: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("Group '{group}' has no units with both pre and post observations")]
    EmptyGroup { group: String },

    #[error("Group '{group}' has only {units} unit(s) with a pre/post difference; sample variance needs at least 2")]
    DegenerateSample { group: String, units: usize },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 錯誤分類，用於日誌與診斷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Schema,
    Domain,
    Config,
    Storage,
    Internal,
}

/// 錯誤嚴重程度，決定程序退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::SourceError { .. } => ErrorCategory::Source,
            EtlError::CsvError(_) | EtlError::SchemaError { .. } => ErrorCategory::Schema,
            EtlError::NonPositiveRevenue { .. }
            | EtlError::EmptyGroup { .. }
            | EtlError::DegenerateSample { .. } => ErrorCategory::Domain,
            EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Config,
            EtlError::IoError(_) | EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                ErrorCategory::Storage
            }
            EtlError::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路來源問題：重跑通常可解
            EtlError::ApiError(_) | EtlError::SourceError { .. } => ErrorSeverity::Medium,
            // 輸入資料或配置的問題：必須修正後重跑
            EtlError::CsvError(_)
            | EtlError::SchemaError { .. }
            | EtlError::NonPositiveRevenue { .. }
            | EtlError::EmptyGroup { .. }
            | EtlError::DegenerateSample { .. }
            | EtlError::ConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::ProcessingError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) | EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ApiError(e) => format!("Could not reach the data source: {}", e),
            EtlError::SourceError { message } => format!("Data source problem: {}", message),
            EtlError::CsvError(e) => format!("The input file is not valid CSV: {}", e),
            EtlError::SchemaError { column, message } => {
                format!("Input column '{}' is unusable: {}", column, message)
            }
            EtlError::NonPositiveRevenue { dma, date, value } => format!(
                "DMA '{}' reports revenue {} on {}; revenue must be positive to take logs",
                dma, value, date
            ),
            EtlError::EmptyGroup { group } => format!(
                "The {} group contributed no pre/post differences; check the flag columns",
                group
            ),
            EtlError::DegenerateSample { group, units } => format!(
                "The {} group has {} usable unit(s); at least 2 are needed for a standard error",
                group, units
            ),
            EtlError::ConfigError { message } => format!("Configuration problem: {}", message),
            EtlError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("'{}' is not a valid {}: {}", value, field, reason),
            EtlError::MissingConfigError { field } => {
                format!("Required configuration field '{}' is missing", field)
            }
            EtlError::IoError(e) => format!("File system error: {}", e),
            EtlError::ZipError(e) => format!("Could not build the output archive: {}", e),
            EtlError::SerializationError(e) => format!("Could not serialize run summary: {}", e),
            EtlError::ProcessingError { message } => format!("Processing failed: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Source => {
                "Check that the source path or URL is reachable and points at the panel CSV".into()
            }
            ErrorCategory::Schema => {
                "Verify the CSV has date, revenue, dma, search_stays_on and treatment_period columns with parseable values".into()
            }
            ErrorCategory::Domain => {
                "Inspect the panel for zero/negative revenue rows and for groups with fewer than 2 complete units".into()
            }
            ErrorCategory::Config => "Fix the flagged configuration value and run again".into(),
            ErrorCategory::Storage => {
                "Check permissions and free space under the output path".into()
            }
            ErrorCategory::Internal => {
                "Re-run with --verbose and report the log if the failure persists".into()
            }
        }
    }
}
