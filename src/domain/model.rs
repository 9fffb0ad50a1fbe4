use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::error::{EtlError, Result};

/// Pre/post half of the observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Pre,
    Post,
}

impl Period {
    /// Wire encoding: `treatment_period` 0 = pre, 1 = post.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Period::Pre),
            1 => Some(Period::Post),
            _ => None,
        }
    }
}

/// Treatment group of a DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Treated,
    Untreated,
}

impl Group {
    /// Wire encoding: `search_stays_on` 0 = search turned off (treated),
    /// 1 = search kept on (untreated control).
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Group::Treated),
            1 => Some(Group::Untreated),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Group::Treated => "treated",
            Group::Untreated => "untreated",
        }
    }
}

/// One row of the panel: a DMA's revenue on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub dma: String,
    pub date: NaiveDate,
    pub period: Period,
    pub group: Group,
    pub revenue: f64,
}

impl Observation {
    /// Rejects non-positive revenue so the log transform is always defined
    /// downstream.
    pub fn new(
        dma: String,
        date: NaiveDate,
        period: Period,
        group: Group,
        revenue: f64,
    ) -> Result<Self> {
        if !revenue.is_finite() || revenue <= 0.0 {
            return Err(EtlError::NonPositiveRevenue {
                dma,
                date,
                value: revenue,
            });
        }
        Ok(Self {
            dma,
            date,
            period,
            group,
            revenue,
        })
    }

    pub fn log_revenue(&self) -> f64 {
        self.revenue.ln()
    }
}

/// Per-DMA pivot row: mean log revenue in each period and their difference.
/// Field names double as the column headers of the pivot CSV artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDiff {
    pub dma: String,
    pub log_revenue_pre: f64,
    pub log_revenue_post: f64,
    pub log_revenue_diff: f64,
}

/// One treatment group's pivot table plus the DMAs that fell out of it.
#[derive(Debug, Clone)]
pub struct GroupPivot {
    pub group: Group,
    pub units: Vec<UnitDiff>,
    /// DMAs observed in only one period; excluded from the diff set.
    pub dropped: Vec<String>,
}

impl GroupPivot {
    pub fn diffs(&self) -> Vec<f64> {
        self.units.iter().map(|u| u.log_revenue_diff).collect()
    }
}

/// DID estimate on the log scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidEstimate {
    /// Treatment effect on log revenue (gamma hat).
    pub gamma_hat: f64,
    pub standard_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Critical value the interval was built with.
    pub z: f64,
    /// Mean post-minus-pre log revenue change, treated group.
    pub r_treated: f64,
    /// Mean post-minus-pre log revenue change, untreated group.
    pub r_untreated: f64,
    pub n_treated: usize,
    pub n_untreated: usize,
}

/// The estimate expressed as a multiplicative factor on revenue levels.
/// A pure exp() of the log-scale numbers; no standard error exists on
/// this scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsEstimate {
    pub factor: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl DidEstimate {
    pub fn levels(&self) -> LevelsEstimate {
        LevelsEstimate {
            factor: self.gamma_hat.exp(),
            ci_lower: self.ci_lower.exp(),
            ci_upper: self.ci_upper.exp(),
        }
    }
}

/// One point of a daily diagnostic series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Run-level diagnostics persisted alongside the estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSummary {
    pub rows: usize,
    pub date_min: NaiveDate,
    pub date_max: NaiveDate,
    pub treated_units: usize,
    pub untreated_units: usize,
    pub treated_dropped: usize,
    pub untreated_dropped: usize,
    pub estimate: DidEstimate,
    pub levels: LevelsEstimate,
}

/// Input column names; remappable so other studies with the same shape
/// can reuse the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_date_column")]
    pub date: String,
    #[serde(default = "default_revenue_column")]
    pub revenue: String,
    #[serde(default = "default_unit_column")]
    pub unit: String,
    #[serde(default = "default_group_column")]
    pub group: String,
    #[serde(default = "default_period_column")]
    pub period: String,
}

fn default_date_column() -> String {
    "date".to_string()
}

fn default_revenue_column() -> String {
    "revenue".to_string()
}

fn default_unit_column() -> String {
    "dma".to_string()
}

fn default_group_column() -> String {
    "search_stays_on".to_string()
}

fn default_period_column() -> String {
    "treatment_period".to_string()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: default_date_column(),
            revenue: default_revenue_column(),
            unit: default_unit_column(),
            group: default_group_column(),
            period: default_period_column(),
        }
    }
}

impl ColumnMap {
    pub fn required(&self) -> [&str; 5] {
        [
            self.date.as_str(),
            self.revenue.as_str(),
            self.unit.as_str(),
            self.group.as_str(),
            self.period.as_str(),
        ]
    }
}

/// Everything transform renders; load only writes these out.
#[derive(Debug, Clone)]
pub struct RenderedArtifacts {
    pub treated_pivot_csv: String,
    pub untreated_pivot_csv: String,
    pub table_text: String,
    pub table_log_tex: String,
    pub table_levels_tex: String,
    pub revenue_chart_svg: String,
    pub gap_chart_svg: String,
    pub summary_json: String,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub treated: GroupPivot,
    pub untreated: GroupPivot,
    pub estimate: DidEstimate,
    pub summary: PanelSummary,
    pub artifacts: RenderedArtifacts,
}
