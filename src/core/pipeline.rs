use crate::core::{aggregate, estimate, ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    ColumnMap, Group, GroupPivot, Observation, Period, RenderedArtifacts, TransformResult,
};
use crate::utils::error::{EtlError, Result};
use crate::viz::{series, table};
use reqwest::Client;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// The analysis pipeline: panel CSV in, estimate plus rendered
/// artifacts out. Extract parses the panel, transform computes and
/// renders everything in memory, load only writes bytes. A failed run
/// therefore never leaves partial tables or figures behind.
pub struct DidPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> DidPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }
}

/// Header positions of the five panel columns.
struct ColumnIndices {
    date: usize,
    revenue: usize,
    unit: usize,
    group: usize,
    period: usize,
}

fn resolve_columns(headers: &csv::StringRecord, columns: &ColumnMap) -> Result<ColumnIndices> {
    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| EtlError::SchemaError {
                column: name.to_string(),
                message: "column not found in header".to_string(),
            })
    };

    Ok(ColumnIndices {
        date: find(&columns.date)?,
        revenue: find(&columns.revenue)?,
        unit: find(&columns.unit)?,
        group: find(&columns.group)?,
        period: find(&columns.period)?,
    })
}

fn field<'a>(
    record: &'a csv::StringRecord,
    idx: usize,
    column: &str,
    row: usize,
) -> Result<&'a str> {
    match record.get(idx).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(EtlError::SchemaError {
            column: column.to_string(),
            message: format!("row {row}: missing value"),
        }),
    }
}

fn parse_date(value: &str, column: &str, row: usize) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| chrono::NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .map_err(|_| EtlError::SchemaError {
            column: column.to_string(),
            message: format!("row {row}: unparseable date '{value}'"),
        })
}

fn parse_flag(value: &str, column: &str, row: usize) -> Result<u8> {
    match value {
        "0" => Ok(0),
        "1" => Ok(1),
        other => Err(EtlError::SchemaError {
            column: column.to_string(),
            message: format!("row {row}: expected 0 or 1, got '{other}'"),
        }),
    }
}

/// Parse the raw panel CSV into validated observations.
fn parse_panel(data: &[u8], columns: &ColumnMap) -> Result<Vec<Observation>> {
    let mut reader = csv::Reader::from_reader(data);
    let indices = resolve_columns(reader.headers()?, columns)?;

    let mut observations = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // 第一行是標題
        let row = i + 2;

        let date = parse_date(
            field(&record, indices.date, &columns.date, row)?,
            &columns.date,
            row,
        )?;

        let revenue_raw = field(&record, indices.revenue, &columns.revenue, row)?;
        let revenue: f64 = revenue_raw.parse().map_err(|_| EtlError::SchemaError {
            column: columns.revenue.clone(),
            message: format!("row {row}: unparseable revenue '{revenue_raw}'"),
        })?;

        let dma = field(&record, indices.unit, &columns.unit, row)?.to_string();

        let group_flag = parse_flag(
            field(&record, indices.group, &columns.group, row)?,
            &columns.group,
            row,
        )?;
        let group = Group::from_flag(group_flag).ok_or_else(|| EtlError::SchemaError {
            column: columns.group.clone(),
            message: format!("row {row}: invalid group flag"),
        })?;

        let period_flag = parse_flag(
            field(&record, indices.period, &columns.period, row)?,
            &columns.period,
            row,
        )?;
        let period = Period::from_flag(period_flag).ok_or_else(|| EtlError::SchemaError {
            column: columns.period.clone(),
            message: format!("row {row}: invalid period flag"),
        })?;

        observations.push(Observation::new(dma, date, period, group, revenue)?);
    }

    Ok(observations)
}

fn pivot_csv(pivot: &GroupPivot) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for unit in &pivot.units {
        writer.serialize(unit)?;
    }
    let bytes = writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("pivot CSV buffer: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("pivot CSV is not UTF-8: {e}"),
    })
}

/// Artifact paths under the output root, paired with their contents.
fn artifact_files(artifacts: &RenderedArtifacts) -> [(&'static str, &str); 8] {
    [
        (
            "temp/treated_pivot.csv",
            artifacts.treated_pivot_csv.as_str(),
        ),
        (
            "temp/untreated_pivot.csv",
            artifacts.untreated_pivot_csv.as_str(),
        ),
        ("tables/did_table.tex", artifacts.table_log_tex.as_str()),
        (
            "tables/did_table_levels.tex",
            artifacts.table_levels_tex.as_str(),
        ),
        ("tables/did_summary.txt", artifacts.table_text.as_str()),
        (
            "figures/revenue_by_group.svg",
            artifacts.revenue_chart_svg.as_str(),
        ),
        (
            "figures/log_revenue_gap.svg",
            artifacts.gap_chart_svg.as_str(),
        ),
        ("analysis_summary.json", artifacts.summary_json.as_str()),
    ]
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DidPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Observation>> {
        let source = self.config.source();
        let columns = self.config.columns();

        let data = if source.starts_with("http://") || source.starts_with("https://") {
            tracing::debug!("Downloading panel from: {}", source);
            let response = self.client.get(source).send().await?;

            tracing::debug!("Source response status: {}", response.status());
            if !response.status().is_success() {
                return Err(EtlError::SourceError {
                    message: format!(
                        "request for {} failed with status {}",
                        source,
                        response.status()
                    ),
                });
            }
            response.bytes().await?.to_vec()
        } else {
            tracing::debug!("Reading panel from: {}", source);
            self.storage.read_file(source).await?
        };

        let observations = parse_panel(&data, &columns)?;
        tracing::debug!("Parsed {} panel rows", observations.len());
        Ok(observations)
    }

    async fn transform(&self, data: Vec<Observation>) -> Result<TransformResult> {
        let z = self.config.confidence_z();
        let treatment_date = self.config.treatment_date();

        let treated = aggregate::pivot_group(&data, Group::Treated);
        let untreated = aggregate::pivot_group(&data, Group::Untreated);

        tracing::info!(
            "Treated DMAs: {} ({} dropped)",
            treated.units.len(),
            treated.dropped.len()
        );
        tracing::info!(
            "Untreated DMAs: {} ({} dropped)",
            untreated.units.len(),
            untreated.dropped.len()
        );

        let estimate = estimate::estimate_from_pivots(&treated, &untreated, z)?;

        let (date_min, date_max) =
            aggregate::date_range(&data).ok_or_else(|| EtlError::ProcessingError {
                message: "panel has no observations".to_string(),
            })?;
        tracing::info!("Date range: {} to {}", date_min, date_max);
        tracing::info!(
            "Gamma hat: {:.4}, SE: {:.4}, CI: [{:.4}, {:.4}]",
            estimate.gamma_hat,
            estimate.standard_error,
            estimate.ci_lower,
            estimate.ci_upper
        );

        let summary = crate::domain::model::PanelSummary {
            rows: data.len(),
            date_min,
            date_max,
            treated_units: treated.units.len(),
            untreated_units: untreated.units.len(),
            treated_dropped: treated.dropped.len(),
            untreated_dropped: untreated.dropped.len(),
            estimate: estimate.clone(),
            levels: estimate.levels(),
        };

        let treated_daily = aggregate::daily_mean_revenue(&data, Group::Treated);
        let untreated_daily = aggregate::daily_mean_revenue(&data, Group::Untreated);
        let gap = aggregate::daily_log_gap(&data);

        let artifacts = RenderedArtifacts {
            treated_pivot_csv: pivot_csv(&treated)?,
            untreated_pivot_csv: pivot_csv(&untreated)?,
            table_text: table::text_summary(&estimate),
            table_log_tex: table::latex_log_table(&estimate),
            table_levels_tex: table::latex_levels_table(&estimate),
            revenue_chart_svg: series::revenue_by_group_svg(
                &treated_daily,
                &untreated_daily,
                treatment_date,
            ),
            gap_chart_svg: series::log_gap_svg(&gap, treatment_date),
            summary_json: serde_json::to_string_pretty(&summary)?,
        };

        Ok(TransformResult {
            treated,
            untreated,
            estimate,
            summary,
            artifacts,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let files = artifact_files(&result.artifacts);

        for (path, content) in files {
            tracing::debug!("Writing {} ({} bytes)", path, content.len());
            self.storage.write_file(path, content.as_bytes()).await?;
        }

        if self.config.archive_output() {
            // 打包所有輸出
            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (path, content) in files {
                    zip.start_file::<_, ()>(path, FileOptions::default())?;
                    zip.write_all(content.as_bytes())?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            tracing::debug!("Writing did_output.zip ({} bytes)", zip_data.len());
            self.storage.write_file("did_output.zip", &zip_data).await?;
        }

        Ok(self.config.output_path().to_string())
    }
}
