use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::model::{DailyPoint, Group, GroupPivot, Observation, Period, UnitDiff};

/// Per-DMA accumulator for one treatment group.
#[derive(Debug, Default)]
struct CellSums {
    pre_sum: f64,
    pre_n: usize,
    post_sum: f64,
    post_n: usize,
}

/// Pivot one group's rows into per-DMA pre/post mean log revenue and the
/// post-minus-pre difference. A DMA observed in only one period cannot form
/// a difference; it is dropped from the diff set and reported in
/// `GroupPivot::dropped`.
pub fn pivot_group(observations: &[Observation], group: Group) -> GroupPivot {
    let mut cells: BTreeMap<&str, CellSums> = BTreeMap::new();

    for obs in observations.iter().filter(|o| o.group == group) {
        let cell = cells.entry(obs.dma.as_str()).or_default();
        match obs.period {
            Period::Pre => {
                cell.pre_sum += obs.log_revenue();
                cell.pre_n += 1;
            }
            Period::Post => {
                cell.post_sum += obs.log_revenue();
                cell.post_n += 1;
            }
        }
    }

    let mut units = Vec::with_capacity(cells.len());
    let mut dropped = Vec::new();

    for (dma, cell) in cells {
        if cell.pre_n == 0 || cell.post_n == 0 {
            let missing = if cell.pre_n == 0 { "pre" } else { "post" };
            tracing::warn!(
                "Dropping DMA '{}' from the {} group: no {} period observations",
                dma,
                group.label(),
                missing
            );
            dropped.push(dma.to_string());
            continue;
        }

        let log_revenue_pre = cell.pre_sum / cell.pre_n as f64;
        let log_revenue_post = cell.post_sum / cell.post_n as f64;
        units.push(UnitDiff {
            dma: dma.to_string(),
            log_revenue_pre,
            log_revenue_post,
            log_revenue_diff: log_revenue_post - log_revenue_pre,
        });
    }

    GroupPivot {
        group,
        units,
        dropped,
    }
}

/// Mean daily revenue for one group, in date order. Feeds the
/// revenue-by-group diagnostic chart.
pub fn daily_mean_revenue(observations: &[Observation], group: Group) -> Vec<DailyPoint> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for obs in observations.iter().filter(|o| o.group == group) {
        let entry = by_date.entry(obs.date).or_insert((0.0, 0));
        entry.0 += obs.revenue;
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (sum, n))| DailyPoint {
            date,
            value: sum / n as f64,
        })
        .collect()
}

/// Daily log revenue gap, control minus treatment:
/// `ln(sum untreated revenue) − ln(sum treated revenue)` per date.
/// Dates observed in only one group are skipped.
pub fn daily_log_gap(observations: &[Observation]) -> Vec<DailyPoint> {
    let mut sums: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for obs in observations {
        let entry = sums.entry(obs.date).or_insert((0.0, 0.0));
        match obs.group {
            Group::Treated => entry.0 += obs.revenue,
            Group::Untreated => entry.1 += obs.revenue,
        }
    }

    sums.into_iter()
        .filter(|(_, (treated, untreated))| *treated > 0.0 && *untreated > 0.0)
        .map(|(date, (treated, untreated))| DailyPoint {
            date,
            value: untreated.ln() - treated.ln(),
        })
        .collect()
}

/// Observed date span of the panel.
pub fn date_range(observations: &[Observation]) -> Option<(NaiveDate, NaiveDate)> {
    let min = observations.iter().map(|o| o.date).min()?;
    let max = observations.iter().map(|o| o.date).max()?;
    Some((min, max))
}
