//! Hand-built SVG time-series charts for the two diagnostic figures.
//!
//! Both charts share the same 3:1 frame: dated x axis with month ticks,
//! a dashed vertical marker at the treatment date, and polyline series.
//! Output is deterministic for a given input.

use std::fmt::Write as FmtWrite;

use chrono::{Datelike, NaiveDate};

use crate::domain::model::DailyPoint;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 300.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;
const MARGIN_LEFT: f64 = 70.0;

const CONTROL_COLOR: &str = "#1f77b4";
const TREATMENT_COLOR: &str = "#ff7f0e";
const AXIS_COLOR: &str = "#333333";
const MARKER_COLOR: &str = "#555555";

/// Plot rectangle plus data domain. Maps dates and values to canvas
/// coordinates.
struct Frame {
    x0: f64,
    x1: f64,
    y_top: f64,
    y_bottom: f64,
    d_min: NaiveDate,
    span_days: f64,
    v_min: f64,
    v_range: f64,
}

impl Frame {
    fn new(d_min: NaiveDate, d_max: NaiveDate, v_min: f64, v_max: f64, right_margin: f64) -> Self {
        let span_days = ((d_max - d_min).num_days().max(1)) as f64;
        let pad = if (v_max - v_min).abs() < 1e-12 {
            v_max.abs().max(1.0) * 0.1
        } else {
            (v_max - v_min) * 0.05
        };
        let v_min = v_min - pad;
        let v_range = (v_max + pad) - v_min;
        Self {
            x0: MARGIN_LEFT,
            x1: WIDTH - right_margin,
            y_top: MARGIN_TOP,
            y_bottom: HEIGHT - MARGIN_BOTTOM,
            d_min,
            span_days,
            v_min,
            v_range,
        }
    }

    // 日期轉成畫布座標
    fn x(&self, date: NaiveDate) -> f64 {
        let t = (date - self.d_min).num_days() as f64;
        self.x0 + t / self.span_days * (self.x1 - self.x0)
    }

    fn y(&self, value: f64) -> f64 {
        let t = (value - self.v_min) / self.v_range;
        self.y_bottom - t * (self.y_bottom - self.y_top)
    }

    fn points(&self, series: &[DailyPoint]) -> Vec<(f64, f64)> {
        series
            .iter()
            .map(|p| (self.x(p.date), self.y(p.value)))
            .collect()
    }
}

fn xml_escape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for ch in content.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn push_polyline(out: &mut String, points: &[(f64, f64)], color: &str) {
    if points.is_empty() {
        return;
    }
    let mut attr = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            attr.push(' ');
        }
        let _ = write!(attr, "{x:.2},{y:.2}");
    }
    let _ = writeln!(
        out,
        r#"<polyline points="{attr}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
    );
}

fn push_text(out: &mut String, x: f64, y: f64, anchor: &str, content: &str) {
    let _ = writeln!(
        out,
        r#"<text x="{x:.2}" y="{y:.2}" font-family="sans-serif" font-size="12" fill="{AXIS_COLOR}" text-anchor="{anchor}">{}</text>"#,
        xml_escape(content)
    );
}

/// Multi-line annotation at the end of a series, one tspan per line.
fn push_end_label(out: &mut String, x: f64, y: f64, color: &str, lines: &[&str]) {
    let _ = write!(
        out,
        r#"<text x="{x:.2}" y="{y:.2}" font-family="sans-serif" font-size="12" fill="{color}">"#
    );
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            let _ = write!(out, "<tspan>{}</tspan>", xml_escape(line));
        } else {
            let _ = write!(
                out,
                r#"<tspan x="{x:.2}" dy="1.2em">{}</tspan>"#,
                xml_escape(line)
            );
        }
    }
    let _ = writeln!(out, "</text>");
}

/// First day of each month inside the window, matching month-locator ticks.
fn month_ticks(d_min: NaiveDate, d_max: NaiveDate) -> Vec<NaiveDate> {
    let mut ticks = Vec::new();
    let mut year = d_min.year();
    let mut month = d_min.month();
    loop {
        if let Some(tick) = NaiveDate::from_ymd_opt(year, month, 1) {
            if tick > d_max {
                break;
            }
            if tick >= d_min {
                ticks.push(tick);
            }
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    ticks
}

fn value_ticks(frame: &Frame) -> Vec<f64> {
    const N: usize = 5;
    (0..N)
        .map(|i| frame.v_min + frame.v_range * i as f64 / (N - 1) as f64)
        .collect()
}

fn format_tick(value: f64, range: f64) -> String {
    if range >= 100.0 {
        format!("{value:.0}")
    } else if range >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.3}")
    }
}

fn push_frame(out: &mut String, frame: &Frame, d_max: NaiveDate, y_label: &str) {
    // Axes
    let _ = writeln!(
        out,
        r#"<line x1="{x0:.2}" y1="{yb:.2}" x2="{x1:.2}" y2="{yb:.2}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
        x0 = frame.x0,
        x1 = frame.x1,
        yb = frame.y_bottom,
    );
    let _ = writeln!(
        out,
        r#"<line x1="{x0:.2}" y1="{yt:.2}" x2="{x0:.2}" y2="{yb:.2}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
        x0 = frame.x0,
        yt = frame.y_top,
        yb = frame.y_bottom,
    );

    for tick in month_ticks(frame.d_min, d_max) {
        let x = frame.x(tick);
        let _ = writeln!(
            out,
            r#"<line x1="{x:.2}" y1="{yb:.2}" x2="{x:.2}" y2="{yb2:.2}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
            yb = frame.y_bottom,
            yb2 = frame.y_bottom + 4.0,
        );
        push_text(
            out,
            x,
            frame.y_bottom + 18.0,
            "middle",
            &tick.format("%b").to_string(),
        );
    }

    for value in value_ticks(frame) {
        let y = frame.y(value);
        let _ = writeln!(
            out,
            r#"<line x1="{x0:.2}" y1="{y:.2}" x2="{x02:.2}" y2="{y:.2}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
            x0 = frame.x0 - 4.0,
            x02 = frame.x0,
        );
        push_text(
            out,
            frame.x0 - 8.0,
            y + 4.0,
            "end",
            &format_tick(value, frame.v_range),
        );
    }

    if !y_label.is_empty() {
        let cy = (frame.y_top + frame.y_bottom) / 2.0;
        let _ = writeln!(
            out,
            r#"<text x="16" y="{cy:.2}" font-family="sans-serif" font-size="12" fill="{AXIS_COLOR}" text-anchor="middle" transform="rotate(-90 16 {cy:.2})">{}</text>"#,
            xml_escape(y_label)
        );
    }
}

fn push_treatment_marker(out: &mut String, frame: &Frame, treatment_date: NaiveDate) {
    let x = frame.x(treatment_date);
    if x < frame.x0 || x > frame.x1 {
        return;
    }
    let _ = writeln!(
        out,
        r#"<line x1="{x:.2}" y1="{yt:.2}" x2="{x:.2}" y2="{yb:.2}" stroke="{MARKER_COLOR}" stroke-width="1" stroke-dasharray="6 3"/>"#,
        yt = frame.y_top,
        yb = frame.y_bottom,
    );
}

fn svg_open(out: &mut String) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">"#
    );
    let _ = writeln!(
        out,
        r#"<rect x="0" y="0" width="{WIDTH:.0}" height="{HEIGHT:.0}" fill="white"/>"#
    );
}

fn domain(series: &[&[DailyPoint]]) -> (NaiveDate, NaiveDate, f64, f64) {
    let mut d_min = None;
    let mut d_max = None;
    let mut v_min = f64::INFINITY;
    let mut v_max = f64::NEG_INFINITY;
    for points in series {
        for p in *points {
            d_min = Some(d_min.map_or(p.date, |d: NaiveDate| d.min(p.date)));
            d_max = Some(d_max.map_or(p.date, |d: NaiveDate| d.max(p.date)));
            v_min = v_min.min(p.value);
            v_max = v_max.max(p.value);
        }
    }
    let fallback = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default();
    let d_min = d_min.unwrap_or(fallback);
    let d_max = d_max.unwrap_or(d_min);
    if v_min > v_max {
        v_min = 0.0;
        v_max = 1.0;
    }
    (d_min, d_max, v_min, v_max)
}

/// Mean daily revenue per group with the treatment-date marker. The series
/// are labelled at their right-hand ends rather than in a legend.
pub fn revenue_by_group_svg(
    treated: &[DailyPoint],
    untreated: &[DailyPoint],
    treatment_date: NaiveDate,
) -> String {
    let (d_min, d_max, v_min, v_max) = domain(&[treated, untreated]);
    // Extra days on the right keep the end labels clear of the lines.
    let label_end = d_max + chrono::Days::new(5);
    let frame = Frame::new(d_min, label_end, v_min, v_max, 170.0);

    let mut out = String::new();
    svg_open(&mut out);
    push_frame(&mut out, &frame, d_max, "revenue");
    push_treatment_marker(&mut out, &frame, treatment_date);

    push_polyline(&mut out, &frame.points(untreated), CONTROL_COLOR);
    push_polyline(&mut out, &frame.points(treated), TREATMENT_COLOR);

    if let Some(last) = untreated.last() {
        push_end_label(
            &mut out,
            frame.x(last.date) + 6.0,
            frame.y(last.value),
            CONTROL_COLOR,
            &["control", "(search stays on)"],
        );
    }
    if let Some(last) = treated.last() {
        push_end_label(
            &mut out,
            frame.x(last.date) + 6.0,
            frame.y(last.value),
            TREATMENT_COLOR,
            &["treatment", "(search goes off)"],
        );
    }

    out.push_str("</svg>\n");
    out
}

/// Daily log revenue gap (control minus treatment) with the
/// treatment-date marker.
pub fn log_gap_svg(gap: &[DailyPoint], treatment_date: NaiveDate) -> String {
    let (d_min, d_max, v_min, v_max) = domain(&[gap]);
    let frame = Frame::new(d_min, d_max, v_min, v_max, 30.0);

    let mut out = String::new();
    svg_open(&mut out);
    push_text(
        &mut out,
        (frame.x0 + frame.x1) / 2.0,
        18.0,
        "middle",
        "Log Revenue Gap Over Time (Control - Treatment)",
    );
    push_frame(&mut out, &frame, d_max, "log(rev_control) - log(rev_treat)");
    push_treatment_marker(&mut out, &frame, treatment_date);
    push_polyline(&mut out, &frame.points(gap), CONTROL_COLOR);

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, value: f64) -> DailyPoint {
        DailyPoint {
            date: NaiveDate::from_ymd_opt(2012, 4, day).unwrap(),
            value,
        }
    }

    fn treatment_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2012, 4, 15).unwrap()
    }

    #[test]
    fn revenue_chart_draws_both_series_with_end_labels() {
        let treated = vec![point(1, 100.0), point(10, 110.0), point(28, 95.0)];
        let untreated = vec![point(1, 120.0), point(10, 130.0), point(28, 125.0)];

        let svg = revenue_by_group_svg(&treated, &untreated, treatment_date());

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains(CONTROL_COLOR));
        assert!(svg.contains(TREATMENT_COLOR));
        assert!(svg.contains("(search stays on)"));
        assert!(svg.contains("(search goes off)"));
        assert!(svg.contains("stroke-dasharray=\"6 3\""));
        assert!(svg.contains(">revenue</text>"));
        assert!(svg.contains(">Apr</text>"));
    }

    #[test]
    fn gap_chart_has_title_marker_and_one_series() {
        let gap = vec![point(1, 0.02), point(14, 0.03), point(28, 0.12)];

        let svg = log_gap_svg(&gap, treatment_date());

        assert_eq!(svg.matches("<polyline").count(), 1);
        assert!(svg.contains("Log Revenue Gap Over Time (Control - Treatment)"));
        assert!(svg.contains("log(rev_control) - log(rev_treat)"));
        assert!(svg.contains("stroke-dasharray=\"6 3\""));
    }

    #[test]
    fn output_is_deterministic() {
        let gap = vec![point(1, 0.02), point(28, 0.12)];
        let a = log_gap_svg(&gap, treatment_date());
        let b = log_gap_svg(&gap, treatment_date());
        assert_eq!(a, b);
    }

    #[test]
    fn marker_outside_the_window_is_omitted() {
        let gap = vec![point(1, 0.02), point(28, 0.12)];
        let far_future = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        let svg = log_gap_svg(&gap, far_future);
        assert!(!svg.contains("stroke-dasharray"));
    }

    #[test]
    fn empty_series_still_produces_a_well_formed_frame() {
        let svg = log_gap_svg(&[], treatment_date());
        assert!(svg.starts_with("<svg"));
        assert!(svg.matches("<polyline").count() == 0);
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn text_content_is_escaped() {
        assert_eq!(xml_escape("a<b & c>d"), "a&lt;b &amp; c&gt;d");
    }
}
