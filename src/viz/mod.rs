//! Rendering of analysis artifacts: summary tables and diagnostic charts.

pub mod series;
pub mod table;
