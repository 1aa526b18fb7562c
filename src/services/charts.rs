//! Chart.js configurations for the dashboard.
//!
//! The server decides what every chart shows; the browser script only hands
//! these objects to `new Chart(canvasId, config)` after destroying whatever
//! instance the canvas held before.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::services::summary::PageSummary;

pub const CATEGORY_CANVAS: &str = "categoryChart";
pub const ANOMALY_CANVAS: &str = "anomalyChart";
pub const MONTHLY_CANVAS: &str = "monthlyChart";
pub const FORECAST_CANVAS: &str = "forecastChart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Doughnut,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(rename = "borderDash", skip_serializing_if = "Option::is_none")]
    pub border_dash: Option<[u8; 2]>,
}

impl Dataset {
    fn new(label: Option<&str>, data: Vec<f64>) -> Self {
        Self {
            label: label.map(String::from),
            data,
            tension: None,
            fill: None,
            border_dash: None,
        }
    }

    fn smooth_line(mut self) -> Self {
        self.tension = Some(0.3);
        self.fill = Some(false);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// A complete Chart.js configuration object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
}

/// The three charts derived from the visible page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCharts {
    #[serde(rename = "categoryChart")]
    pub category: ChartConfig,
    #[serde(rename = "anomalyChart")]
    pub anomaly: ChartConfig,
    #[serde(rename = "monthlyChart")]
    pub monthly: ChartConfig,
}

pub fn category_chart(summary: &PageSummary) -> ChartConfig {
    let (labels, data): (Vec<String>, Vec<f64>) = summary.categories.iter().cloned().unzip();
    ChartConfig {
        kind: ChartKind::Bar,
        data: ChartData {
            labels,
            datasets: vec![Dataset::new(Some("Spending by Category"), data)],
        },
    }
}

pub fn anomaly_chart(summary: &PageSummary) -> ChartConfig {
    ChartConfig {
        kind: ChartKind::Doughnut,
        data: ChartData {
            labels: vec!["Normal".into(), "Anomaly".into()],
            datasets: vec![Dataset::new(
                None,
                vec![
                    summary.anomalies.normal as f64,
                    summary.anomalies.anomaly as f64,
                ],
            )],
        },
    }
}

pub fn monthly_chart(summary: &PageSummary) -> ChartConfig {
    line_chart("Monthly Spending", &summary.monthly)
}

pub fn forecast_chart(forecast: &BTreeMap<String, f64>) -> ChartConfig {
    let mut chart = line_chart("Forecasted Spending", forecast);
    for dataset in &mut chart.data.datasets {
        dataset.border_dash = Some([6, 6]);
    }
    chart
}

fn line_chart(label: &str, series: &BTreeMap<String, f64>) -> ChartConfig {
    ChartConfig {
        kind: ChartKind::Line,
        data: ChartData {
            labels: series.keys().cloned().collect(),
            datasets: vec![Dataset::new(Some(label), series.values().copied().collect()).smooth_line()],
        },
    }
}

pub fn summary_charts(summary: &PageSummary) -> SummaryCharts {
    SummaryCharts {
        category: category_chart(summary),
        anomaly: anomaly_chart(summary),
        monthly: monthly_chart(summary),
    }
}
