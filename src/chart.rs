//! ==============================================================================
//! chart.rs - line chart widget
//! ==============================================================================
//!
//! purpose:
//!     the chart capability the dashboard draws through. a widget owns a
//!     {labels, datasets} structure that callers replace wholesale and a
//!     redraw that turns it into something a browser can show (inline svg).
//!
//! relationships:
//!     - used by: dashboard.rs (one widget for temp+humidity, one for eco2)
//!     - served by: server.rs (svg embedded in the html page)
//!
//! ==============================================================================

use anyhow::{Result, bail};
use serde::Serialize;
use std::fmt::Write as _;

/// what the dashboard needs from a chart: replace data, then redraw
pub trait ChartWidget {
    fn set_labels(&mut self, labels: Vec<String>);
    fn set_data(&mut self, dataset: usize, data: Vec<f64>) -> Result<()>;
    fn redraw(&mut self);
}

#[derive(Clone, Debug, Serialize)]
pub struct Dataset {
    pub label: String,
    /// css colour of the line
    pub color: String,
    pub data: Vec<f64>,
}

impl Dataset {
    pub fn new(label: &str, color: &str) -> Self {
        Self { label: label.to_string(), color: color.to_string(), data: Vec::new() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LineChart {
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// number of times redraw has run
    pub revision: u64,
    #[serde(skip)]
    svg: String,
}

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 280.0;
const PAD_LEFT: f64 = 48.0;
const PAD_RIGHT: f64 = 12.0;
const PAD_TOP: f64 = 28.0;
const PAD_BOTTOM: f64 = 32.0;
/// at most this many x-axis labels are printed
const MAX_TICKS: usize = 6;

impl LineChart {
    pub fn new(title: &str, datasets: Vec<Dataset>) -> Self {
        let mut chart = Self {
            title: title.to_string(),
            labels: Vec::new(),
            datasets,
            revision: 0,
            svg: String::new(),
        };
        chart.svg = chart.draw();
        chart
    }

    /// temperature and humidity share one chart
    pub fn climate() -> Self {
        Self::new(
            "Temperature / Humidity",
            vec![
                Dataset::new("Temperature (°C)", "rgb(255, 99, 132)"),
                Dataset::new("Humidity (%)", "rgb(54, 162, 235)"),
            ],
        )
    }

    pub fn eco2() -> Self {
        Self::new("eCO2", vec![Dataset::new("eCO2 (ppm)", "rgb(75, 192, 192)")])
    }

    /// svg produced by the last redraw
    pub fn svg(&self) -> &str {
        &self.svg
    }

    fn y_range(&self) -> Option<(f64, f64)> {
        let mut values = self.datasets.iter().flat_map(|d| d.data.iter().copied()).filter(|v| v.is_finite());
        let first = values.next()?;
        let (lo, hi) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if hi - lo < f64::EPSILON {
            // flat line, give it some room
            Some((lo - 1.0, hi + 1.0))
        } else {
            let margin = (hi - lo) * 0.05;
            Some((lo - margin, hi + margin))
        }
    }

    fn x(&self, i: usize) -> f64 {
        let span = WIDTH - PAD_LEFT - PAD_RIGHT;
        let n = self.labels.len().max(self.datasets.iter().map(|d| d.data.len()).max().unwrap_or(0));
        if n <= 1 {
            PAD_LEFT + span / 2.0
        } else {
            PAD_LEFT + span * i as f64 / (n - 1) as f64
        }
    }

    fn draw(&self) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" class="chart" role="img" aria-label="{}">"#,
            escape(&self.title)
        );
        let bottom = HEIGHT - PAD_BOTTOM;
        let _ = write!(
            svg,
            r##"<line x1="{PAD_LEFT}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="#555"/>"##,
            WIDTH - PAD_RIGHT
        );

        // legend
        for (i, ds) in self.datasets.iter().enumerate() {
            let x = PAD_LEFT + i as f64 * 170.0;
            let _ = write!(
                svg,
                r#"<rect x="{x}" y="8" width="12" height="12" fill="{c}"/><text x="{}" y="18" font-size="12">{}</text>"#,
                x + 16.0,
                escape(&ds.label),
                c = ds.color,
            );
        }

        let Some((lo, hi)) = self.y_range() else {
            let _ = write!(
                svg,
                r#"<text x="{}" y="{}" font-size="14" text-anchor="middle">no data</text></svg>"#,
                WIDTH / 2.0,
                HEIGHT / 2.0
            );
            return svg;
        };
        let y = |v: f64| PAD_TOP + (hi - v) / (hi - lo) * (bottom - PAD_TOP);

        let _ = write!(svg, r#"<text x="4" y="{:.1}" font-size="11">{hi:.1}</text>"#, PAD_TOP + 4.0);
        let _ = write!(svg, r#"<text x="4" y="{bottom:.1}" font-size="11">{lo:.1}</text>"#);

        let step = self.labels.len().div_ceil(MAX_TICKS).max(1);
        for (i, label) in self.labels.iter().enumerate().step_by(step) {
            let _ = write!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
                self.x(i),
                HEIGHT - 10.0,
                escape(label)
            );
        }

        for ds in &self.datasets {
            let points: Vec<String> = ds
                .data
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, v)| format!("{:.1},{:.1}", self.x(i), y(*v)))
                .collect();
            if points.is_empty() {
                continue;
            }
            let _ = write!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
                ds.color,
                points.join(" ")
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

impl ChartWidget for LineChart {
    fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    fn set_data(&mut self, dataset: usize, data: Vec<f64>) -> Result<()> {
        let Some(ds) = self.datasets.get_mut(dataset) else {
            bail!("chart {:?} has no dataset {}", self.title, dataset);
        };
        ds.data = data;
        Ok(())
    }

    fn redraw(&mut self) {
        self.svg = self.draw();
        self.revision += 1;
    }
}

/// escape html special characters to prevent xss
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_data_replaces_instead_of_appending() {
        let mut chart = LineChart::eco2();
        chart.set_data(0, vec![400.0, 410.0, 420.0]).unwrap();
        chart.set_data(0, vec![500.0]).unwrap();
        assert_eq!(chart.datasets[0].data, vec![500.0]);
    }

    #[test]
    fn unknown_dataset_is_an_error() {
        let mut chart = LineChart::eco2();
        assert!(chart.set_data(1, vec![1.0]).is_err());
    }

    #[test]
    fn svg_only_changes_on_redraw() {
        let mut chart = LineChart::climate();
        let blank = chart.svg().to_string();
        assert!(blank.contains("no data"));

        chart.set_labels(vec!["09:00:00".into(), "09:00:02".into()]);
        chart.set_data(0, vec![21.0, 22.0]).unwrap();
        chart.set_data(1, vec![60.0, 61.0]).unwrap();
        assert_eq!(chart.svg(), blank);
        assert_eq!(chart.revision, 0);

        chart.redraw();
        assert_eq!(chart.revision, 1);
        assert_eq!(chart.svg().matches("<polyline").count(), 2);
        assert!(chart.svg().contains("09:00:02"));
    }

    #[test]
    fn flat_series_still_draws() {
        let mut chart = LineChart::eco2();
        chart.set_labels(vec!["a".into(), "b".into()]);
        chart.set_data(0, vec![400.0, 400.0]).unwrap();
        chart.redraw();
        assert!(chart.svg().contains("<polyline"));
        assert!(!chart.svg().contains("NaN"));
    }

    #[test]
    fn labels_are_escaped() {
        let mut chart = LineChart::eco2();
        chart.set_labels(vec!["<b>".into()]);
        chart.set_data(0, vec![1.0]).unwrap();
        chart.redraw();
        assert!(chart.svg().contains("&lt;b&gt;"));
    }
}
