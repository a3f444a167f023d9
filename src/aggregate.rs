//! Ranking and folding of the per-process history into chart series.

use serde::Serialize;
use std::cmp::Ordering;

use crate::history::History;

/// Label of the series that collects everything outside the top N.
pub const OTHERS_LABEL: &str = "Others";

/// Display unit of the chart values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateUnit {
    #[serde(rename = "Mb/s")]
    MegabitsPerSecond,
    #[serde(rename = "kb/s")]
    KilobitsPerSecond,
}

impl RateUnit {
    pub fn label(&self) -> &'static str {
        match self {
            RateUnit::MegabitsPerSecond => "Mb/s",
            RateUnit::KilobitsPerSecond => "kb/s",
        }
    }
}

/// One stacked series; `values[0]` is the reserved slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Everything needed to draw or export the final chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub duration: usize,
    pub top_n: usize,
    pub unit: RateUnit,
    pub series: Vec<Series>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Largest single value across all series (0 when there are none).
    pub fn max_value(&self) -> f64 {
        self.series.iter().map(Series::max).fold(0.0, f64::max)
    }

    /// Largest per-tick stacked sum, used to size the y axis.
    pub fn max_stacked(&self) -> f64 {
        (0..=self.duration)
            .map(|i| {
                self.series
                    .iter()
                    .map(|s| s.values.get(i).copied().unwrap_or(0.0))
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }
}

/// Ranks the history by total traffic and folds the tail into "Others".
///
/// A process that is itself named "Others" keeps its own series, so the chart
/// can then carry two entries with that label.
///
/// Ties keep first-seen order. Series whose total is exactly zero are dropped,
/// "Others" included. When every remaining value is below 1 Mb/s the whole
/// chart is rescaled to kb/s.
pub fn aggregate(history: &History, top_n: usize) -> ChartData {
    let duration = history.duration();

    let mut ranked: Vec<(f64, Series)> = history
        .iter()
        .map(|(name, values)| {
            let s = Series {
                name: name.to_string(),
                values: values.to_vec(),
            };
            (s.total(), s)
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut others = Series {
        name: OTHERS_LABEL.to_string(),
        values: vec![0.0; duration + 1],
    };
    let mut series = Vec::with_capacity(top_n.min(history.len()).saturating_add(1));
    for (rank, (total, s)) in ranked.into_iter().enumerate() {
        if rank < top_n {
            if total > 0.0 {
                series.push(s);
            }
        } else {
            for (slot, v) in others.values.iter_mut().zip(&s.values) {
                *slot += v;
            }
        }
    }
    if others.total() > 0.0 {
        series.push(others);
    }

    let mut chart = ChartData {
        duration,
        top_n,
        unit: RateUnit::MegabitsPerSecond,
        series,
    };
    rescale_small_values(&mut chart);
    chart
}

/// Switches to kb/s when the chart would otherwise peak below 1 Mb/s.
pub fn rescale_small_values(chart: &mut ChartData) {
    if chart.is_empty() || chart.unit != RateUnit::MegabitsPerSecond {
        return;
    }
    if chart.max_value() < 1.0 {
        for s in &mut chart.series {
            for v in &mut s.values {
                *v *= 1000.0;
            }
        }
        chart.unit = RateUnit::KilobitsPerSecond;
    }
}
