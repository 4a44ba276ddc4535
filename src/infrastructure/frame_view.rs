// Mapper from a snapshot and its layout to the serialisable frame served over HTTP
use crate::application::telemetry_store::{SeriesSnapshot, Snapshot};
use crate::domain::layout::{AxisAssignment, AxisRole, GroupLayout, LayoutResult};
use crate::domain::telemetry::SeriesKey;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

type SeriesLookup<'a> = HashMap<&'a SeriesKey, &'a SeriesSnapshot>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub generated_at: DateTime<Utc>,
    pub latest_timestamp: Option<f64>,
    pub time_range: Option<[f64; 2]>,
    pub panels: Vec<PanelView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub group: String,
    pub row: usize,
    pub column: usize,
    pub rows: usize,
    pub columns: usize,
    pub axes: Vec<AxisView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisView {
    pub unit: String,
    pub role: &'static str,
    pub offset: f64,
    pub color_index: usize,
    pub style_index: usize,
    pub legend: &'static str,
    /// Padded value range of everything visible on this axis, absent when empty.
    pub y_range: Option<[f64; 2]>,
    pub signals: Vec<SignalView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    pub name: String,
    pub color_index: usize,
    pub style_index: usize,
    /// `[timestamp, value]` pairs.
    pub points: Vec<[f64; 2]>,
}

pub fn frame_to_view(snapshot: &Snapshot, layout: &LayoutResult) -> FrameView {
    let series = snapshot.series_by_key();
    FrameView {
        generated_at: Utc::now(),
        latest_timestamp: snapshot.latest_timestamp,
        time_range: snapshot.time_range().map(|(from, to)| [from, to]),
        panels: layout
            .groups
            .iter()
            .map(|group| panel_to_view(&series, group))
            .collect(),
    }
}

fn panel_to_view(series: &SeriesLookup<'_>, group: &GroupLayout) -> PanelView {
    PanelView {
        group: group.group.clone(),
        row: group.panel.row,
        column: group.panel.column,
        rows: group.panel.rows,
        columns: group.panel.columns,
        axes: group
            .axes
            .iter()
            .map(|axis| axis_to_view(series, &group.group, axis))
            .collect(),
    }
}

fn axis_to_view(series: &SeriesLookup<'_>, group: &str, axis: &AxisAssignment) -> AxisView {
    let signals: Vec<SignalView> = axis
        .signals
        .iter()
        .map(|style| {
            let key = SeriesKey::new(group.to_string(), axis.unit.clone(), style.signal.clone());
            let points = series
                .get(&key)
                .map(|s| s.points.iter().map(|p| [p.timestamp, p.value]).collect())
                .unwrap_or_default();
            SignalView {
                name: style.signal.clone(),
                color_index: style.color_index,
                style_index: style.style_index,
                points,
            }
        })
        .collect();

    let y_range = padded_range(
        signals
            .iter()
            .flat_map(|s| s.points.iter().map(|[_, value]| *value)),
    );

    AxisView {
        unit: axis.unit.clone(),
        role: match axis.role {
            AxisRole::Primary => "primary",
            AxisRole::Secondary => "secondary",
        },
        offset: axis.offset,
        color_index: axis.color_index,
        style_index: axis.style_index,
        legend: axis.legend.as_str(),
        y_range,
        signals,
    }
}

/// Min/max widened by 10% of the span on each side; a flat line gets a span of 1.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })?;
    let span = if max != min { max - min } else { 1.0 };
    Some([min - 0.1 * span, max + 0.1 * span])
}
