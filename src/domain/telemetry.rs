// Telemetry data domain models
use std::collections::VecDeque;
use std::fmt;

/// One parsed reading, stamped with seconds since process start.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub group: String,
    pub signal: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: f64,
}

impl TelemetrySample {
    pub fn new(group: String, signal: String, unit: String, value: f64, timestamp: f64) -> Self {
        Self {
            group,
            signal,
            unit,
            value,
            timestamp,
        }
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(self.group.clone(), self.unit.clone(), self.signal.clone())
    }
}

/// Identifies one time series: (group, unit, signal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub group: String,
    pub unit: String,
    pub signal: String,
}

impl SeriesKey {
    pub fn new(group: String, unit: String, signal: String) -> Self {
        Self {
            group,
            unit,
            signal,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.group, self.signal, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: f64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Append-only history of one signal. Timestamps never decrease.
#[derive(Debug, Clone, Default)]
pub struct Series {
    points: VecDeque<SeriesPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.points.back().map(|p| p.timestamp)
    }

    /// Appends a point. A timestamp older than the current tail is raised to the tail's
    /// timestamp so the series stays ordered; the returned point is what was stored.
    pub fn push(&mut self, timestamp: f64, value: f64) -> SeriesPoint {
        let timestamp = match self.last_timestamp() {
            Some(last) if timestamp < last => last,
            _ => timestamp,
        };
        let point = SeriesPoint::new(timestamp, value);
        self.points.push_back(point);
        point
    }

    /// Drops every point with `timestamp < cutoff` from the head.
    pub fn evict_before(&mut self, cutoff: f64) -> usize {
        let mut removed = 0;
        while self.points.front().is_some_and(|p| p.timestamp < cutoff) {
            self.points.pop_front();
            removed += 1;
        }
        removed
    }

    /// Keeps at most `max_points` of the newest points.
    pub fn truncate_front(&mut self, max_points: usize) -> usize {
        let excess = self.points.len().saturating_sub(max_points);
        self.points.drain(..excess);
        excess
    }

    /// Copies the points with `timestamp >= cutoff`.
    pub fn points_since(&self, cutoff: f64) -> Vec<SeriesPoint> {
        let start = self.points.partition_point(|p| p.timestamp < cutoff);
        self.points.range(start..).copied().collect()
    }
}
