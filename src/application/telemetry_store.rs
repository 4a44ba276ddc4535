// Telemetry store - Windowed series keyed by (group, unit, signal)
use crate::domain::error::StoreError;
use crate::domain::telemetry::{Series, SeriesKey, SeriesPoint, TelemetrySample};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How much history the store keeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    /// Seconds behind the newest timestamp anywhere in the store.
    pub window: f64,
    /// Optional hard cap on points per series.
    pub max_points_per_series: Option<usize>,
}

impl Retention {
    /// Time window only, no point cap.
    pub fn new(window: f64) -> Self {
        Self {
            window,
            max_points_per_series: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitDiscovery {
    pub name: String,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupDiscovery {
    pub name: String,
    pub units: Vec<UnitDiscovery>,
    unit_positions: HashMap<String, usize>,
}

/// Groups, units and signals in the order they were first seen.
///
/// Entries are only ever appended, so any prefix of the discovery history yields the
/// same positions it always did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiscoveryIndex {
    groups: Vec<GroupDiscovery>,
    group_positions: HashMap<String, usize>,
}

impl DiscoveryIndex {
    pub fn groups(&self) -> &[GroupDiscovery] {
        &self.groups
    }

    /// Registers a key seen for the first time. Amortised O(1).
    pub fn record(&mut self, key: &SeriesKey) {
        let group_pos = *self
            .group_positions
            .entry(key.group.clone())
            .or_insert_with(|| {
                self.groups.push(GroupDiscovery {
                    name: key.group.clone(),
                    ..Default::default()
                });
                self.groups.len() - 1
            });
        let group = &mut self.groups[group_pos];

        let unit_pos = *group
            .unit_positions
            .entry(key.unit.clone())
            .or_insert_with(|| {
                group.units.push(UnitDiscovery {
                    name: key.unit.clone(),
                    signals: Vec::new(),
                });
                group.units.len() - 1
            });
        group.units[unit_pos].signals.push(key.signal.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub key: SeriesKey,
    pub points: Vec<SeriesPoint>,
}

/// Consistent windowed copy of the store, detached from its lock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub latest_timestamp: Option<f64>,
    pub window: f64,
    pub index: DiscoveryIndex,
    /// Every known series in discovery order, including ones with nothing in the window.
    pub series: Vec<SeriesSnapshot>,
}

impl Snapshot {
    /// Lookup table over `series`, built once per frame.
    pub fn series_by_key(&self) -> HashMap<&SeriesKey, &SeriesSnapshot> {
        self.series.iter().map(|s| (&s.key, s)).collect()
    }

    #[cfg(test)]
    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| &s.key == key)
    }

    /// Visible time span: `[max(0, latest - window), latest]`.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.latest_timestamp
            .map(|latest| ((latest - self.window).max(0.0), latest))
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestReceipt {
    pub new_series: bool,
    /// Timestamp actually stored, after ordering within the series.
    pub stored_at: f64,
}

#[derive(Debug, Default)]
struct StoreState {
    series: HashMap<SeriesKey, Series>,
    index: DiscoveryIndex,
    latest: Option<f64>,
}

impl StoreState {
    fn cutoff(&self, window: f64) -> Option<f64> {
        self.latest.map(|latest| latest - window.max(0.0))
    }

    fn evict(&mut self, window: f64) -> usize {
        let Some(cutoff) = self.cutoff(window) else {
            return 0;
        };
        self.series
            .values_mut()
            .map(|series| series.evict_before(cutoff))
            .sum()
    }
}

/// Concurrency-safe home of every series.
///
/// One store-wide mutex covers index updates, appends, eviction sweeps and snapshot
/// copies. It is never held while anything is drawn.
#[derive(Debug)]
pub struct TelemetryStore {
    retention: Retention,
    state: Mutex<StoreState>,
}

impl TelemetryStore {
    pub fn new(retention: Retention) -> Self {
        Self {
            retention,
            state: Mutex::new(StoreState::default()),
        }
    }

    // Every mutation validates before touching state, so a poisoned lock still guards
    // a consistent store.
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one sample. All-or-nothing: a rejected sample changes nothing.
    pub fn ingest(&self, sample: TelemetrySample) -> Result<IngestReceipt, StoreError> {
        if !sample.timestamp.is_finite() {
            return Err(StoreError::NonFiniteTimestamp(sample.timestamp));
        }
        if !sample.value.is_finite() {
            return Err(StoreError::NonFiniteValue(sample.value));
        }

        let TelemetrySample {
            group,
            signal,
            unit,
            value,
            timestamp,
        } = sample;
        let key = SeriesKey::new(group, unit, signal);

        let mut state = self.state();
        let state = &mut *state;
        let latest = state.latest.map_or(timestamp, |l| l.max(timestamp));
        state.latest = Some(latest);

        let new_series = !state.series.contains_key(&key);
        if new_series {
            state.index.record(&key);
        }
        let series = state.series.entry(key).or_default();
        let stored = series.push(timestamp, value);
        series.evict_before(latest - self.retention.window);
        if let Some(max_points) = self.retention.max_points_per_series {
            series.truncate_front(max_points);
        }

        Ok(IngestReceipt {
            new_series,
            stored_at: stored.timestamp,
        })
    }

    /// Drops every point older than `latest - window` from every series.
    /// Series themselves are kept, even when emptied.
    pub fn evict_old(&self, window: f64) -> usize {
        self.state().evict(window)
    }

    /// Copies everything inside `[latest - window, latest]` after an eviction sweep.
    pub fn snapshot(&self, window: f64) -> Snapshot {
        let evicted = self.evict_old(self.retention.window);
        if evicted > 0 {
            tracing::trace!(evicted, "Swept expired points");
        }
        let state = self.state();

        let cutoff = state.cutoff(window).unwrap_or(f64::NEG_INFINITY);
        let mut series = Vec::with_capacity(state.series.len());
        for group in state.index.groups() {
            for unit in &group.units {
                for signal in &unit.signals {
                    let key = SeriesKey::new(group.name.clone(), unit.name.clone(), signal.clone());
                    let points = state
                        .series
                        .get(&key)
                        .map(|s| s.points_since(cutoff))
                        .unwrap_or_default();
                    series.push(SeriesSnapshot { key, points });
                }
            }
        }

        Snapshot {
            latest_timestamp: state.latest,
            window: window.max(0.0),
            index: state.index.clone(),
            series,
        }
    }

    pub fn series_count(&self) -> usize {
        self.state().series.len()
    }

    pub fn point_count(&self) -> usize {
        self.state().series.values().map(Series::len).sum()
    }

    #[cfg(test)]
    pub fn series_len(&self, key: &SeriesKey) -> Option<usize> {
        self.state().series.get(key).map(Series::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn sample(group: &str, unit: &str, signal: &str, value: f64, timestamp: f64) -> TelemetrySample {
        TelemetrySample::new(
            group.to_string(),
            signal.to_string(),
            unit.to_string(),
            value,
            timestamp,
        )
    }

    fn key(group: &str, unit: &str, signal: &str) -> SeriesKey {
        SeriesKey::new(group.to_string(), unit.to_string(), signal.to_string())
    }

    #[test]
    fn test_ingest_builds_discovery_index_in_first_seen_order() {
        let store = TelemetryStore::new(Retention::new(60.0));
        store.ingest(sample("Power", "V", "Batt", 12.0, 0.0)).unwrap();
        store.ingest(sample("Temp", "°C", "SHT41", 22.0, 0.1)).unwrap();
        store.ingest(sample("Power", "A", "Batt", 0.5, 0.2)).unwrap();
        store.ingest(sample("Power", "V", "Solar", 18.0, 0.3)).unwrap();
        store.ingest(sample("Power", "V", "Batt", 12.1, 0.4)).unwrap();

        let snapshot = store.snapshot(60.0);
        let groups: Vec<&str> = snapshot.index.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(groups, vec!["Power", "Temp"]);

        let power = &snapshot.index.groups()[0];
        let units: Vec<&str> = power.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(units, vec!["V", "A"]);
        assert_eq!(power.units[0].signals, vec!["Batt", "Solar"]);
        assert_eq!(store.series_count(), 4);
    }

    #[test]
    fn test_ingest_reports_new_series() {
        let store = TelemetryStore::new(Retention::new(60.0));
        assert!(store.ingest(sample("G", "V", "a", 1.0, 0.0)).unwrap().new_series);
        assert!(!store.ingest(sample("G", "V", "a", 1.0, 1.0)).unwrap().new_series);
    }

    #[test]
    fn test_ingest_rejects_non_finite_without_side_effects() {
        let store = TelemetryStore::new(Retention::new(60.0));

        assert!(matches!(
            store.ingest(sample("G", "V", "a", f64::NAN, 0.0)),
            Err(StoreError::NonFiniteValue(_))
        ));
        assert!(matches!(
            store.ingest(sample("G", "V", "a", 1.0, f64::INFINITY)),
            Err(StoreError::NonFiniteTimestamp(_))
        ));
        assert_eq!(store.series_count(), 0);
        assert!(store.snapshot(60.0).index.groups().is_empty());
    }

    #[test]
    fn test_snapshot_contains_exactly_the_window() {
        let store = TelemetryStore::new(Retention::new(100.0));
        for i in 0..20 {
            store.ingest(sample("G", "V", "a", i as f64, i as f64)).unwrap();
        }

        let snapshot = store.snapshot(5.0);
        let timestamps: Vec<f64> = snapshot
            .get(&key("G", "V", "a"))
            .unwrap()
            .points
            .iter()
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(timestamps, vec![14.0, 15.0, 16.0, 17.0, 18.0, 19.0]);
        assert_eq!(snapshot.time_range(), Some((14.0, 19.0)));
    }

    #[test]
    fn test_dormant_series_ages_out_but_stays_indexed() {
        let store = TelemetryStore::new(Retention::new(10.0));
        store.ingest(sample("G", "V", "old", 1.0, 0.0)).unwrap();
        store.ingest(sample("G", "A", "new", 1.0, 50.0)).unwrap();

        let snapshot = store.snapshot(10.0);
        assert!(snapshot.get(&key("G", "V", "old")).unwrap().points.is_empty());
        assert_eq!(snapshot.index.groups()[0].units.len(), 2);

        assert!(!store.ingest(sample("G", "V", "old", 2.0, 51.0)).unwrap().new_series);
        assert_eq!(store.series_len(&key("G", "V", "old")), Some(1));
    }

    #[test]
    fn test_snapshot_sweeps_dormant_series_in_the_store() {
        let store = TelemetryStore::new(Retention::new(10.0));
        store.ingest(sample("G", "V", "quiet", 1.0, 0.0)).unwrap();
        store.ingest(sample("G", "V", "quiet", 1.0, 1.0)).unwrap();
        store.ingest(sample("G", "A", "busy", 1.0, 30.0)).unwrap();
        assert_eq!(store.series_len(&key("G", "V", "quiet")), Some(2));

        store.snapshot(10.0);
        assert_eq!(store.series_len(&key("G", "V", "quiet")), Some(0));
        assert_eq!(store.point_count(), 1);
    }

    #[test]
    fn test_series_by_key_covers_every_series() {
        let store = TelemetryStore::new(Retention::new(60.0));
        store.ingest(sample("A", "V", "x", 1.0, 1.0)).unwrap();
        store.ingest(sample("B", "V", "x", 2.0, 2.0)).unwrap();

        let snapshot = store.snapshot(60.0);
        let lookup = snapshot.series_by_key();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup[&key("B", "V", "x")].points[0].value, 2.0);
    }

    #[test]
    fn test_evict_old_is_idempotent() {
        let store = TelemetryStore::new(Retention::new(1000.0));
        for i in 0..50 {
            store.ingest(sample("G", "V", "a", i as f64, i as f64)).unwrap();
            store.ingest(sample("G", "A", "b", i as f64, i as f64 + 0.5)).unwrap();
        }

        let removed = store.evict_old(10.0);
        let after_first = store.snapshot(1000.0);
        let removed_again = store.evict_old(10.0);
        let after_second = store.snapshot(1000.0);

        assert!(removed > 0);
        assert_eq!(removed_again, 0);
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_evict_old_on_empty_store() {
        let store = TelemetryStore::new(Retention::new(10.0));
        assert_eq!(store.evict_old(10.0), 0);
        assert_eq!(store.snapshot(10.0), Snapshot { window: 10.0, ..Default::default() });
    }

    #[test]
    fn test_sustained_ingest_stays_bounded() {
        let store = TelemetryStore::new(Retention::new(1.0));
        let rate = 1000.0;
        for i in 0..100_000 {
            let ts = i as f64 / rate;
            store.ingest(sample("G", "V", "a", 0.0, ts)).unwrap();
            store.ingest(sample("G", "V", "b", 0.0, ts)).unwrap();
        }

        let per_series = store.series_len(&key("G", "V", "a")).unwrap();
        assert!(per_series <= 1002, "series grew to {}", per_series);
        assert!(store.point_count() <= 2 * 1002);
    }

    #[test]
    fn test_point_cap_limits_series_length() {
        let store = TelemetryStore::new(Retention {
            window: 1000.0,
            max_points_per_series: Some(5),
        });
        for i in 0..20 {
            store.ingest(sample("G", "V", "a", i as f64, i as f64)).unwrap();
        }

        let snapshot = store.snapshot(1000.0);
        let values: Vec<f64> = snapshot.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![15.0, 16.0, 17.0, 18.0, 19.0]);
    }

    #[test]
    fn test_concurrent_writer_and_reader_never_tear() {
        let store = Arc::new(TelemetryStore::new(Retention::new(2.0)));
        let writer_store = store.clone();

        let writer = thread::spawn(move || {
            for i in 0..20_000 {
                let ts = i as f64 / 1000.0;
                let signal = ["a", "b", "c"][i % 3];
                writer_store
                    .ingest(sample("G", "V", signal, ts * 2.0, ts))
                    .unwrap();
            }
        });

        let reader_store = store.clone();
        let reader = thread::spawn(move || {
            for round in 0..500 {
                if round % 2 == 0 {
                    reader_store.evict_old(1.0);
                }
                let snapshot = reader_store.snapshot(2.0);
                for series in &snapshot.series {
                    for pair in series.points.windows(2) {
                        assert!(pair[0].timestamp <= pair[1].timestamp);
                    }
                    for point in &series.points {
                        assert_eq!(point.value, point.timestamp * 2.0);
                    }
                }
            }
        });

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(store.series_count(), 3);
    }

    #[test]
    fn test_concurrent_writers_register_each_series_once() {
        let store = Arc::new(TelemetryStore::new(Retention::new(60.0)));
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..1000 {
                        let signal = format!("s{}", i % 10);
                        store
                            .ingest(sample("G", &format!("u{}", w % 2), &signal, 1.0, i as f64 / 100.0))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot(60.0);
        let group = &snapshot.index.groups()[0];
        assert_eq!(group.units.len(), 2);
        for unit in &group.units {
            assert_eq!(unit.signals.len(), 10);
        }
        assert_eq!(snapshot.series.len(), 20);
    }
}
