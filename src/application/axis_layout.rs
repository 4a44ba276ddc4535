// Axis layout engine - Maps discovered groups and units onto stable plot axes
use crate::application::telemetry_store::{DiscoveryIndex, GroupDiscovery};
use crate::domain::layout::{
    AxisAssignment, AxisRole, GroupLayout, LayoutResult, LegendAnchor, PanelPlacement, SignalStyle,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSettings {
    /// Distance between consecutive secondary axes, in renderer units.
    pub offset_step: f64,
    pub palette_size: usize,
    pub line_style_count: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            offset_step: 60.0,
            palette_size: 10,
            line_style_count: 4,
        }
    }
}

/// Derives the layout purely from discovery order, never from values.
///
/// Because the index only grows by appending, every assignment handed out once is
/// handed out identically on every later call.
#[derive(Debug, Clone)]
pub struct AxisLayoutEngine {
    settings: LayoutSettings,
}

impl AxisLayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    pub fn layout(&self, index: &DiscoveryIndex) -> LayoutResult {
        let groups = index.groups();
        let columns = if groups.len() > 1 { 2 } else { 1 };
        let rows = groups.len().div_ceil(columns);

        let groups = groups
            .iter()
            .enumerate()
            .map(|(position, group)| GroupLayout {
                group: group.name.clone(),
                panel: PanelPlacement {
                    row: position / columns,
                    column: position % columns,
                    rows,
                    columns,
                },
                axes: self.assign_axes(group),
            })
            .collect();

        LayoutResult { groups }
    }

    fn assign_axes(&self, group: &GroupDiscovery) -> Vec<AxisAssignment> {
        let palette = self.settings.palette_size.max(1);
        let styles = self.settings.line_style_count.max(1);

        group
            .units
            .iter()
            .enumerate()
            .map(|(order, unit)| {
                let role = if order == 0 {
                    AxisRole::Primary
                } else {
                    AxisRole::Secondary
                };
                let style_index = order % styles;
                let signals = unit
                    .signals
                    .iter()
                    .enumerate()
                    .map(|(assigned, signal)| SignalStyle {
                        signal: signal.clone(),
                        color_index: assigned % palette,
                        style_index,
                    })
                    .collect();

                AxisAssignment {
                    unit: unit.name.clone(),
                    role,
                    offset: order as f64 * self.settings.offset_step,
                    color_index: order % palette,
                    style_index,
                    legend: LegendAnchor::for_axis(order),
                    signals,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::SeriesKey;

    fn index_of(keys: &[(&str, &str, &str)]) -> DiscoveryIndex {
        let mut index = DiscoveryIndex::default();
        for (group, unit, signal) in keys {
            index.record(&SeriesKey::new(
                group.to_string(),
                unit.to_string(),
                signal.to_string(),
            ));
        }
        index
    }

    fn engine() -> AxisLayoutEngine {
        AxisLayoutEngine::new(LayoutSettings::default())
    }

    #[test]
    fn test_first_unit_is_primary_and_next_is_offset() {
        let index = index_of(&[("Power", "V", "Batt"), ("Power", "A", "Batt")]);
        let layout = engine().layout(&index);

        let power = layout.group("Power").unwrap();
        let volts = power.axis_for("V").unwrap();
        let amps = power.axis_for("A").unwrap();
        assert_eq!(volts.role, AxisRole::Primary);
        assert_eq!(volts.offset, 0.0);
        assert_eq!(amps.role, AxisRole::Secondary);
        assert_eq!(amps.offset, 60.0);
        assert_eq!(power.primary().map(|a| a.unit.as_str()), Some("V"));
    }

    #[test]
    fn test_secondary_offsets_increase_in_discovery_order() {
        let index = index_of(&[
            ("G", "W", "p"),
            ("G", "V", "u"),
            ("G", "A", "i"),
            ("G", "Hz", "f"),
        ]);
        let layout = AxisLayoutEngine::new(LayoutSettings {
            offset_step: 45.0,
            ..Default::default()
        })
        .layout(&index);

        let offsets: Vec<f64> = layout.groups[0].axes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0.0, 45.0, 90.0, 135.0]);
        let primaries = layout.groups[0]
            .axes
            .iter()
            .filter(|a| a.role == AxisRole::Primary)
            .count();
        assert_eq!(primaries, 1);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let index = index_of(&[
            ("Temp", "°C", "SHT41"),
            ("Power", "V", "Batt"),
            ("Temp", "%", "Humidity"),
            ("Power", "A", "Batt"),
        ]);
        let engine = engine();

        assert_eq!(engine.layout(&index), engine.layout(&index));
        assert_eq!(
            format!("{:?}", engine.layout(&index)),
            format!("{:?}", engine.layout(&index.clone()))
        );
    }

    #[test]
    fn test_primary_unaffected_by_other_groups() {
        let alone = index_of(&[("Power", "V", "Batt"), ("Power", "A", "Batt")]);
        let mixed = index_of(&[
            ("Temp", "A", "x"),
            ("Power", "V", "Batt"),
            ("Temp", "°C", "y"),
            ("Power", "A", "Batt"),
        ]);

        let engine = engine();
        let alone = engine.layout(&alone);
        let mixed = engine.layout(&mixed);
        assert_eq!(
            alone.group("Power").unwrap().axes,
            mixed.group("Power").unwrap().axes
        );
    }

    #[test]
    fn test_assignments_survive_later_discoveries() {
        let mut keys = vec![("G", "V", "a"), ("G", "A", "b"), ("H", "V", "c")];
        let engine = engine();
        let before = engine.layout(&index_of(&keys));

        keys.extend([("G", "Hz", "d"), ("G", "V", "e"), ("I", "K", "f")]);
        let after = engine.layout(&index_of(&keys));

        for group in &before.groups {
            let grown = after.group(&group.group).unwrap();
            for (axis, grown_axis) in group.axes.iter().zip(&grown.axes) {
                assert_eq!(axis.unit, grown_axis.unit);
                assert_eq!(axis.role, grown_axis.role);
                assert_eq!(axis.offset, grown_axis.offset);
                assert_eq!(axis.legend, grown_axis.legend);
                assert_eq!(axis.signals[..], grown_axis.signals[..axis.signals.len()]);
            }
        }
    }

    #[test]
    fn test_signal_colors_count_within_axis_and_wrap() {
        let keys: Vec<(&str, &str, &str)> = ["s0", "s1", "s2", "s3"]
            .into_iter()
            .map(|s| ("G", "V", s))
            .chain([("G", "A", "t0")])
            .collect();
        let layout = AxisLayoutEngine::new(LayoutSettings {
            palette_size: 3,
            ..Default::default()
        })
        .layout(&index_of(&keys));

        let volts: Vec<usize> = layout.groups[0].axes[0]
            .signals
            .iter()
            .map(|s| s.color_index)
            .collect();
        assert_eq!(volts, vec![0, 1, 2, 0]);
        assert_eq!(layout.groups[0].axes[1].signals[0].color_index, 0);
        assert_eq!(layout.groups[0].axes[1].signals[0].style_index, 1);
    }

    #[test]
    fn test_legend_rotates_per_axis() {
        let units = ["u0", "u1", "u2", "u3", "u4", "u5", "u6"];
        let keys: Vec<(&str, &str, &str)> = units.iter().map(|u| ("G", *u, "s")).collect();
        let layout = engine().layout(&index_of(&keys));

        let legends: Vec<LegendAnchor> = layout.groups[0].axes.iter().map(|a| a.legend).collect();
        assert_eq!(legends[..6], LegendAnchor::ROTATION[..]);
        assert_eq!(legends[6], LegendAnchor::UpperLeft);
    }

    #[test]
    fn test_panels_fill_two_columns() {
        let single = engine().layout(&index_of(&[("A", "V", "s")]));
        assert_eq!(
            single.groups[0].panel,
            PanelPlacement { row: 0, column: 0, rows: 1, columns: 1 }
        );

        let three = engine().layout(&index_of(&[("A", "V", "s"), ("B", "V", "s"), ("C", "V", "s")]));
        let cells: Vec<(usize, usize)> = three
            .groups
            .iter()
            .map(|g| (g.panel.row, g.panel.column))
            .collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0)]);
        assert_eq!(three.groups[2].panel.rows, 2);
    }

    #[test]
    fn test_empty_index_yields_empty_layout() {
        assert_eq!(engine().layout(&DiscoveryIndex::default()), LayoutResult::default());
    }
}
