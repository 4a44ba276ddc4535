// Axis layout domain model

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    Primary,
    Secondary,
}

/// Legend anchor positions, in the order axes cycle through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegendAnchor {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
    UpperCenter,
    LowerCenter,
}

impl LegendAnchor {
    pub const ROTATION: [LegendAnchor; 6] = [
        LegendAnchor::UpperLeft,
        LegendAnchor::UpperRight,
        LegendAnchor::LowerLeft,
        LegendAnchor::LowerRight,
        LegendAnchor::UpperCenter,
        LegendAnchor::LowerCenter,
    ];

    pub fn for_axis(axis_order: usize) -> Self {
        Self::ROTATION[axis_order % Self::ROTATION.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LegendAnchor::UpperLeft => "upper left",
            LegendAnchor::UpperRight => "upper right",
            LegendAnchor::LowerLeft => "lower left",
            LegendAnchor::LowerRight => "lower right",
            LegendAnchor::UpperCenter => "upper center",
            LegendAnchor::LowerCenter => "lower center",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalStyle {
    pub signal: String,
    pub color_index: usize,
    pub style_index: usize,
}

/// Where one (group, unit) pair is drawn. Stable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisAssignment {
    pub unit: String,
    pub role: AxisRole,
    pub offset: f64,
    pub color_index: usize,
    pub style_index: usize,
    pub legend: LegendAnchor,
    pub signals: Vec<SignalStyle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelPlacement {
    pub row: usize,
    pub column: usize,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayout {
    pub group: String,
    pub panel: PanelPlacement,
    pub axes: Vec<AxisAssignment>,
}

#[cfg(test)]
impl GroupLayout {
    pub fn primary(&self) -> Option<&AxisAssignment> {
        self.axes.iter().find(|a| a.role == AxisRole::Primary)
    }

    pub fn axis_for(&self, unit: &str) -> Option<&AxisAssignment> {
        self.axes.iter().find(|a| a.unit == unit)
    }
}

/// Layout for every discovered group, in discovery order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutResult {
    pub groups: Vec<GroupLayout>,
}

#[cfg(test)]
impl LayoutResult {
    pub fn group(&self, name: &str) -> Option<&GroupLayout> {
        self.groups.iter().find(|g| g.group == name)
    }
}
