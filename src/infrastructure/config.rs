use crate::application::axis_layout::LayoutSettings;
use crate::application::telemetry_store::Retention;
use crate::domain::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlotterConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_axis_offset_step")]
    pub axis_offset_step: f64,
    #[serde(default = "default_palette_size")]
    pub palette_size: usize,
    #[serde(default = "default_line_style_count")]
    pub line_style_count: usize,
    #[serde(default)]
    pub max_points_per_series: Option<usize>,
    /// Empty disables the append log.
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    #[default]
    Stdin,
    /// Regular file, FIFO or an already configured serial device node.
    File { path: String },
    Tcp { address: String },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_window_secs() -> f64 {
    60.0
}

fn default_tick_ms() -> u64 {
    100
}

fn default_axis_offset_step() -> f64 {
    60.0
}

fn default_palette_size() -> usize {
    10
}

fn default_line_style_count() -> usize {
    4
}

fn default_log_file() -> String {
    "uart.log".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl PlotterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("window_secs", self.window_secs),
            ("axis_offset_step", self.axis_offset_step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Zero("tick_ms"));
        }
        if self.palette_size == 0 {
            return Err(ConfigError::Zero("palette_size"));
        }
        if self.line_style_count == 0 {
            return Err(ConfigError::Zero("line_style_count"));
        }
        if self.max_points_per_series == Some(0) {
            return Err(ConfigError::Zero("max_points_per_series"));
        }
        Ok(())
    }

    pub fn retention(&self) -> Retention {
        Retention {
            max_points_per_series: self.max_points_per_series,
            ..Retention::new(self.window_secs)
        }
    }

    pub fn layout_settings(&self) -> LayoutSettings {
        LayoutSettings {
            offset_step: self.axis_offset_step,
            palette_size: self.palette_size,
            line_style_count: self.line_style_count,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn log_path(&self) -> Option<&str> {
        Some(self.log_file.trim()).filter(|p| !p.is_empty())
    }
}

/// `config/plotter.*` if present, overridden by `PLOTTER__*` environment variables.
pub fn load_plotter_config() -> anyhow::Result<PlotterConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/plotter").required(false))
        .add_source(
            config::Environment::with_prefix("PLOTTER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: PlotterConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
