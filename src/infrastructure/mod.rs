// Infrastructure layer - External dependencies and adapters
pub mod append_log;
pub mod config;
pub mod frame_publisher;
pub mod frame_view;
pub mod line_source;
