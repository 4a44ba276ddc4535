// Application layer - Use cases and the ports they depend on
pub mod axis_layout;
pub mod ingest_service;
pub mod line_parser;
pub mod ports;
pub mod render_cadence;
pub mod telemetry_store;
