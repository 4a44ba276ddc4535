// Presentation layer - HTTP surface over the latest rendered frame
pub mod app_state;
pub mod handlers;
