// Domain layer - Plain data types shared by every other layer
pub mod error;
pub mod layout;
pub mod telemetry;
