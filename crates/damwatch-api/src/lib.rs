// damwatch-api: Async Rust client for the dam telemetry and valve-control backend

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::DamClient;
pub use error::{Error, FetchFailure};
pub use models::{
    ControlAck, Reading, ValveCommand, ValveControl, ValveMode, ValveState, ValveStatus,
    VibrationLog, WaterLevelLog, Weather,
};
pub use transport::{TlsMode, TransportConfig};
