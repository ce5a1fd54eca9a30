// powerdeck-api: Async Rust client for the power dashboard server

pub mod client;
pub mod error;
pub mod internet;
pub mod models;
pub mod plex;
pub mod transport;

pub use client::DashboardClient;
pub use error::Error;
pub use models::{
    CommandResponse, DeleteResponse, PowerAction, PowerRequest, ScheduleResponse, TestResponse,
    WifiConfigOutcome, WifiConfigRequest, WifiConfigResponse,
};
pub use transport::{TlsMode, TransportConfig};
