// powerdeck-core: Device power orchestration engine between powerdeck-api and consumers (CLI).

pub mod backend;
pub mod cancel;
pub mod config;
pub mod device;
pub mod error;
pub mod facade;
pub mod model;
pub mod orchestrator;
pub mod reconciler;
pub mod scheduler;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::HttpBackend;
pub use cancel::{GenerationCounter, WorkflowToken};
pub use config::{EngineConfig, ScheduledDevice, TlsVerification};
pub use device::{
    Clock, CommandAck, ConnectivityReport, DeviceControl, PowerCommand, ScheduleStore, SystemClock,
};
pub use error::CoreError;
pub use facade::{Engine, RemainingTime, Selection, SelectionOutcome};
pub use orchestrator::ConnectionOrchestrator;
pub use reconciler::{classify, StatusVerdict};
pub use scheduler::{PowerScheduler, Tick};

pub use model::{
    ConnectionOption, ConnectionPhase, DeviceStatusReport, OptionCatalog, PhaseSnapshot,
    ScheduleSelection, ScheduleSnapshot, SchedulePhase, ScheduledShutdown,
};
