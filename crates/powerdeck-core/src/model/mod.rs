// Domain types shared by the orchestrator, scheduler and display layer.

pub mod option;
pub mod phase;
pub mod schedule;
pub mod status;

pub use option::{ConnectionOption, OptionCatalog};
pub use phase::{ConnectionPhase, PhaseSnapshot};
pub use schedule::{ScheduleSelection, ScheduleSnapshot, SchedulePhase, ScheduledShutdown};
pub use status::DeviceStatusReport;
