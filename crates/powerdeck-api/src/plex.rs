// Scheduled-device endpoints
//
// Status text and the persisted auto-shutoff timestamp for the media
// server. The server is the source of truth for the schedule.

use tracing::debug;

use crate::client::DashboardClient;
use crate::error::Error;
use crate::models::{CommandResponse, DeleteResponse, ScheduleRequest, ScheduleResponse};

impl DashboardClient {
    /// Fetch the device's free-text status line.
    ///
    /// `GET /api/plex/status`
    pub async fn device_status(&self) -> Result<CommandResponse, Error> {
        let url = self.api_url("api/plex/status")?;
        debug!("fetching device status");
        self.get(url).await
    }

    /// Read the persisted shutoff schedule.
    ///
    /// `GET /api/plex/schedule`
    pub async fn get_schedule(&self) -> Result<ScheduleResponse, Error> {
        let url = self.api_url("api/plex/schedule")?;
        debug!("fetching shutdown schedule");
        self.get(url).await
    }

    /// Persist a shutoff `hours` from now; the reply carries the absolute
    /// target the server stored.
    ///
    /// `POST /api/plex/schedule`
    pub async fn set_schedule(&self, hours: f64) -> Result<ScheduleResponse, Error> {
        let url = self.api_url("api/plex/schedule")?;
        debug!(hours, "persisting shutdown schedule");
        self.post(url, &ScheduleRequest { hours }).await
    }

    /// Remove the persisted schedule. Succeeds when none exists.
    ///
    /// `DELETE /api/plex/schedule`
    pub async fn delete_schedule(&self) -> Result<DeleteResponse, Error> {
        let url = self.api_url("api/plex/schedule")?;
        debug!("deleting shutdown schedule");
        self.delete(url).await
    }
}
