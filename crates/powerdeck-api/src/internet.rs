// Internet-source endpoints
//
// Relay switching for the connectivity sources, the post-switch
// connectivity probe, and the WiFi credential pass-through.

use tracing::debug;

use crate::client::DashboardClient;
use crate::error::Error;
use crate::models::{
    CommandResponse, PowerRequest, TestRequest, TestResponse, WifiConfigRequest,
    WifiConfigResponse,
};

impl DashboardClient {
    /// Switch a relay port on or off.
    ///
    /// `POST /api/internet/power`
    pub async fn power(&self, request: &PowerRequest) -> Result<CommandResponse, Error> {
        let url = self.api_url("api/internet/power")?;
        debug!(
            port = request.port,
            action = ?request.action,
            auxiliary_port = ?request.auxiliary_port,
            "sending power command"
        );
        self.post(url, request).await
    }

    /// Probe internet reachability through the given connection type.
    ///
    /// `POST /api/internet/test`
    pub async fn connectivity_test(&self, connection_type: &str) -> Result<TestResponse, Error> {
        let url = self.api_url("api/internet/test")?;
        debug!(connection_type, "running connectivity test");
        self.post(
            url,
            &TestRequest {
                connection_type: connection_type.to_owned(),
            },
        )
        .await
    }

    /// Push WiFi credentials to the uplink radio.
    ///
    /// `POST /api/wifi-config`
    pub async fn configure_wifi(
        &self,
        request: &WifiConfigRequest,
    ) -> Result<WifiConfigResponse, Error> {
        let url = self.api_url("api/wifi-config")?;
        debug!(ssid = %request.ssid, permanent = request.permanent, "sending WiFi configuration");
        self.post(url, request).await
    }
}
