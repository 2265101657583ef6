//! Tempoflow Browser - Provisioning and CDP Surface
//!
//! The profile-provisioning collaborator: a REST client for the local
//! browser-farm API (open/close/query a remote profile by serial number) and
//! the chromiumoxide-backed automation surface the core drives pages through.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
mod js;
pub mod surface;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tempoflow_core::{
    AutomationSurface, BrowserSession, Result as CoreResult, SessionProvisioner, SessionState,
};
use tokio::sync::Mutex;
use tracing::info;

pub use client::{FarmClient, FarmConfig, FarmProfile, StartedBrowser};
pub use error::{Error, Result};
pub use surface::{CdpPage, CdpSurface};

/// [`SessionProvisioner`] backed by the browser farm plus CDP.
pub struct FarmProvisioner {
    client: FarmClient,
    // serial -> farm user id, filled on first lookup so the release path
    // does not depend on another list request succeeding
    user_ids: Mutex<HashMap<u32, String>>,
}

impl FarmProvisioner {
    /// Provisioner over the given farm settings.
    pub fn new(config: FarmConfig) -> Result<Self> {
        Ok(Self {
            client: FarmClient::new(config)?,
            user_ids: Mutex::new(HashMap::new()),
        })
    }

    async fn user_id_for(&self, serial_number: u32) -> Result<String> {
        if let Some(user_id) = self.user_ids.lock().await.get(&serial_number) {
            return Ok(user_id.clone());
        }
        let profile = self.client.profile_by_serial(serial_number).await?;
        self.user_ids
            .lock()
            .await
            .insert(serial_number, profile.user_id.clone());
        Ok(profile.user_id)
    }
}

#[async_trait]
impl SessionProvisioner for FarmProvisioner {
    async fn check_connection(&self) -> CoreResult<()> {
        self.client.check_connection().await.map_err(Into::into)
    }

    async fn open_session(&self, serial_number: u32) -> CoreResult<Box<dyn BrowserSession>> {
        let user_id = self.user_id_for(serial_number).await?;
        info!(serial = serial_number, user_id = %user_id, "opening browser session");

        let started = self.client.start_browser(&user_id).await?;
        tokio::time::sleep(self.client.launch_settle()).await;

        if self.client.browser_status(&user_id).await? != SessionState::Active {
            return Err(tempoflow_core::Error::Provisioning(format!(
                "browser for profile {serial_number} did not come up"
            )));
        }

        let surface = CdpSurface::connect(&started.ws_endpoint).await?;
        Ok(Box::new(FarmSession {
            surface: Arc::new(surface),
        }))
    }

    async fn query_session_status(&self, serial_number: u32) -> CoreResult<SessionState> {
        let user_id = self.user_id_for(serial_number).await?;
        self.client.browser_status(&user_id).await.map_err(Into::into)
    }

    async fn close_session(&self, serial_number: u32) -> CoreResult<()> {
        let user_id = self.user_id_for(serial_number).await?;
        self.client.stop_browser(&user_id).await.map_err(Into::into)
    }
}

/// A live farm-hosted browser session.
pub struct FarmSession {
    surface: Arc<CdpSurface>,
}

#[async_trait]
impl BrowserSession for FarmSession {
    fn surface(&self) -> Arc<dyn AutomationSurface> {
        self.surface.clone()
    }

    async fn shutdown(&self) -> CoreResult<()> {
        self.surface.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_id_cache_survives_for_release_path() {
        let provisioner = FarmProvisioner::new(FarmConfig::default()).unwrap();
        provisioner
            .user_ids
            .lock()
            .await
            .insert(17, "cached-id".to_string());

        let user_id = provisioner.user_id_for(17).await.unwrap();
        assert_eq!(user_id, "cached-id");
    }
}
