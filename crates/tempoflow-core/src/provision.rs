//! Session provisioning capability
//!
//! The engine does not know how browser profiles are hosted. It consumes an
//! injected [`SessionProvisioner`] that can open a remote profile by serial
//! number and hand back a live [`BrowserSession`]. The concrete farm client
//! lives in the browser collaborator crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::surface::AutomationSurface;

/// Reported state of a remote browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Remote browser is running
    Active,
    /// Remote browser is stopped
    Inactive,
}

/// Opens, queries, and closes remote browser sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionProvisioner: Send + Sync {
    /// Verify the provisioning service is reachable at all.
    ///
    /// Called once before the batch; failure aborts every profile.
    async fn check_connection(&self) -> Result<()>;

    /// Open the profile's browser and connect an automation surface to it.
    async fn open_session(&self, serial_number: u32) -> Result<Box<dyn BrowserSession>>;

    /// Ask the service whether the profile's browser is currently running.
    async fn query_session_status(&self, serial_number: u32) -> Result<SessionState>;

    /// Request the service to stop the profile's browser.
    ///
    /// Idempotent; stopping an already-stopped session is not an error.
    async fn close_session(&self, serial_number: u32) -> Result<()>;
}

/// A live, exclusively-owned browser session.
///
/// Exactly one orchestrator invocation owns a session; that invocation is
/// solely responsible for calling [`BrowserSession::shutdown`] on every exit
/// path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// The automation surface for driving this session's pages.
    fn surface(&self) -> Arc<dyn AutomationSurface>;

    /// Release the automation connection to the browser.
    ///
    /// Stopping the remote browser itself is the provisioner's
    /// [`SessionProvisioner::close_session`], called separately.
    async fn shutdown(&self) -> Result<()>;
}
