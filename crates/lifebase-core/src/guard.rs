//! Connection guard for automatic disconnect on drop.
//!
//! The pipeline's resource-safety contract is that no code path may leak an
//! open connection. [`SessionGuard`] provides RAII-style management: when
//! the guard goes out of scope, normally or during unwinding, it disconnects
//! the session.

use std::ops::Deref;

use tokio::runtime::Handle;
use tracing::warn;

use crate::session::DeviceSession;
use crate::traits::GattSession;

/// A guard that closes its [`DeviceSession`] when dropped.
///
/// # Example
///
/// ```ignore
/// use lifebase_core::{DeviceSession, SessionConfig, SessionGuard};
///
/// async fn walk_one(address: &str) -> Result<(), Box<dyn std::error::Error>> {
///     let session = DeviceSession::open(address, SessionConfig::default()).await?;
///     let guard = SessionGuard::new(session);
///
///     // Use the session through the guard; it is disconnected on every
///     // exit path, including errors and panics.
///     let _services = guard.services();
///     Ok(())
/// }
/// ```
pub struct SessionGuard {
    session: Option<DeviceSession>,
}

impl SessionGuard {
    /// Create a new session guard.
    pub fn new(session: DeviceSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Take ownership of the session, preventing automatic disconnect.
    ///
    /// After calling this, you are responsible for closing the session.
    pub fn into_inner(mut self) -> DeviceSession {
        self.session.take().expect("session already taken")
    }

    /// Get a reference to the session.
    pub fn session(&self) -> &DeviceSession {
        self.session.as_ref().expect("session already taken")
    }

    /// Close the session now and disarm the guard.
    ///
    /// Prefer this over dropping when you want the disconnect error surfaced.
    pub async fn close(mut self) -> crate::error::Result<()> {
        let session = self.session.take().expect("session already taken");
        session.close().await
    }
}

impl Deref for SessionGuard {
    type Target = DeviceSession;

    fn deref(&self) -> &Self::Target {
        self.session()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("Failed to disconnect session in guard drop: {}", e);
                    }
                });
            } else {
                warn!("No tokio runtime available for session disconnect in guard drop");
            }
        }
    }
}
