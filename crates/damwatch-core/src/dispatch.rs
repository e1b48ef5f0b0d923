// ── Valve command dispatch ──
//
// Admin-gated side channel to the actuator. Nothing local changes on
// dispatch; the valve's new state shows up on a later poll.

use std::sync::Arc;

use tracing::{info, warn};

use damwatch_api::{ControlAck, DamClient, ValveCommand, ValveControl, ValveMode};

use crate::error::CoreError;
use crate::session::SessionGate;

pub struct CommandDispatcher {
    client: DamClient,
    session: Arc<SessionGate>,
}

impl CommandDispatcher {
    pub fn new(client: DamClient, session: Arc<SessionGate>) -> Self {
        Self { client, session }
    }

    /// Send `{mode, command}` to the valve controller.
    ///
    /// Fails with `Unauthorized` before any network I/O unless an admin
    /// session is active. A `success: false` acknowledgement is a
    /// `Dispatch` error. Never retried.
    pub async fn dispatch(
        &self,
        mode: ValveMode,
        command: ValveCommand,
    ) -> Result<ControlAck, CoreError> {
        let Some(session) = self.session.current_session().filter(|s| s.is_admin()) else {
            warn!(%mode, %command, "valve command refused: no admin session");
            return Err(CoreError::Unauthorized {
                operation: "valve control".into(),
            });
        };

        info!(operator = %session.name, %mode, %command, "dispatching valve command");
        let ack = self
            .client
            .control_valve(&ValveControl { mode, command })
            .await
            .map_err(|e| CoreError::Dispatch {
                message: e.to_string(),
            })?;

        if !ack.success {
            warn!(%mode, %command, "valve controller rejected command");
            return Err(CoreError::Dispatch {
                message: "valve controller rejected the command".into(),
            });
        }
        Ok(ack)
    }
}
