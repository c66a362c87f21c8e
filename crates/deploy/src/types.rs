//! Data types for reconciliation passes.

use std::fmt;

use scfdeploy_protocol::{FunctionIdentity, GatewaySummary, TriggerKey};
use scfdeploy_transfer::UploadProgress;
use tokio::sync::mpsc;

use crate::stage::Stage;

/// Operation issued against a native trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerAction {
    Create,
    Update,
    Delete,
}

impl TriggerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerAction::Create => "create",
            TriggerAction::Update => "update",
            TriggerAction::Delete => "delete",
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observation event emitted while a pass runs. Purely advisory.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    StageEntered {
        function: String,
        stage: Stage,
    },
    UploadProgress {
        function: String,
        progress: UploadProgress,
    },
    /// The previously deployed function under another name was removed.
    StaleFunctionRemoved {
        identity: FunctionIdentity,
    },
    /// Removing the previously deployed function failed; the pass goes on.
    StaleFunctionCleanupFailed {
        identity: FunctionIdentity,
        error: String,
    },
    GatewayProvisioned {
        service_name: String,
        endpoints: Vec<GatewaySummary>,
    },
    TriggerApplied {
        trigger: TriggerKey,
        action: TriggerAction,
    },
    TriggerFailed {
        trigger: TriggerKey,
        action: TriggerAction,
        error: String,
    },
    /// A function was torn down by a removal pass.
    Removed {
        identity: FunctionIdentity,
    },
    Completed {
        function: String,
    },
    Failed {
        function: String,
        stage: Option<Stage>,
        error: String,
    },
}

/// Non-blocking sender for [`DeployEvent`]s.
///
/// Events are dropped when nobody took the receiver or it lags, so a pass
/// never waits on an observer.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<DeployEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<DeployEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: DeployEvent) {
        let _ = self.tx.try_send(event);
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<DeployEvent> {
        self.tx.clone()
    }
}
