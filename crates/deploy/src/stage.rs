//! Explicit stage machine of a deploy pass.
//!
//! ```text
//! Start ─┬─> Upload ─────┬─> ApplyConfig ─> AwaitReady ─> ReconcileTriggers ─> Commit ─> Done
//!        └─> SkipUpload ─┘
//! ```

use std::fmt;

/// One stage of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    Upload,
    SkipUpload,
    ApplyConfig,
    AwaitReady,
    ReconcileTriggers,
    Commit,
    Done,
}

/// Every legal `(from, to)` edge.
pub const TRANSITIONS: &[(Stage, Stage)] = &[
    (Stage::Start, Stage::Upload),
    (Stage::Start, Stage::SkipUpload),
    (Stage::Upload, Stage::ApplyConfig),
    (Stage::SkipUpload, Stage::ApplyConfig),
    (Stage::ApplyConfig, Stage::AwaitReady),
    (Stage::AwaitReady, Stage::ReconcileTriggers),
    (Stage::ReconcileTriggers, Stage::Commit),
    (Stage::Commit, Stage::Done),
];

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Start,
        Stage::Upload,
        Stage::SkipUpload,
        Stage::ApplyConfig,
        Stage::AwaitReady,
        Stage::ReconcileTriggers,
        Stage::Commit,
        Stage::Done,
    ];

    /// Stages reachable in one step from `self`.
    pub fn successors(self) -> impl Iterator<Item = Stage> {
        TRANSITIONS
            .iter()
            .filter(move |(from, _)| *from == self)
            .map(|(_, to)| *to)
    }

    pub fn can_transition(self, to: Stage) -> bool {
        TRANSITIONS.contains(&(self, to))
    }

    pub fn is_terminal(self) -> bool {
        self.successors().next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Upload => "upload",
            Stage::SkipUpload => "skip_upload",
            Stage::ApplyConfig => "apply_config",
            Stage::AwaitReady => "await_ready",
            Stage::ReconcileTriggers => "reconcile_triggers",
            Stage::Commit => "commit",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
