//! Process workflow engine.
//!
//! Maps a workflow plus a typed action to a backend tool call or a
//! navigation intent, and models what the console shows for each
//! business object: its blocking reason, next action, owner, priority,
//! and step timeline. All workflow state lives in the backend views; this
//! layer only reads decision records and dispatches actions.

pub mod action;
pub mod decision;
pub mod dispatcher;
pub mod labels;
pub mod payload;
pub mod queue;
pub mod timeline;
pub mod workspace;

pub use action::{
    CommissionAction, InvoiceAction, PaymentAction, ProcessAction, RenewalAction, SigningAction,
    TerminationAction,
};
pub use decision::{
    ActionObserver, CustomAction, DecisionController, DecisionRecord, Owner, Priority,
};
pub use dispatcher::{
    ActionDispatcher, ActionOutcome, ActionResult, DispatchError, NavigationIntent,
};
pub use payload::{Step, ToolCall};
pub use queue::{DashboardStats, KanbanBoard, KanbanColumn, QueueFilter, QueueItem, QueueService};
pub use timeline::{StepStatus, TimelineStep};
pub use workspace::{WorkspaceLoader, WorkspaceState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of tracked business workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKey {
    Renewal,
    Payment,
    Invoice,
    Termination,
    Commission,
    Signing,
}

impl ProcessKey {
    pub fn all() -> &'static [ProcessKey] {
        &[
            ProcessKey::Renewal,
            ProcessKey::Payment,
            ProcessKey::Invoice,
            ProcessKey::Termination,
            ProcessKey::Commission,
            ProcessKey::Signing,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKey::Renewal => "renewal",
            ProcessKey::Payment => "payment",
            ProcessKey::Invoice => "invoice",
            ProcessKey::Termination => "termination",
            ProcessKey::Commission => "commission",
            ProcessKey::Signing => "signing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessKey::Renewal => "續約",
            ProcessKey::Payment => "收款",
            ProcessKey::Invoice => "發票",
            ProcessKey::Termination => "解約",
            ProcessKey::Commission => "佣金",
            ProcessKey::Signing => "簽約",
        }
    }

    /// Backend queue view for this workflow
    pub fn queue_view(&self) -> String {
        format!("v_{}_queue", self.as_str())
    }

    /// Column holding the entity id in the queue view
    pub fn id_column(&self) -> &'static str {
        match self {
            ProcessKey::Renewal | ProcessKey::Signing => "contract_id",
            ProcessKey::Payment | ProcessKey::Invoice => "payment_id",
            ProcessKey::Termination => "case_id",
            ProcessKey::Commission => "commission_id",
        }
    }

    /// Column used as the due-date tiebreak
    pub fn due_column(&self) -> &'static str {
        match self {
            ProcessKey::Renewal => "end_date",
            ProcessKey::Payment | ProcessKey::Invoice => "due_date",
            ProcessKey::Termination => "move_out_date",
            ProcessKey::Commission => "eligible_date",
            ProcessKey::Signing => "start_date",
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessKey::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown process '{}'", s))
    }
}

/// Board presentation: one column per workflow, or a single flat table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardLayout {
    #[default]
    Kanban,
    List,
}

impl BoardLayout {
    pub fn toggle(self) -> Self {
        match self {
            BoardLayout::Kanban => BoardLayout::List,
            BoardLayout::List => BoardLayout::Kanban,
        }
    }
}
