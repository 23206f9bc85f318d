//! Typed actions per workflow.
//!
//! Each workflow has its own action enum; [`ProcessAction`] is the sum over
//! them, so every `(process, action)` pair that exists is a value and every
//! mapping from action to backend step is an exhaustive match.

use serde::Serialize;
use std::fmt;

use super::ProcessKey;

macro_rules! action_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// Symbolic action code as stored in `action_key`
            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Button label
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                Self::all().iter().copied().find(|a| a.code() == code)
            }
        }
    };
}

action_enum! {
    /// Contract renewal actions
    RenewalAction {
        CreateDraft => ("CREATE_DRAFT", "建立續約草稿"),
        SendNotice => ("SEND_NOTICE", "標記已通知客戶"),
        ConfirmIntent => ("CONFIRM_INTENT", "確認續約意願"),
        SendForSigning => ("SEND_FOR_SIGNING", "送出續約簽署"),
        Activate => ("ACTIVATE", "啟用新合約"),
    }
}

action_enum! {
    /// Payment collection actions
    PaymentAction {
        RecordPayment => ("RECORD_PAYMENT", "登記收款"),
        SendReminder => ("SEND_REMINDER", "發送催繳通知"),
        WaivePayment => ("WAIVE_PAYMENT", "免收此筆款項"),
    }
}

action_enum! {
    /// Invoicing actions
    InvoiceAction {
        CreateInvoice => ("CREATE_INVOICE", "開立發票"),
        FillTaxId => ("FILL_TAX_ID", "補填統一編號"),
        VoidInvoice => ("VOID_INVOICE", "作廢發票"),
    }
}

action_enum! {
    /// Termination case actions
    TerminationAction {
        ConfirmNotice => ("CONFIRM_NOTICE", "確認解約通知"),
        ScheduleMoveOut => ("SCHEDULE_MOVE_OUT", "安排搬遷"),
        CompleteInspection => ("COMPLETE_INSPECTION", "完成點交"),
        SettleDeposit => ("SETTLE_DEPOSIT", "結算押金"),
        CloseCase => ("CLOSE_CASE", "結案"),
        UpdateStatus => ("UPDATE_STATUS", "更新狀態"),
    }
}

action_enum! {
    /// Commission payout actions
    CommissionAction {
        Approve => ("APPROVE", "核准佣金"),
        PayCommission => ("PAY_COMMISSION", "發放佣金"),
        Cancel => ("CANCEL", "取消佣金"),
    }
}

action_enum! {
    /// Contract signing actions
    SigningAction {
        SendForSigning => ("SEND_FOR_SIGNING", "送出簽署"),
        MarkSigned => ("MARK_SIGNED", "標記已簽署"),
        ReviewContract => ("REVIEW_CONTRACT", "前往審閱合約"),
    }
}

/// One action of one workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessAction {
    Renewal(RenewalAction),
    Payment(PaymentAction),
    Invoice(InvoiceAction),
    Termination(TerminationAction),
    Commission(CommissionAction),
    Signing(SigningAction),
}

impl ProcessAction {
    /// Resolve a string pair; `None` means the action is not defined
    pub fn parse(process: &str, action: &str) -> Option<Self> {
        let process: ProcessKey = process.parse().ok()?;
        Self::for_key(process, action)
    }

    /// Resolve an action code within a known workflow
    pub fn for_key(process: ProcessKey, action: &str) -> Option<Self> {
        match process {
            ProcessKey::Renewal => RenewalAction::from_code(action).map(ProcessAction::Renewal),
            ProcessKey::Payment => PaymentAction::from_code(action).map(ProcessAction::Payment),
            ProcessKey::Invoice => InvoiceAction::from_code(action).map(ProcessAction::Invoice),
            ProcessKey::Termination => {
                TerminationAction::from_code(action).map(ProcessAction::Termination)
            }
            ProcessKey::Commission => {
                CommissionAction::from_code(action).map(ProcessAction::Commission)
            }
            ProcessKey::Signing => SigningAction::from_code(action).map(ProcessAction::Signing),
        }
    }

    /// Whether a `(process, action)` pair is defined
    pub fn has_action(process: &str, action: &str) -> bool {
        Self::parse(process, action).is_some()
    }

    /// Every action of one workflow, in display order
    pub fn for_process(process: ProcessKey) -> Vec<ProcessAction> {
        match process {
            ProcessKey::Renewal => RenewalAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Renewal)
                .collect(),
            ProcessKey::Payment => PaymentAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Payment)
                .collect(),
            ProcessKey::Invoice => InvoiceAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Invoice)
                .collect(),
            ProcessKey::Termination => TerminationAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Termination)
                .collect(),
            ProcessKey::Commission => CommissionAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Commission)
                .collect(),
            ProcessKey::Signing => SigningAction::all()
                .iter()
                .copied()
                .map(ProcessAction::Signing)
                .collect(),
        }
    }

    /// The action-availability map: every defined action of every workflow
    pub fn all() -> Vec<ProcessAction> {
        ProcessKey::all()
            .iter()
            .flat_map(|p| Self::for_process(*p))
            .collect()
    }

    pub fn process(&self) -> ProcessKey {
        match self {
            ProcessAction::Renewal(_) => ProcessKey::Renewal,
            ProcessAction::Payment(_) => ProcessKey::Payment,
            ProcessAction::Invoice(_) => ProcessKey::Invoice,
            ProcessAction::Termination(_) => ProcessKey::Termination,
            ProcessAction::Commission(_) => ProcessKey::Commission,
            ProcessAction::Signing(_) => ProcessKey::Signing,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ProcessAction::Renewal(a) => a.code(),
            ProcessAction::Payment(a) => a.code(),
            ProcessAction::Invoice(a) => a.code(),
            ProcessAction::Termination(a) => a.code(),
            ProcessAction::Commission(a) => a.code(),
            ProcessAction::Signing(a) => a.code(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessAction::Renewal(a) => a.label(),
            ProcessAction::Payment(a) => a.label(),
            ProcessAction::Invoice(a) => a.label(),
            ProcessAction::Termination(a) => a.label(),
            ProcessAction::Commission(a) => a.label(),
            ProcessAction::Signing(a) => a.label(),
        }
    }
}

impl fmt::Display for ProcessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.process(), self.code())
    }
}

impl Serialize for ProcessAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ProcessAction", 3)?;
        s.serialize_field("process", &self.process())?;
        s.serialize_field("action", self.code())?;
        s.serialize_field("label", self.label())?;
        s.end()
    }
}
