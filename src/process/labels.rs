//! Presentation lookups for blocked reasons and action codes.
//!
//! These are display tables only. Codes missing from them fall back to the
//! raw code so a new backend value never breaks rendering.

use std::borrow::Cow;

use super::action::ProcessAction;
use super::ProcessKey;

/// Why a workflow cannot advance, and which action unblocks it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedReason {
    pub code: &'static str,
    pub label: &'static str,
    /// Action code that resolves it, if a console user can act on it
    pub action: Option<&'static str>,
}

const fn reason(
    code: &'static str,
    label: &'static str,
    action: Option<&'static str>,
) -> BlockedReason {
    BlockedReason {
        code,
        label,
        action,
    }
}

/// Marker for a finished workflow
pub const COMPLETED: &str = "completed";

const RENEWAL: &[BlockedReason] = &[
    reason("need_draft", "尚未建立續約草稿", Some("CREATE_DRAFT")),
    reason("need_notice", "尚未通知客戶續約", Some("SEND_NOTICE")),
    reason(
        "awaiting_confirmation",
        "等待客戶確認續約意願",
        Some("CONFIRM_INTENT"),
    ),
    reason("need_signing", "續約合約待送簽", Some("SEND_FOR_SIGNING")),
    reason("awaiting_signature", "等待客戶簽署", None),
    reason("need_activation", "新合約待啟用", Some("ACTIVATE")),
];

const PAYMENT: &[BlockedReason] = &[
    reason("unpaid", "尚未收款", Some("RECORD_PAYMENT")),
    reason("partial", "部分收款", Some("RECORD_PAYMENT")),
    reason("overdue", "逾期未繳", Some("SEND_REMINDER")),
    reason("disputed", "客戶爭議中", None),
];

const INVOICE: &[BlockedReason] = &[
    reason("need_invoice", "待開立發票", Some("CREATE_INVOICE")),
    reason("missing_tax_id", "缺少統一編號", Some("FILL_TAX_ID")),
    reason("invoice_error", "發票資料異常", Some("VOID_INVOICE")),
];

const TERMINATION: &[BlockedReason] = &[
    reason("notice_pending", "待確認解約通知", Some("CONFIRM_NOTICE")),
    reason("move_out_pending", "待安排搬遷", Some("SCHEDULE_MOVE_OUT")),
    reason("inspection_pending", "待點交", Some("COMPLETE_INSPECTION")),
    reason("deposit_pending", "待結算押金", Some("SETTLE_DEPOSIT")),
    reason("ready_to_close", "待結案", Some("CLOSE_CASE")),
];

const COMMISSION: &[BlockedReason] = &[
    reason("not_eligible", "尚未符合發放條件", None),
    reason("pending_approval", "待核准", Some("APPROVE")),
    reason("ready_to_pay", "待發放", Some("PAY_COMMISSION")),
];

const SIGNING: &[BlockedReason] = &[
    reason("contract_review", "待審閱合約", Some("REVIEW_CONTRACT")),
    reason("not_sent", "合約尚未送簽", Some("SEND_FOR_SIGNING")),
    reason("awaiting_signature", "等待簽署", Some("MARK_SIGNED")),
];

/// All known blocked reasons of a workflow
pub fn blocked_reasons(process: ProcessKey) -> &'static [BlockedReason] {
    match process {
        ProcessKey::Renewal => RENEWAL,
        ProcessKey::Payment => PAYMENT,
        ProcessKey::Invoice => INVOICE,
        ProcessKey::Termination => TERMINATION,
        ProcessKey::Commission => COMMISSION,
        ProcessKey::Signing => SIGNING,
    }
}

pub fn find_reason(process: ProcessKey, code: &str) -> Option<&'static BlockedReason> {
    blocked_reasons(process).iter().find(|r| r.code == code)
}

/// Human label of a blocked reason, or the raw code when unmapped
pub fn blocked_label(process: ProcessKey, code: &str) -> Cow<'static, str> {
    if code == COMPLETED {
        return Cow::Borrowed("已完成");
    }
    match find_reason(process, code) {
        Some(r) => Cow::Borrowed(r.label),
        None => Cow::Owned(code.to_string()),
    }
}

/// Button label for an action code, or the raw code when unmapped
pub fn action_label(process: ProcessKey, code: &str) -> Cow<'static, str> {
    match ProcessAction::for_key(process, code) {
        Some(action) => Cow::Borrowed(action.label()),
        None => Cow::Owned(code.to_string()),
    }
}

/// Action suggested by the reason table when a record carries no `action_key`
pub fn suggested_action(process: ProcessKey, code: &str) -> Option<ProcessAction> {
    find_reason(process, code)
        .and_then(|r| r.action)
        .and_then(|a| ProcessAction::for_key(process, a))
}
