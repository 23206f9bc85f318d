//! Action payloads and the step each action resolves to.
//!
//! Callers hand in a loose JSON object; every action deserializes it into
//! its own struct with defaulted optional fields, validates it, and yields
//! either a tool call or a navigation intent. Nothing here talks to the
//! backend.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::action::{
    CommissionAction, InvoiceAction, PaymentAction, ProcessAction, RenewalAction, SigningAction,
    TerminationAction,
};

/// A resolved backend tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: &'static str,
    pub params: Value,
}

/// The caller should open another page instead of calling the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationIntent {
    /// Console-relative path, e.g. `/customers/12?focus=tax_id`
    pub url: String,
    /// Why the user is sent there
    pub reason: String,
}

/// What executing an action amounts to
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Tool(ToolCall),
    Navigate(NavigationIntent),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
    CreditCard,
    LinePay,
    Check,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::LinePay => "line_pay",
            PaymentMethod::Check => "check",
        }
    }

    pub fn all() -> &'static [PaymentMethod] {
        &[
            PaymentMethod::BankTransfer,
            PaymentMethod::Cash,
            PaymentMethod::CreditCard,
            PaymentMethod::LinePay,
            PaymentMethod::Check,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    #[default]
    Personal,
    Company,
}

fn default_true() -> bool {
    true
}

fn default_bank_transfer() -> PaymentMethod {
    PaymentMethod::BankTransfer
}

#[derive(Debug, Deserialize)]
struct ForcePayload {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct FlagPayload {
    #[serde(default = "default_true")]
    value: bool,
}

#[derive(Debug, Deserialize)]
struct RecordPaymentPayload {
    payment_method: PaymentMethod,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
struct ReasonPayload {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct CreateInvoicePayload {
    #[serde(default)]
    invoice_type: InvoiceType,
    #[serde(default)]
    buyer_name: Option<String>,
    #[serde(default)]
    buyer_tax_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaxIdPayload {
    #[serde(default)]
    customer_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SettleDepositPayload {
    #[serde(default)]
    deduction_amount: i64,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct PayCommissionPayload {
    #[serde(default = "default_bank_transfer")]
    payment_method: PaymentMethod,
    #[serde(default)]
    payment_reference: String,
    #[serde(default)]
    paid_at: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct SignedPayload {
    #[serde(default)]
    signed_at: Option<NaiveDate>,
}

fn parse<T: for<'de> Deserialize<'de>>(payload: &Value) -> Result<T, PayloadError> {
    let object = match payload {
        Value::Null => Value::Object(serde_json::Map::new()),
        Value::Object(_) => payload.clone(),
        _ => return Err(PayloadError::NotAnObject),
    };
    serde_json::from_value(object).map_err(|e| PayloadError::Invalid(e.to_string()))
}

fn required_text(value: String, field: &str) -> Result<String, PayloadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Invalid(format!("missing field `{}`", field)));
    }
    Ok(trimmed.to_string())
}

/// Taiwanese unified business number: exactly eight digits
fn valid_tax_id(tax_id: &str) -> bool {
    tax_id.len() == 8 && tax_id.chars().all(|c| c.is_ascii_digit())
}

fn tool(tool: &'static str, params: Value) -> Step {
    Step::Tool(ToolCall { tool, params })
}

fn termination_status(case_id: i64, status: &str) -> Step {
    tool(
        "termination_update_status_v2",
        json!({"case_id": case_id, "status": status}),
    )
}

impl ProcessAction {
    /// Resolve the step for this action using today's local date for defaults
    pub fn plan(&self, entity_id: i64, payload: &Value) -> Result<Step, PayloadError> {
        self.plan_on(entity_id, payload, Local::now().date_naive())
    }

    /// Resolve the step for this action with an explicit "today"
    pub fn plan_on(
        &self,
        entity_id: i64,
        payload: &Value,
        today: NaiveDate,
    ) -> Result<Step, PayloadError> {
        if !matches!(payload, Value::Null | Value::Object(_)) {
            return Err(PayloadError::NotAnObject);
        }
        match self {
            ProcessAction::Renewal(action) => plan_renewal(*action, entity_id, payload),
            ProcessAction::Payment(action) => plan_payment(*action, entity_id, payload),
            ProcessAction::Invoice(action) => plan_invoice(*action, entity_id, payload),
            ProcessAction::Termination(action) => plan_termination(*action, entity_id, payload),
            ProcessAction::Commission(action) => {
                plan_commission(*action, entity_id, payload, today)
            }
            ProcessAction::Signing(action) => plan_signing(*action, entity_id, payload, today),
        }
    }
}

fn plan_renewal(
    action: RenewalAction,
    contract_id: i64,
    payload: &Value,
) -> Result<Step, PayloadError> {
    let step = match action {
        RenewalAction::CreateDraft => {
            let p: ForcePayload = parse(payload)?;
            tool(
                "renewal_create_draft",
                json!({"contract_id": contract_id, "force": p.force}),
            )
        }
        RenewalAction::SendNotice => {
            let p: FlagPayload = parse(payload)?;
            tool(
                "renewal_set_flag",
                json!({"contract_id": contract_id, "flag": "notified", "value": p.value}),
            )
        }
        RenewalAction::ConfirmIntent => {
            let p: FlagPayload = parse(payload)?;
            tool(
                "renewal_set_flag",
                json!({"contract_id": contract_id, "flag": "confirmed", "value": p.value}),
            )
        }
        RenewalAction::SendForSigning => tool(
            "renewal_send_for_signing",
            json!({"contract_id": contract_id}),
        ),
        RenewalAction::Activate => tool("renewal_activate", json!({"contract_id": contract_id})),
    };
    Ok(step)
}

fn plan_payment(
    action: PaymentAction,
    payment_id: i64,
    payload: &Value,
) -> Result<Step, PayloadError> {
    let step = match action {
        PaymentAction::RecordPayment => {
            let p: RecordPaymentPayload = parse(payload)?;
            tool(
                "crm_record_payment",
                json!({
                    "payment_id": payment_id,
                    "payment_method": p.payment_method.as_str(),
                    "notes": p.notes,
                }),
            )
        }
        PaymentAction::SendReminder => tool(
            "crm_send_payment_reminder",
            json!({"payment_id": payment_id}),
        ),
        PaymentAction::WaivePayment => {
            let p: ReasonPayload = parse(payload)?;
            let reason = required_text(p.reason, "reason")?;
            tool(
                "crm_waive_payment",
                json!({"payment_id": payment_id, "reason": reason}),
            )
        }
    };
    Ok(step)
}

fn plan_invoice(
    action: InvoiceAction,
    payment_id: i64,
    payload: &Value,
) -> Result<Step, PayloadError> {
    let step = match action {
        InvoiceAction::CreateInvoice => {
            let p: CreateInvoicePayload = parse(payload)?;
            let tax_id = p
                .buyer_tax_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
            if p.invoice_type == InvoiceType::Company {
                match tax_id {
                    Some(ref t) if valid_tax_id(t) => {}
                    Some(ref t) => {
                        return Err(PayloadError::Invalid(format!(
                            "invalid buyer_tax_id '{}': expected 8 digits",
                            t
                        )))
                    }
                    None => {
                        return Err(PayloadError::Invalid(
                            "company invoices require `buyer_tax_id`".to_string(),
                        ))
                    }
                }
            }
            tool(
                "invoice_create",
                json!({
                    "payment_id": payment_id,
                    "invoice_type": p.invoice_type,
                    "buyer_name": p.buyer_name,
                    "buyer_tax_id": tax_id,
                }),
            )
        }
        InvoiceAction::FillTaxId => {
            let p: TaxIdPayload = parse(payload)?;
            let url = match p.customer_id {
                Some(customer_id) => format!("/customers/{}?focus=tax_id", customer_id),
                None => format!("/payments/{}?focus=tax_id", payment_id),
            };
            Step::Navigate(NavigationIntent {
                url,
                reason: "補填統一編號後即可開立發票".to_string(),
            })
        }
        InvoiceAction::VoidInvoice => {
            let p: ReasonPayload = parse(payload)?;
            let reason = required_text(p.reason, "reason")?;
            tool(
                "invoice_void",
                json!({"payment_id": payment_id, "reason": reason}),
            )
        }
    };
    Ok(step)
}

fn plan_termination(
    action: TerminationAction,
    case_id: i64,
    payload: &Value,
) -> Result<Step, PayloadError> {
    let step = match action {
        TerminationAction::ConfirmNotice => termination_status(case_id, "notice_confirmed"),
        TerminationAction::ScheduleMoveOut => termination_status(case_id, "moving_out"),
        TerminationAction::CompleteInspection => termination_status(case_id, "inspection_done"),
        TerminationAction::CloseCase => termination_status(case_id, "completed"),
        TerminationAction::UpdateStatus => {
            let p: StatusPayload = parse(payload)?;
            let status = required_text(p.status, "status")?;
            termination_status(case_id, &status)
        }
        TerminationAction::SettleDeposit => {
            let p: SettleDepositPayload = parse(payload)?;
            if p.deduction_amount < 0 {
                return Err(PayloadError::Invalid(
                    "deduction_amount cannot be negative".to_string(),
                ));
            }
            tool(
                "termination_settle_deposit",
                json!({
                    "case_id": case_id,
                    "deduction_amount": p.deduction_amount,
                    "notes": p.notes,
                }),
            )
        }
    };
    Ok(step)
}

fn plan_commission(
    action: CommissionAction,
    commission_id: i64,
    payload: &Value,
    today: NaiveDate,
) -> Result<Step, PayloadError> {
    let step = match action {
        CommissionAction::Approve => tool(
            "commission_approve",
            json!({"commission_id": commission_id}),
        ),
        CommissionAction::PayCommission => {
            let p: PayCommissionPayload = parse(payload)?;
            tool(
                "commission_pay",
                json!({
                    "commission_id": commission_id,
                    "payment_method": p.payment_method.as_str(),
                    "payment_reference": p.payment_reference,
                    "paid_at": p.paid_at.unwrap_or(today).to_string(),
                }),
            )
        }
        CommissionAction::Cancel => {
            let p: ReasonPayload = parse(payload)?;
            let reason = required_text(p.reason, "reason")?;
            tool(
                "commission_cancel",
                json!({"commission_id": commission_id, "reason": reason}),
            )
        }
    };
    Ok(step)
}

fn plan_signing(
    action: SigningAction,
    contract_id: i64,
    payload: &Value,
    today: NaiveDate,
) -> Result<Step, PayloadError> {
    let step = match action {
        SigningAction::SendForSigning => tool(
            "contract_send_for_signing",
            json!({"contract_id": contract_id}),
        ),
        SigningAction::MarkSigned => {
            let p: SignedPayload = parse(payload)?;
            tool(
                "contract_mark_signed",
                json!({
                    "contract_id": contract_id,
                    "signed_at": p.signed_at.unwrap_or(today).to_string(),
                }),
            )
        }
        SigningAction::ReviewContract => Step::Navigate(NavigationIntent {
            url: format!("/contracts/{}", contract_id),
            reason: "請先審閱合約內容".to_string(),
        }),
    };
    Ok(step)
}

/// Payload fields a caller should collect before running an action.
///
/// Used by the console's action form; `(name, required)` pairs.
pub fn payload_fields(action: ProcessAction) -> &'static [(&'static str, bool)] {
    match action {
        ProcessAction::Renewal(RenewalAction::CreateDraft) => &[("force", false)],
        ProcessAction::Renewal(RenewalAction::SendNotice | RenewalAction::ConfirmIntent) => {
            &[("value", false)]
        }
        ProcessAction::Payment(PaymentAction::RecordPayment) => {
            &[("payment_method", true), ("notes", false)]
        }
        ProcessAction::Payment(PaymentAction::WaivePayment)
        | ProcessAction::Invoice(InvoiceAction::VoidInvoice)
        | ProcessAction::Commission(CommissionAction::Cancel) => &[("reason", true)],
        ProcessAction::Invoice(InvoiceAction::CreateInvoice) => &[
            ("invoice_type", false),
            ("buyer_name", false),
            ("buyer_tax_id", false),
        ],
        ProcessAction::Invoice(InvoiceAction::FillTaxId) => &[("customer_id", false)],
        ProcessAction::Termination(TerminationAction::UpdateStatus) => &[("status", true)],
        ProcessAction::Termination(TerminationAction::SettleDeposit) => {
            &[("deduction_amount", false), ("notes", false)]
        }
        ProcessAction::Commission(CommissionAction::PayCommission) => &[
            ("payment_method", false),
            ("payment_reference", false),
            ("paid_at", false),
        ],
        ProcessAction::Signing(SigningAction::MarkSigned) => &[("signed_at", false)],
        _ => &[],
    }
}

/// Type a text input for its payload field. Unparseable input stays a string
/// so validation reports it.
pub fn field_value(name: &str, raw: &str) -> Value {
    let raw = raw.trim();
    match name {
        "force" | "value" => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Value::Bool(true),
            "false" | "no" | "n" | "0" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        "deduction_amount" | "customer_id" => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

/// Build a payload object from `key=value` text pairs, skipping blank values
pub fn payload_from_pairs<'a, I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let object = pairs
        .into_iter()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(name, raw)| (name.to_string(), field_value(name, raw)))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_pairs() {
        let payload = payload_from_pairs([
            ("deduction_amount", "1500"),
            ("notes", " 牆面修補 "),
            ("force", "yes"),
            ("paid_at", ""),
        ]);
        assert_eq!(
            payload,
            json!({"deduction_amount": 1500, "notes": "牆面修補", "force": true})
        );

        // Bad numbers surface as a validation error, not a silent default
        let payload = payload_from_pairs([("deduction_amount", "lots")]);
        assert!(ProcessAction::Termination(TerminationAction::SettleDeposit)
            .plan_on(1, &payload, day())
            .is_err());
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn plan(action: ProcessAction, id: i64, payload: Value) -> Result<Step, PayloadError> {
        action.plan_on(id, &payload, day())
    }

    #[test]
    fn test_record_payment_params() {
        let step = plan(
            ProcessAction::Payment(PaymentAction::RecordPayment),
            42,
            json!({"payment_method": "bank_transfer", "notes": "ref-123"}),
        )
        .unwrap();

        assert_eq!(
            step,
            Step::Tool(ToolCall {
                tool: "crm_record_payment",
                params: json!({"payment_id": 42, "payment_method": "bank_transfer", "notes": "ref-123"}),
            })
        );
    }

    #[test]
    fn test_record_payment_requires_method() {
        let err = plan(
            ProcessAction::Payment(PaymentAction::RecordPayment),
            1,
            json!({}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("payment_method"));

        let err = plan(
            ProcessAction::Payment(PaymentAction::RecordPayment),
            1,
            json!({"payment_method": "bitcoin"}),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_force_and_value_defaults() {
        let Step::Tool(call) = plan(
            ProcessAction::Renewal(RenewalAction::CreateDraft),
            7,
            Value::Null,
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.params, json!({"contract_id": 7, "force": false}));

        let Step::Tool(call) = plan(
            ProcessAction::Renewal(RenewalAction::SendNotice),
            7,
            json!({}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.params["value"], json!(true));

        let Step::Tool(call) = plan(
            ProcessAction::Renewal(RenewalAction::ConfirmIntent),
            7,
            json!({"value": false}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.params["value"], json!(false));
        assert_eq!(call.params["flag"], json!("confirmed"));
    }

    #[test]
    fn test_commission_pay_defaults() {
        let Step::Tool(call) = plan(
            ProcessAction::Commission(CommissionAction::PayCommission),
            5,
            json!({}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.tool, "commission_pay");
        assert_eq!(
            call.params,
            json!({
                "commission_id": 5,
                "payment_method": "bank_transfer",
                "payment_reference": "",
                "paid_at": "2026-03-01",
            })
        );
    }

    #[test]
    fn test_company_invoice_needs_tax_id() {
        let action = ProcessAction::Invoice(InvoiceAction::CreateInvoice);
        assert!(plan(action, 3, json!({"invoice_type": "company"})).is_err());
        assert!(plan(
            action,
            3,
            json!({"invoice_type": "company", "buyer_tax_id": "1234"})
        )
        .is_err());

        let Step::Tool(call) = plan(
            action,
            3,
            json!({"invoice_type": "company", "buyer_name": "好室科技", "buyer_tax_id": " 24536806 "}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.params["buyer_tax_id"], json!("24536806"));
        assert_eq!(call.params["invoice_type"], json!("company"));
    }

    #[test]
    fn test_personal_invoice_defaults() {
        let Step::Tool(call) = plan(
            ProcessAction::Invoice(InvoiceAction::CreateInvoice),
            3,
            json!({}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(
            call.params,
            json!({"payment_id": 3, "invoice_type": "personal", "buyer_name": null, "buyer_tax_id": null})
        );
    }

    #[test]
    fn test_navigation_steps() {
        let step = plan(
            ProcessAction::Invoice(InvoiceAction::FillTaxId),
            9,
            json!({"customer_id": 12}),
        )
        .unwrap();
        assert!(matches!(step, Step::Navigate(ref n) if n.url == "/customers/12?focus=tax_id"));

        let step = plan(ProcessAction::Invoice(InvoiceAction::FillTaxId), 9, json!({})).unwrap();
        assert!(matches!(step, Step::Navigate(ref n) if n.url == "/payments/9?focus=tax_id"));

        let step = plan(
            ProcessAction::Signing(SigningAction::ReviewContract),
            4,
            json!({}),
        )
        .unwrap();
        assert!(matches!(step, Step::Navigate(ref n) if n.url == "/contracts/4"));
    }

    #[test]
    fn test_termination_status_steps() {
        let Step::Tool(call) = plan(
            ProcessAction::Termination(TerminationAction::CloseCase),
            11,
            json!({}),
        )
        .unwrap() else {
            panic!("expected tool call");
        };
        assert_eq!(call.tool, "termination_update_status_v2");
        assert_eq!(call.params, json!({"case_id": 11, "status": "completed"}));

        assert!(plan(
            ProcessAction::Termination(TerminationAction::UpdateStatus),
            11,
            json!({"status": "  "})
        )
        .is_err());
        assert!(plan(
            ProcessAction::Termination(TerminationAction::SettleDeposit),
            11,
            json!({"deduction_amount": -1})
        )
        .is_err());
    }

    #[test]
    fn test_reason_required() {
        for action in [
            ProcessAction::Payment(PaymentAction::WaivePayment),
            ProcessAction::Invoice(InvoiceAction::VoidInvoice),
            ProcessAction::Commission(CommissionAction::Cancel),
        ] {
            assert!(plan(action, 1, json!({})).is_err(), "{}", action);
            assert!(plan(action, 1, json!({"reason": "重複開立"})).is_ok(), "{}", action);
        }
    }

    #[test]
    fn test_non_object_payload_rejected() {
        for action in ProcessAction::all() {
            for payload in [json!([1]), json!("force"), json!(7)] {
                assert_eq!(
                    plan(action, 1, payload).unwrap_err(),
                    PayloadError::NotAnObject,
                    "{}",
                    action
                );
            }
        }
        assert!(plan(
            ProcessAction::Payment(PaymentAction::SendReminder),
            1,
            Value::Null
        )
        .is_ok());
    }

    #[test]
    fn test_actions_without_required_fields_plan_with_empty_payload() {
        for action in ProcessAction::all() {
            let needs_input = payload_fields(action).iter().any(|(_, required)| *required);
            if !needs_input {
                assert!(
                    plan(action, 1, json!({})).is_ok(),
                    "{} should plan with an empty payload",
                    action
                );
            }
        }
    }
}
