//! Decision records and the decision panel controller.
//!
//! A decision record is the backend's snapshot of one workflow instance:
//! what blocks it, what to do next, who owns it, how urgent it is. The
//! controller turns a button press into a dispatch, guarding against a
//! second press of the same action while the first is in flight.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::action::ProcessAction;
use super::dispatcher::{ActionDispatcher, ActionOutcome, DispatchError};
use super::labels::{self, COMPLETED};
use super::ProcessKey;

/// Urgency of a workflow instance. Unknown values read as `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[
            Priority::Urgent,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ]
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "urgent" => Priority::Urgent,
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Urgent => "緊急",
            Priority::High => "高",
            Priority::Medium => "中",
            Priority::Low => "低",
        }
    }

    /// Sort rank, 0 = most urgent
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Priority {
    /// Views expose either the enum text or its 1-based rank
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Priority::from_code(s),
            Value::Number(n) => match n.as_f64().map(|f| f as i64) {
                Some(1) => Priority::Urgent,
                Some(2) => Priority::High,
                Some(4) => Priority::Low,
                _ => Priority::Medium,
            },
            _ => Priority::Medium,
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Priority::from_value(&Value::deserialize(deserializer)?))
    }
}

/// Responsible role
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Sales,
    Finance,
    Admin,
    Legal,
    /// Role the console has no label for
    Other(String),
}

impl Owner {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "sales" | "業務" => Owner::Sales,
            "finance" | "財務" => Owner::Finance,
            "admin" | "行政" => Owner::Admin,
            "legal" | "法務" => Owner::Legal,
            _ => Owner::Other(code.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Owner::Sales => "Sales",
            Owner::Finance => "Finance",
            Owner::Admin => "Admin",
            Owner::Legal => "Legal",
            Owner::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Owner::Sales => "業務",
            Owner::Finance => "財務",
            Owner::Admin => "行政",
            Owner::Legal => "法務",
            Owner::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Owner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Owner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Owner::from_code(&raw))
    }
}

/// Column value, preferring the `decision_`-prefixed name
fn column<'a>(row: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    row.get(&format!("decision_{}", name))
        .filter(|v| !v.is_null())
        .or_else(|| row.get(name))
        .filter(|v| !v.is_null())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "true" | "t" | "1"),
        _ => false,
    }
}

fn days(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.trunc() as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

/// Server-computed snapshot of a workflow's blocking state.
///
/// Reads both bare column names and the `decision_`-prefixed names used
/// by the queue views.
///
/// Every field is decoded on its own, so a malformed column never hides
/// the blocking reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub blocked_by: Option<String>,
    pub next_action: Option<String>,
    pub action_key: Option<String>,
    pub owner: Option<Owner>,
    pub priority: Priority,
    pub is_overdue: bool,
    pub overdue_days: i64,
}

impl DecisionRecord {
    pub fn from_row(row: &Map<String, Value>) -> Self {
        Self {
            blocked_by: text(column(row, "blocked_by")),
            next_action: text(column(row, "next_action")),
            action_key: text(column(row, "action_key")),
            owner: text(column(row, "owner")).map(|o| Owner::from_code(&o)),
            priority: column(row, "priority")
                .map(Priority::from_value)
                .unwrap_or_default(),
            is_overdue: flag(column(row, "is_overdue")),
            overdue_days: days(column(row, "overdue_days")),
        }
    }
}

impl<'de> Deserialize<'de> for DecisionRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let row = Map::<String, Value>::deserialize(deserializer)?;
        Ok(DecisionRecord::from_row(&row))
    }
}

/// The button a decision panel offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryAction {
    /// Raw `action_key`
    pub code: String,
    pub label: Cow<'static, str>,
    /// `None` when the code is not in the action table
    pub action: Option<ProcessAction>,
}

impl DecisionRecord {
    /// Absent or `completed` blocking reason means the workflow is done
    pub fn is_completed(&self) -> bool {
        match self.blocked_by.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(code) => code == COMPLETED,
        }
    }

    /// `已逾期 N 天` when overdue by at least one day
    pub fn overdue_warning(&self) -> Option<String> {
        if self.is_overdue && self.overdue_days > 0 {
            Some(format!("已逾期 {} 天", self.overdue_days))
        } else {
            None
        }
    }

    pub fn blocked_label(&self, process: ProcessKey) -> Cow<'static, str> {
        labels::blocked_label(process, self.blocked_by.as_deref().unwrap_or(COMPLETED))
    }

    /// The action button to show, if any
    pub fn primary_action(&self, process: ProcessKey) -> Option<PrimaryAction> {
        if self.is_completed() {
            return None;
        }

        match self.action_key.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(PrimaryAction {
                code: code.to_string(),
                label: labels::action_label(process, code),
                action: ProcessAction::for_key(process, code),
            }),
            _ => {
                let action =
                    labels::suggested_action(process, self.blocked_by.as_deref().unwrap_or(""))?;
                Some(PrimaryAction {
                    code: action.code().to_string(),
                    label: Cow::Borrowed(action.label()),
                    action: Some(action),
                })
            }
        }
    }
}

/// Caller-supplied replacement for the dispatcher, keyed by action code
#[async_trait]
pub trait CustomAction: Send + Sync {
    async fn run(
        &self,
        entity_id: i64,
        decision: &DecisionRecord,
        payload: &Value,
    ) -> Result<ActionOutcome, DispatchError>;
}

/// Receives the result of every triggered action
pub trait ActionObserver: Send + Sync {
    fn on_action_complete(&self, action_key: &str, outcome: &ActionOutcome);
    fn on_action_error(&self, action_key: &str, message: &str);
}

/// Removes its key from the in-flight set when dropped
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

/// Runs decision panel actions
pub struct DecisionController {
    dispatcher: ActionDispatcher,
    overrides: HashMap<String, Arc<dyn CustomAction>>,
    in_flight: Mutex<HashSet<String>>,
}

impl DecisionController {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self {
            dispatcher,
            overrides: HashMap::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Route an action code to a custom handler instead of the dispatcher
    pub fn with_override(mut self, action_key: &str, handler: Arc<dyn CustomAction>) -> Self {
        self.overrides.insert(action_key.to_string(), handler);
        self
    }

    fn flight_key(process: ProcessKey, entity_id: i64, action_key: &str) -> String {
        format!("{}:{}:{}", process, entity_id, action_key)
    }

    /// Whether this action is currently running for this entity
    pub fn is_loading(&self, process: ProcessKey, entity_id: i64, action_key: &str) -> bool {
        let key = Self::flight_key(process, entity_id, action_key);
        self.in_flight
            .lock()
            .map(|set| set.contains(&key))
            .unwrap_or(false)
    }

    fn begin(&self, key: String) -> Option<InFlightGuard<'_>> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            set: &self.in_flight,
            key,
        })
    }

    /// Run an action and report to the observer.
    ///
    /// Returns `None` without doing anything when the same action is already
    /// in flight for this entity, or the workflow is completed.
    pub async fn trigger(
        &self,
        process: ProcessKey,
        entity_id: i64,
        action_key: &str,
        decision: &DecisionRecord,
        payload: &Value,
        observer: &dyn ActionObserver,
    ) -> Option<Result<ActionOutcome, DispatchError>> {
        if decision.is_completed() {
            debug!(%process, entity_id, action_key, "Ignoring action on completed workflow");
            return None;
        }

        let Some(_guard) = self.begin(Self::flight_key(process, entity_id, action_key)) else {
            debug!(%process, entity_id, action_key, "Action already in flight");
            return None;
        };

        let result = match self.overrides.get(action_key) {
            Some(handler) => handler.run(entity_id, decision, payload).await,
            None => match ProcessAction::for_key(process, action_key) {
                Some(action) => self.dispatcher.execute(action, entity_id, payload).await,
                None => Err(DispatchError::undefined(process.as_str(), action_key)),
            },
        };

        match result {
            Ok(ref outcome) => observer.on_action_complete(action_key, outcome),
            Err(ref e) => observer.on_action_error(action_key, &e.to_string()),
        }

        Some(result)
    }
}
