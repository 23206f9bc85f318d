//! Workflow step timeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

/// State of one step. Unrecognized values read as `NotStarted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Done,
    Pending,
    Blocked,
    Draft,
    #[default]
    NotStarted,
    NotCreated,
    Skipped,
    NotApplicable,
}

impl StepStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "done" | "completed" => StepStatus::Done,
            "pending" | "in_progress" => StepStatus::Pending,
            "blocked" => StepStatus::Blocked,
            "draft" => StepStatus::Draft,
            "not_created" => StepStatus::NotCreated,
            "skipped" => StepStatus::Skipped,
            "n/a" | "na" | "not_applicable" => StepStatus::NotApplicable,
            _ => StepStatus::NotStarted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Done => "done",
            StepStatus::Pending => "pending",
            StepStatus::Blocked => "blocked",
            StepStatus::Draft => "draft",
            StepStatus::NotStarted => "not_started",
            StepStatus::NotCreated => "not_created",
            StepStatus::Skipped => "skipped",
            StepStatus::NotApplicable => "n/a",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            StepStatus::Done => "✓",
            StepStatus::Pending => "◐",
            StepStatus::Blocked => "✗",
            StepStatus::Draft => "✎",
            StepStatus::NotStarted | StepStatus::NotCreated => "○",
            StepStatus::Skipped | StepStatus::NotApplicable => "–",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Done => "已完成",
            StepStatus::Pending => "進行中",
            StepStatus::Blocked => "受阻",
            StepStatus::Draft => "草稿",
            StepStatus::NotStarted => "未開始",
            StepStatus::NotCreated => "未建立",
            StepStatus::Skipped => "已略過",
            StepStatus::NotApplicable => "不適用",
        }
    }

    /// Steps that no longer need attention
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            StepStatus::Done | StepStatus::Skipped | StepStatus::NotApplicable
        )
    }
}

impl Serialize for StepStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| StepStatus::from_code(&s)).unwrap_or_default())
    }
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    #[serde(alias = "step")]
    pub key: String,
    #[serde(default, alias = "name")]
    pub label: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, alias = "detail", skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TimelineStep {
    /// Label to render, falling back to the key
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// Read a `timeline` array, skipping malformed entries
pub fn parse_timeline(value: &Value) -> Vec<TimelineStep> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(step) => Some(step),
            Err(e) => {
                debug!(error = %e, "Skipping malformed timeline entry");
                None
            }
        })
        .collect()
}

/// Completed vs total, ignoring steps that do not apply
pub fn progress(steps: &[TimelineStep]) -> (usize, usize) {
    let relevant = steps
        .iter()
        .filter(|s| s.status != StepStatus::NotApplicable);
    let total = relevant.clone().count();
    let done = relevant.filter(|s| s.status.is_settled()).count();
    (done, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_status_renders_as_not_started() {
        assert_eq!(StepStatus::from_code("wibble"), StepStatus::NotStarted);
        assert_eq!(StepStatus::from_code("wibble").icon(), "○");
        assert_eq!(StepStatus::from_code("N/A"), StepStatus::NotApplicable);
        assert_eq!(StepStatus::from_code("DONE"), StepStatus::Done);
    }

    #[test]
    fn test_parse_timeline() {
        let steps = parse_timeline(&json!([
            {"key": "draft", "label": "建立草稿", "status": "done", "details": "2026-03-01"},
            {"step": "notice", "name": "通知客戶", "status": "pending"},
            {"key": "signing", "status": null},
            {"label": "no key"},
            "garbage"
        ]));

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].details.as_deref(), Some("2026-03-01"));
        assert_eq!(steps[1].key, "notice");
        assert_eq!(steps[1].label, "通知客戶");
        assert_eq!(steps[2].status, StepStatus::NotStarted);
        assert_eq!(steps[2].display_label(), "signing");
    }

    #[test]
    fn test_non_array_timeline_is_empty() {
        assert!(parse_timeline(&Value::Null).is_empty());
        assert!(parse_timeline(&json!({"key": "x"})).is_empty());
    }

    #[test]
    fn test_progress() {
        let steps = parse_timeline(&json!([
            {"key": "a", "status": "done"},
            {"key": "b", "status": "skipped"},
            {"key": "c", "status": "pending"},
            {"key": "d", "status": "n/a"}
        ]));
        assert_eq!(progress(&steps), (2, 3));
    }
}
