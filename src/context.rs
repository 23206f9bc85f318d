//! Application context shared by the console's views.
//!
//! Holds toasts, the selected branch, the signed-in session and sidebar
//! visibility. It is a cheap cloneable handle; every view that needs it is
//! handed one explicitly.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::config::UiConfig;
use crate::process::{ActionObserver, ActionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Local>,
}

/// Who is using the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug)]
struct ContextState {
    notifications: VecDeque<Notification>,
    selected_branch: Option<i64>,
    session: Option<Session>,
    sidebar_open: bool,
}

#[derive(Clone, Debug)]
pub struct AppContext {
    state: Arc<RwLock<ContextState>>,
    max_notifications: usize,
    ttl: Duration,
}

impl AppContext {
    pub fn new(max_notifications: usize, ttl_secs: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(ContextState {
                notifications: VecDeque::new(),
                selected_branch: None,
                session: None,
                sidebar_open: true,
            })),
            max_notifications: max_notifications.max(1),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn from_config(config: &UiConfig) -> Self {
        Self::new(config.max_notifications, config.notification_ttl_secs)
    }

    // A panicked writer leaves plain data behind; keep using it
    fn read(&self) -> RwLockReadGuard<'_, ContextState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // ─── Notifications ───────────────────────────────────────────────────

    /// Queue a toast, dropping the oldest past the cap
    pub fn add_notification(&self, level: NotificationLevel, message: impl Into<String>) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Local::now(),
        };
        let id = notification.id;

        let mut state = self.write();
        state.notifications.push_back(notification);
        while state.notifications.len() > self.max_notifications {
            state.notifications.pop_front();
        }
        id
    }

    pub fn dismiss_notification(&self, id: Uuid) -> bool {
        let mut state = self.write();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        state.notifications.len() != before
    }

    /// Drop toasts older than the TTL; returns how many were removed
    pub fn prune_expired(&self, now: DateTime<Local>) -> usize {
        let mut state = self.write();
        let before = state.notifications.len();
        let ttl = self.ttl;
        state.notifications.retain(|n| now - n.created_at < ttl);
        before - state.notifications.len()
    }

    /// Oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.read().notifications.iter().cloned().collect()
    }

    pub fn latest_notification(&self) -> Option<Notification> {
        self.read().notifications.back().cloned()
    }

    // ─── Branch / session / layout ───────────────────────────────────────

    pub fn selected_branch(&self) -> Option<i64> {
        self.read().selected_branch
    }

    pub fn set_selected_branch(&self, branch_id: Option<i64>) {
        self.write().selected_branch = branch_id;
    }

    pub fn session(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.write().session = session;
    }

    pub fn sidebar_open(&self) -> bool {
        self.read().sidebar_open
    }

    /// Returns the new visibility
    pub fn toggle_sidebar(&self) -> bool {
        let mut state = self.write();
        state.sidebar_open = !state.sidebar_open;
        state.sidebar_open
    }
}

impl ActionObserver for AppContext {
    fn on_action_complete(&self, action_key: &str, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Rpc { .. } => {
                self.add_notification(
                    NotificationLevel::Success,
                    format!("{} 執行成功", action_key),
                );
            }
            ActionOutcome::Navigate(intent) => {
                self.add_notification(
                    NotificationLevel::Info,
                    format!("{}: 請前往 {}", intent.reason, intent.url),
                );
            }
        }
    }

    fn on_action_error(&self, action_key: &str, message: &str) {
        self.add_notification(
            NotificationLevel::Error,
            format!("{} 執行失敗: {}", action_key, message),
        );
    }
}
