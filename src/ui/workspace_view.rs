//! Full-screen view of one workflow instance.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use serde_json::Value;

use super::panels::{DecisionPanel, TimelinePanel};
use crate::process::{ProcessKey, QueueItem, WorkspaceState};

/// Columns already shown by the decision and timeline panels
const HIDDEN_COLUMNS: &[&str] = &[
    "blocked_by",
    "decision_blocked_by",
    "next_action",
    "decision_next_action",
    "action_key",
    "decision_action_key",
    "owner",
    "decision_owner",
    "priority",
    "decision_priority",
    "is_overdue",
    "overdue_days",
    "timeline",
];

pub struct WorkspaceView {
    pub process: ProcessKey,
    pub entity_id: i64,
    pub state: WorkspaceState,
    scroll: u16,
}

impl WorkspaceView {
    pub fn new(process: ProcessKey, entity_id: i64) -> Self {
        Self {
            process,
            entity_id,
            state: WorkspaceState::Loading,
            scroll: 0,
        }
    }

    /// Only accepts results for the entity currently shown
    pub fn apply(&mut self, process: ProcessKey, entity_id: i64, state: WorkspaceState) -> bool {
        if process != self.process || entity_id != self.entity_id {
            return false;
        }
        self.state = state;
        true
    }

    pub fn item(&self) -> Option<&QueueItem> {
        self.state.item()
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    fn field_lines(item: &QueueItem) -> Vec<Line<'static>> {
        item.row
            .iter()
            .filter(|(k, v)| !HIDDEN_COLUMNS.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Line::from(vec![
                    Span::styled(format!("{:<20}", k), Style::default().fg(Color::DarkGray)),
                    Span::raw(value),
                ])
            })
            .collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, action_loading: bool) {
        let title = match self.item() {
            Some(item) => format!(
                " {} #{}  {} ",
                self.process.display_name(),
                self.entity_id,
                item.title
            ),
            None => format!(" {} #{} ", self.process.display_name(), self.entity_id),
        };
        let outer = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let item = match &self.state {
            WorkspaceState::Loading => {
                frame.render_widget(
                    Paragraph::new("載入中…")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(Color::DarkGray)),
                    inner,
                );
                return;
            }
            WorkspaceState::Failed { message } => {
                let lines = vec![
                    Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red))),
                    Line::from(""),
                    Line::from(Span::styled("[r] 重試", Style::default().fg(Color::Yellow))),
                ];
                frame.render_widget(
                    Paragraph::new(lines)
                        .alignment(Alignment::Center)
                        .wrap(Wrap { trim: true }),
                    inner,
                );
                return;
            }
            WorkspaceState::Ready(item) => item,
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(inner);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(3)])
            .split(columns[0]);

        DecisionPanel {
            process: self.process,
            decision: &item.decision,
            loading: action_loading,
        }
        .render(frame, left[0], true);

        let fields = Paragraph::new(Self::field_lines(item))
            .scroll((self.scroll, 0))
            .block(
                Block::default()
                    .title(Span::styled(" 資料 ", Style::default().add_modifier(Modifier::BOLD)))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Gray)),
            );
        frame.render_widget(fields, left[1]);

        TimelinePanel {
            steps: &item.timeline,
        }
        .render(frame, columns[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;

    fn screen(view: &WorkspaceView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                view.render(f, area, false);
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn ready_item() -> QueueItem {
        QueueItem::from_row(
            ProcessKey::Payment,
            json!({
                "payment_id": 42,
                "customer_name": "Acme",
                "amount": 5000,
                "blocked_by": "overdue",
                "priority": "urgent",
                "timeline": [{"key": "notice", "label": "notice", "status": "done"}]
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_apply_ignores_stale_results() {
        let mut view = WorkspaceView::new(ProcessKey::Payment, 42);
        assert!(!view.apply(
            ProcessKey::Payment,
            7,
            WorkspaceState::Failed {
                message: "x".into()
            }
        ));
        assert!(view.state.is_loading());

        assert!(view.apply(
            ProcessKey::Payment,
            42,
            WorkspaceState::Ready(Box::new(ready_item()))
        ));
        assert_eq!(view.item().map(|i| i.entity_id), Some(42));
    }

    #[test]
    fn test_failed_state_offers_retry() {
        let mut view = WorkspaceView::new(ProcessKey::Payment, 42);
        view.state = WorkspaceState::Failed {
            message: "timeout".into(),
        };
        let text = screen(&view);
        assert!(text.contains("timeout"));
        assert!(text.contains("[r]"));
    }

    #[test]
    fn test_ready_state_shows_fields() {
        let mut view = WorkspaceView::new(ProcessKey::Payment, 42);
        view.state = WorkspaceState::Ready(Box::new(ready_item()));
        let text = screen(&view);
        assert!(text.contains("Acme"));
        assert!(text.contains("amount"));
        assert!(text.contains("5000"));
        assert!(text.contains("notice"));
    }

    #[test]
    fn test_field_lines_skip_decision_columns() {
        let lines = WorkspaceView::field_lines(&ready_item());
        let text: String = lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.content.to_string()))
            .collect();
        assert!(!text.contains("blocked_by"));
        assert!(text.contains("customer_name"));
    }

    #[test]
    fn test_scroll_saturates() {
        let mut view = WorkspaceView::new(ProcessKey::Signing, 1);
        view.scroll_up();
        view.scroll_down();
        view.scroll_down();
        view.scroll_up();
        assert_eq!(view.scroll, 1);
    }
}
