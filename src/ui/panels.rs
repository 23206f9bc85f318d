use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::context::{Notification, NotificationLevel};
use crate::process::queue::DashboardStats;
use crate::process::timeline::progress;
use crate::process::{DecisionRecord, Priority, ProcessKey, StepStatus, TimelineStep};

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Urgent => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::White,
        Priority::Low => Color::Gray,
    }
}

pub fn step_color(status: StepStatus) -> Color {
    match status {
        StepStatus::Done => Color::Green,
        StepStatus::Pending => Color::Yellow,
        StepStatus::Blocked => Color::Red,
        StepStatus::Draft => Color::Cyan,
        _ => Color::DarkGray,
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    }
}

/// Blocking reason, next action, owner, priority and the action button
pub struct DecisionPanel<'a> {
    pub process: ProcessKey,
    pub decision: &'a DecisionRecord,
    /// The primary action is running
    pub loading: bool,
}

impl DecisionPanel<'_> {
    pub fn lines(&self) -> Vec<Line<'static>> {
        let d = self.decision;
        let label = Style::default().fg(Color::DarkGray);

        if d.is_completed() {
            return vec![Line::from(Span::styled(
                "✓ 已完成",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ))];
        }

        let mut lines = vec![Line::from(vec![
            Span::styled("卡關原因  ", label),
            Span::styled(
                d.blocked_label(self.process).into_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ])];

        if let Some(ref next) = d.next_action {
            lines.push(Line::from(vec![
                Span::styled("下一步    ", label),
                Span::raw(next.clone()),
            ]));
        }

        lines.push(Line::from(vec![
            Span::styled("負責      ", label),
            Span::raw(
                d.owner
                    .as_ref()
                    .map(|o| o.label().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Span::styled("   優先  ", label),
            Span::styled(
                d.priority.label(),
                Style::default().fg(priority_color(d.priority)),
            ),
        ]));

        if let Some(warning) = d.overdue_warning() {
            lines.push(Line::from(Span::styled(
                format!("⚠ {}", warning),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        if let Some(action) = d.primary_action(self.process) {
            let text = if self.loading {
                format!("[ {} … ]", action.label)
            } else {
                format!("[a] {}", action.label)
            };
            let style = if self.loading {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
                    .fg(Color::Black)
                    .bg(priority_color(d.priority))
            };
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(text, style)));
        }

        lines
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let panel = Paragraph::new(self.lines())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(" 決策 ")
                    .borders(Borders::ALL)
                    .border_style(border_style(focused)),
            );
        frame.render_widget(panel, area);
    }
}

pub struct TimelinePanel<'a> {
    pub steps: &'a [TimelineStep],
}

impl TimelinePanel<'_> {
    pub fn lines(&self) -> Vec<Line<'static>> {
        if self.steps.is_empty() {
            return vec![Line::from(Span::styled(
                "沒有流程紀錄",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        self.steps
            .iter()
            .map(|step| {
                let color = step_color(step.status);
                let mut spans = vec![
                    Span::styled(format!("{} ", step.status.icon()), Style::default().fg(color)),
                    Span::raw(step.display_label().to_string()),
                    Span::styled(
                        format!("  {}", step.status.label()),
                        Style::default().fg(color),
                    ),
                ];
                if let Some(ref details) = step.details {
                    spans.push(Span::styled(
                        format!("  {}", details),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            })
            .collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (done, total) = progress(self.steps);
        let panel = Paragraph::new(self.lines()).block(
            Block::default()
                .title(format!(" 流程 {}/{} ", done, total))
                .borders(Borders::ALL)
                .border_style(border_style(false)),
        );
        frame.render_widget(panel, area);
    }
}

pub struct HeaderBar<'a> {
    pub stats: &'a DashboardStats,
    pub branch: Option<i64>,
    pub user: Option<&'a str>,
    pub refreshing: bool,
}

impl HeaderBar<'_> {
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let total = self.stats.total();
        let mut spans = vec![
            Span::styled(
                " Backoffice",
                Style::default()
                    .fg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" v{}", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::Gray),
            ),
            Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("待處理 {}", total.total)),
            Span::styled(
                format!("  逾期 {}", total.overdue),
                Style::default().fg(if total.overdue > 0 {
                    Color::Red
                } else {
                    Color::Gray
                }),
            ),
            Span::styled(
                format!("  緊急 {}", total.urgent),
                Style::default().fg(if total.urgent > 0 {
                    Color::Yellow
                } else {
                    Color::Gray
                }),
            ),
        ];

        spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::raw(match self.branch {
            Some(id) => format!("分館 #{}", id),
            None => "全部分館".to_string(),
        }));
        if let Some(user) = self.user {
            spans.push(Span::styled(
                format!("  {}", user),
                Style::default().fg(Color::Gray),
            ));
        }
        if self.refreshing {
            spans.push(Span::styled("  ⟳", Style::default().fg(Color::Cyan)));
        }

        let bar = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(bar, area);
    }
}

pub struct StatusBar<'a> {
    pub hint: &'a str,
    pub last_refresh: Option<String>,
}

impl StatusBar<'_> {
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        if let Some(ref at) = self.last_refresh {
            spans.push(Span::styled(
                format!(" 更新於 {} ", at),
                Style::default().fg(Color::Gray),
            ));
        }
        spans.push(Span::styled(
            format!(" {}", self.hint),
            Style::default().fg(Color::DarkGray),
        ));
        let bar = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP));
        frame.render_widget(bar, area);
    }
}

fn level_style(level: NotificationLevel) -> (Color, &'static str) {
    match level {
        NotificationLevel::Info => (Color::Cyan, "ℹ"),
        NotificationLevel::Success => (Color::Green, "✓"),
        NotificationLevel::Warning => (Color::Yellow, "!"),
        NotificationLevel::Error => (Color::Red, "✗"),
    }
}

/// Toasts stacked in the bottom-right corner, newest at the bottom
pub struct ToastStack<'a> {
    pub notifications: &'a [Notification],
}

impl ToastStack<'_> {
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let width = (area.width / 2).max(30).min(area.width);
        let height = (self.notifications.len() as u16 + 2).min(area.height);
        let rect = Rect {
            x: area.x + area.width - width,
            y: area.y + area.height.saturating_sub(height + 2),
            width,
            height,
        };

        let lines: Vec<Line> = self
            .notifications
            .iter()
            .map(|n| {
                let (color, icon) = level_style(n.level);
                Line::from(vec![
                    Span::styled(format!("{} ", icon), Style::default().fg(color)),
                    Span::raw(n.message.clone()),
                ])
            })
            .collect();

        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL)),
            rect,
        );
    }
}
