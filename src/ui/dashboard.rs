use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::paginated_list::Pager;
use super::panels::priority_color;
use crate::config::Config;
use crate::process::queue::{DashboardStats, KanbanBoard, KanbanColumn, QueueItem};
use crate::process::{BoardLayout, ProcessKey};

const SIDEBAR_WIDTH: u16 = 22;

/// Kanban and list presentation of the process queues
pub struct Dashboard {
    pub board: KanbanBoard,
    pub stats: DashboardStats,
    pub layout: BoardLayout,
    processes: Vec<ProcessKey>,
    focused_column: usize,
    column_states: Vec<ListState>,
    pager: Pager,
}

fn card_lines(item: &QueueItem, max_width: usize) -> Vec<Line<'static>> {
    let color = priority_color(item.decision.priority);
    let title: String = item.title.chars().take(max_width).collect();

    let mut detail = vec![
        Span::raw("  "),
        Span::styled(
            item.decision.blocked_label(item.process).into_owned(),
            Style::default().fg(Color::Gray),
        ),
    ];
    if let Some(warning) = item.decision.overdue_warning() {
        detail.push(Span::styled(
            format!(" · {}", warning),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(due) = item.due_date {
        detail.push(Span::styled(
            format!(" · {}", due.format("%m/%d")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(color)),
            Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(detail),
    ]
}

impl Dashboard {
    pub fn new(config: &Config) -> Self {
        let processes = config.kanban.processes.clone();
        Self {
            board: KanbanBoard::empty(),
            stats: DashboardStats::default(),
            layout: config.ui.layout,
            column_states: processes.iter().map(|_| ListState::default()).collect(),
            processes,
            focused_column: 0,
            pager: Pager::new(config.kanban.page_size.min(30)),
        }
    }

    pub fn processes(&self) -> &[ProcessKey] {
        &self.processes
    }

    /// Replace the board, keeping selections within range
    pub fn set_board(&mut self, board: KanbanBoard) {
        self.board = board;
        for (i, process) in self.processes.iter().enumerate() {
            let len = self.board.column(*process).map_or(0, |c| c.items.len());
            let state = &mut self.column_states[i];
            match state.selected() {
                _ if len == 0 => state.select(None),
                Some(sel) if sel >= len => state.select(Some(len - 1)),
                None => state.select(Some(0)),
                _ => {}
            }
        }
        self.pager.set_len(self.board.total_items());
    }

    pub fn set_stats(&mut self, stats: DashboardStats) {
        self.stats = stats;
    }

    pub fn toggle_layout(&mut self) {
        self.layout = self.layout.toggle();
    }

    pub fn focused_process(&self) -> Option<ProcessKey> {
        self.processes.get(self.focused_column).copied()
    }

    pub fn focus_next(&mut self) {
        if !self.processes.is_empty() {
            self.focused_column = (self.focused_column + 1) % self.processes.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.processes.is_empty() {
            self.focused_column =
                (self.focused_column + self.processes.len() - 1) % self.processes.len();
        }
    }

    fn focused_len(&self) -> usize {
        self.focused_process()
            .and_then(|p| self.board.column(p))
            .map_or(0, |c| c.items.len())
    }

    pub fn select_next(&mut self) {
        match self.layout {
            BoardLayout::List => self.pager.select_next(),
            BoardLayout::Kanban => {
                let len = self.focused_len();
                if len > 0 {
                    let state = &mut self.column_states[self.focused_column];
                    let i = state.selected().map_or(0, |i| (i + 1) % len);
                    state.select(Some(i));
                }
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.layout {
            BoardLayout::List => self.pager.select_prev(),
            BoardLayout::Kanban => {
                let len = self.focused_len();
                if len > 0 {
                    let state = &mut self.column_states[self.focused_column];
                    let i = state.selected().map_or(0, |i| (i + len - 1) % len);
                    state.select(Some(i));
                }
            }
        }
    }

    pub fn next_page(&mut self) {
        self.pager.next_page();
    }

    pub fn prev_page(&mut self) {
        self.pager.prev_page();
    }

    pub fn selected_item(&self) -> Option<&QueueItem> {
        match self.layout {
            BoardLayout::List => {
                if self.pager.is_empty() {
                    return None;
                }
                self.board
                    .as_list()
                    .get(self.pager.selected_index())
                    .copied()
            }
            BoardLayout::Kanban => {
                let process = self.focused_process()?;
                let column = self.board.column(process)?;
                let index = self.column_states.get(self.focused_column)?.selected()?;
                column.items.get(index)
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, sidebar_open: bool) {
        let area = if sidebar_open && area.width > SIDEBAR_WIDTH * 3 {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
                .split(area);
            self.render_sidebar(frame, chunks[0]);
            chunks[1]
        } else {
            area
        };

        match self.layout {
            BoardLayout::Kanban => self.render_kanban(frame, area),
            BoardLayout::List => self.render_list(frame, area),
        }
    }

    fn render_sidebar(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = self
            .processes
            .iter()
            .enumerate()
            .map(|(i, process)| {
                let s = self.stats.get(*process);
                let style = if i == self.focused_column && self.layout == BoardLayout::Kanban {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let mut spans = vec![Span::styled(
                    format!("{} {:>3}", process.display_name(), s.total),
                    style,
                )];
                if s.overdue > 0 {
                    spans.push(Span::styled(
                        format!(" !{}", s.overdue),
                        Style::default().fg(Color::Red),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines).block(Block::default().title(" 流程 ").borders(Borders::ALL)),
            area,
        );
    }

    fn render_kanban(&mut self, frame: &mut Frame, area: Rect) {
        if self.processes.is_empty() {
            return;
        }

        let constraints: Vec<Constraint> = self
            .processes
            .iter()
            .map(|_| Constraint::Ratio(1, self.processes.len() as u32))
            .collect();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (i, process) in self.processes.iter().enumerate() {
            let focused = i == self.focused_column;
            let border_style = if focused {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };

            let fallback = KanbanColumn {
                process: *process,
                items: Vec::new(),
                error: None,
            };
            let column = self.board.column(*process).unwrap_or(&fallback);
            let block = Block::default()
                .title(format!(" {} ", column.title()))
                .borders(Borders::ALL)
                .border_style(border_style);

            if let Some(ref error) = column.error {
                let message = Paragraph::new(vec![
                    Line::from(Span::styled("載入失敗", Style::default().fg(Color::Red))),
                    Line::from(Span::styled(error.clone(), Style::default().fg(Color::DarkGray))),
                    Line::from(""),
                    Line::from(Span::styled("[r] 重試", Style::default().fg(Color::Yellow))),
                ])
                .wrap(Wrap { trim: true })
                .block(block);
                frame.render_widget(message, chunks[i]);
                continue;
            }

            let max_width = (chunks[i].width as usize).saturating_sub(6);
            let items: Vec<ListItem> = column
                .items
                .iter()
                .map(|item| ListItem::new(card_lines(item, max_width)))
                .collect();

            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
            frame.render_stateful_widget(list, chunks[i], &mut self.column_states[i]);
        }
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let all = self.board.as_list();
        let rows: Vec<Row> = all[self.pager.page_range()]
            .iter()
            .map(|item| {
                let d = &item.decision;
                Row::new(vec![
                    Cell::from(item.process.display_name()),
                    Cell::from(item.title.clone()),
                    Cell::from(d.blocked_label(item.process).into_owned()),
                    Cell::from(d.owner.as_ref().map(|o| o.label().to_string()).unwrap_or_default()),
                    Cell::from(Span::styled(
                        d.priority.label(),
                        Style::default().fg(priority_color(d.priority)),
                    )),
                    Cell::from(item.due_date.map(|d| d.to_string()).unwrap_or_default()),
                    Cell::from(Span::styled(
                        d.overdue_warning().unwrap_or_default(),
                        Style::default().fg(Color::Red),
                    )),
                ])
            })
            .collect();

        let header = Row::new(vec!["流程", "對象", "卡關原因", "負責", "優先", "到期", "逾期"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(11),
                Constraint::Min(10),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .title(format!(" 待辦清單 ({}) ", all.len()))
                .borders(Borders::ALL),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        state.select(self.pager.selected_in_page());
        frame.render_stateful_widget(table, chunks[0], &mut state);
        frame.render_widget(Paragraph::new(self.pager.footer_line()), chunks[1]);
    }
}
