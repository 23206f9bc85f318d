use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::config::Config;
use crate::context::{AppContext, NotificationLevel};
use crate::process::payload::payload_fields;
use crate::process::{
    ActionDispatcher, ActionOutcome, DashboardStats, DecisionController, DecisionRecord,
    DispatchError, KanbanBoard, ProcessAction, ProcessKey, QueueFilter, QueueService,
    WorkspaceLoader, WorkspaceState,
};
use crate::ui::action_form::{ActionForm, ActionMenu, FormResult};
use crate::ui::dialogs::HelpDialog;
use crate::ui::keybindings::{status_hint, ShortcutContext};
use crate::ui::panels::{HeaderBar, StatusBar, ToastStack};
use crate::ui::terminal::TerminalSession;
use crate::ui::{Dashboard, WorkspaceView};

/// Results of background work, delivered to the UI loop
#[derive(Debug)]
pub enum AppEvent {
    BoardLoaded(KanbanBoard),
    StatsLoaded(Result<DashboardStats, String>),
    WorkspaceLoaded {
        process: ProcessKey,
        entity_id: i64,
        state: WorkspaceState,
    },
    ActionFinished {
        process: ProcessKey,
        entity_id: i64,
        action_key: String,
        /// `None` when the trigger was ignored
        result: Option<Result<ActionOutcome, DispatchError>>,
    },
}

/// Popups that take the keyboard
enum Modal {
    Menu {
        menu: ActionMenu,
        decision: DecisionRecord,
    },
    Form {
        form: ActionForm,
        decision: DecisionRecord,
    },
}

pub struct App {
    config: Config,
    context: AppContext,
    queue: QueueService,
    loader: WorkspaceLoader,
    controller: Arc<DecisionController>,
    filter: QueueFilter,
    dashboard: Dashboard,
    workspace: Option<WorkspaceView>,
    modal: Option<Modal>,
    help_dialog: HelpDialog,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    refreshing: bool,
    /// A refresh was asked for while one was running
    refresh_pending: bool,
    last_poll: Instant,
    last_refresh: Option<DateTime<Local>>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        context: AppContext,
        filter: QueueFilter,
    ) -> Self {
        let queue = QueueService::new(backend.clone(), &config.kanban);
        let controller = DecisionController::new(ActionDispatcher::new(backend));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            dashboard: Dashboard::new(&config),
            loader: WorkspaceLoader::new(queue.clone()),
            queue,
            controller: Arc::new(controller),
            filter,
            context,
            config,
            workspace: None,
            modal: None,
            help_dialog: HelpDialog::new(),
            events_tx,
            events_rx,
            refreshing: false,
            refresh_pending: false,
            last_poll: Instant::now(),
            last_refresh: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut session = TerminalSession::start()?;

        self.request_refresh();

        let tick_rate = Duration::from_millis(self.config.ui.refresh_rate_ms.max(16));
        let poll_interval = Duration::from_secs(self.config.kanban.poll_interval_secs.max(1));

        while !self.should_quit {
            session.terminal().draw(|f| self.render(f))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
            }

            self.context.prune_expired(Local::now());

            if self.last_poll.elapsed() >= poll_interval {
                self.request_refresh();
            }
        }

        info!("Console closed");
        Ok(())
    }

    fn current_filter(&self) -> QueueFilter {
        QueueFilter {
            branch_id: self.context.selected_branch().or(self.filter.branch_id),
            ..self.filter.clone()
        }
    }

    // ─── Background work ─────────────────────────────────────────────────

    fn request_refresh(&mut self) {
        self.last_poll = Instant::now();
        if self.refreshing {
            debug!("Refresh already running, queueing another");
            self.refresh_pending = true;
            return;
        }
        self.refreshing = true;

        let queue = self.queue.clone();
        let filter = self.current_filter();
        let processes = self.dashboard.processes().to_vec();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let board = queue.fetch_board(&processes, &filter).await;
            let stats = queue
                .fetch_stats(&filter)
                .await
                .map_err(|e| e.user_message());
            let _ = tx.send(AppEvent::BoardLoaded(board));
            let _ = tx.send(AppEvent::StatsLoaded(stats));
        });
    }

    fn open_workspace(&mut self, process: ProcessKey, entity_id: i64) {
        self.workspace = Some(WorkspaceView::new(process, entity_id));
        self.load_workspace(process, entity_id);
    }

    fn load_workspace(&mut self, process: ProcessKey, entity_id: i64) {
        if let Some(ref mut view) = self.workspace {
            view.state = WorkspaceState::Loading;
        }
        let loader = self.loader.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let state = loader.load(process, entity_id).await;
            let _ = tx.send(AppEvent::WorkspaceLoaded {
                process,
                entity_id,
                state,
            });
        });
    }

    fn run_action(
        &self,
        process: ProcessKey,
        entity_id: i64,
        action_key: String,
        decision: DecisionRecord,
        payload: Value,
    ) {
        let controller = self.controller.clone();
        let observer = self.context.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = controller
                .trigger(process, entity_id, &action_key, &decision, &payload, &observer)
                .await;
            let _ = tx.send(AppEvent::ActionFinished {
                process,
                entity_id,
                action_key,
                result,
            });
        });
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::BoardLoaded(board) => {
                self.refreshing = false;
                self.last_refresh = Some(board.fetched_at);
                for (process, error) in board.errors() {
                    debug!(%process, error, "Column failed to load");
                }
                self.dashboard.set_board(board);
                // The finished fetch may predate a mutation
                if self.refresh_pending {
                    self.refresh_pending = false;
                    self.request_refresh();
                }
            }
            AppEvent::StatsLoaded(Ok(stats)) => self.dashboard.set_stats(stats),
            AppEvent::StatsLoaded(Err(message)) => {
                warn!(error = %message, "Stats view unavailable, counting the board");
                let stats = DashboardStats::from_board(&self.dashboard.board);
                self.dashboard.set_stats(stats);
            }
            AppEvent::WorkspaceLoaded {
                process,
                entity_id,
                state,
            } => {
                if let Some(ref mut view) = self.workspace {
                    if !view.apply(process, entity_id, state) {
                        debug!(%process, entity_id, "Dropping stale workspace load");
                    }
                }
            }
            AppEvent::ActionFinished {
                process,
                entity_id,
                action_key,
                result,
            } => match result {
                None => {
                    self.context.add_notification(
                        NotificationLevel::Warning,
                        format!("{} 已在執行中或流程已完成", action_key),
                    );
                }
                Some(Ok(ActionOutcome::Navigate(intent))) => {
                    let link = self.config.web_link(&intent.url);
                    if link != intent.url {
                        self.context.add_notification(NotificationLevel::Info, link);
                    }
                }
                Some(Ok(ActionOutcome::Rpc { .. })) => {
                    self.request_refresh();
                    let showing = self
                        .workspace
                        .as_ref()
                        .is_some_and(|v| v.process == process && v.entity_id == entity_id);
                    if showing {
                        self.load_workspace(process, entity_id);
                    }
                }
                Some(Err(_)) => {}
            },
        }
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    /// The workflow instance keys act on: the open workspace, else the board selection
    fn target(&self) -> Option<(ProcessKey, i64, DecisionRecord)> {
        match self.workspace {
            Some(ref view) => view
                .item()
                .map(|item| (item.process, item.entity_id, item.decision.clone())),
            None => self
                .dashboard
                .selected_item()
                .map(|item| (item.process, item.entity_id, item.decision.clone())),
        }
    }

    fn trigger_primary(&mut self) {
        let Some((process, entity_id, decision)) = self.target() else {
            return;
        };
        let Some(primary) = decision.primary_action(process) else {
            self.context
                .add_notification(NotificationLevel::Info, "此流程沒有待辦行動");
            return;
        };
        match primary.action {
            Some(action) => self.open_action(action, entity_id, decision),
            // Unknown codes still go through the controller so the error surfaces
            None => self.run_action(process, entity_id, primary.code, decision, json!({})),
        }
    }

    fn open_action(&mut self, action: ProcessAction, entity_id: i64, decision: DecisionRecord) {
        match ActionForm::for_action(action, entity_id) {
            Some(form) => self.modal = Some(Modal::Form { form, decision }),
            None => self.run_action(
                action.process(),
                entity_id,
                action.code().to_string(),
                decision,
                json!({}),
            ),
        }
    }

    fn primary_loading(&self) -> bool {
        let Some((process, entity_id, decision)) = self.target() else {
            return false;
        };
        decision
            .primary_action(process)
            .is_some_and(|p| self.controller.is_loading(process, entity_id, &p.code))
    }

    // ─── Keys ────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if self.help_dialog.visible {
            self.help_dialog.visible = false;
            return;
        }

        if let Some(modal) = self.modal.take() {
            self.handle_modal_key(modal, key);
            return;
        }

        if self.workspace.is_some() {
            self.handle_workspace_key(key.code);
        } else {
            self.handle_board_key(key.code);
        }
    }

    fn handle_modal_key(&mut self, modal: Modal, key: KeyEvent) {
        match modal {
            Modal::Menu { mut menu, decision } => {
                if key.code == KeyCode::Esc {
                    return;
                }
                match menu.handle_key(key.code) {
                    Some(action) => self.open_action(action, menu.entity_id, decision),
                    None => self.modal = Some(Modal::Menu { menu, decision }),
                }
            }
            Modal::Form { mut form, decision } => match form.handle_key(key) {
                FormResult::Continue => self.modal = Some(Modal::Form { form, decision }),
                FormResult::Cancel => {}
                FormResult::Submit(payload) => self.run_action(
                    form.action.process(),
                    form.entity_id,
                    form.action.code().to_string(),
                    decision,
                    payload,
                ),
            },
        }
    }

    fn handle_workspace_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.workspace = None,
            KeyCode::Char('?') => self.help_dialog.toggle(),
            KeyCode::Char('a') => self.trigger_primary(),
            KeyCode::Char('A') => {
                if let Some((process, entity_id, decision)) = self.target() {
                    self.modal = Some(Modal::Menu {
                        menu: ActionMenu::new(process, entity_id),
                        decision,
                    });
                }
            }
            KeyCode::Char('r') => {
                if let Some((process, entity_id)) =
                    self.workspace.as_ref().map(|v| (v.process, v.entity_id))
                {
                    self.load_workspace(process, entity_id);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(ref mut view) = self.workspace {
                    view.scroll_down();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(ref mut view) = self.workspace {
                    view.scroll_up();
                }
            }
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.help_dialog.toggle(),
            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Char('v') => self.dashboard.toggle_layout(),
            KeyCode::Char('b') => {
                self.context.toggle_sidebar();
            }
            KeyCode::Char('h') | KeyCode::Left => self.dashboard.focus_prev(),
            KeyCode::Char('l') | KeyCode::Right => self.dashboard.focus_next(),
            KeyCode::Char('j') | KeyCode::Down => self.dashboard.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.dashboard.select_prev(),
            KeyCode::Char('n') | KeyCode::PageDown => self.dashboard.next_page(),
            KeyCode::Char('p') | KeyCode::PageUp => self.dashboard.prev_page(),
            KeyCode::Enter => {
                if let Some((process, entity_id)) = self
                    .dashboard
                    .selected_item()
                    .map(|i| (i.process, i.entity_id))
                {
                    self.open_workspace(process, entity_id);
                }
            }
            KeyCode::Char('a') => self.trigger_primary(),
            KeyCode::Char('x') => {
                if let Some(latest) = self.context.latest_notification() {
                    self.context.dismiss_notification(latest.id);
                }
            }
            _ => {}
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(5),
                Constraint::Length(2),
            ])
            .split(frame.area());

        let session = self.context.session();
        HeaderBar {
            stats: &self.dashboard.stats,
            branch: self.current_filter().branch_id,
            user: session.as_ref().map(|s| s.user.as_str()),
            refreshing: self.refreshing,
        }
        .render(frame, chunks[0]);

        let loading = self.primary_loading();
        match self.workspace {
            Some(ref view) => view.render(frame, chunks[1], loading),
            None => self
                .dashboard
                .render(frame, chunks[1], self.context.sidebar_open()),
        }

        let context = if matches!(self.modal, Some(Modal::Form { .. })) {
            ShortcutContext::ActionForm
        } else if self.workspace.is_some() {
            ShortcutContext::Workspace
        } else {
            ShortcutContext::Board
        };
        let hint = status_hint(context);
        StatusBar {
            hint: &hint,
            last_refresh: self.last_refresh.map(|t| t.format("%H:%M:%S").to_string()),
        }
        .render(frame, chunks[2]);

        let notifications = self.context.notifications();
        ToastStack {
            notifications: &notifications,
        }
        .render(frame, chunks[1]);

        match self.modal {
            Some(Modal::Menu { ref mut menu, .. }) => menu.render(frame),
            Some(Modal::Form { ref mut form, .. }) => form.render(frame),
            None => {}
        }
        self.help_dialog.render(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crossterm::event::KeyModifiers;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    async fn next_event(app: &mut App) {
        let event = app.events_rx.recv().await.expect("event");
        app.handle_event(event);
    }

    fn config(processes: Vec<ProcessKey>) -> Config {
        let mut config = Config::default();
        config.kanban.processes = processes;
        config
    }

    fn payment_backend() -> Arc<MockBackend> {
        let backend = Arc::new(MockBackend::new());
        backend.set_rows(
            "v_payment_queue",
            vec![json!({
                "payment_id": 42,
                "customer_name": "Acme",
                "blocked_by": "overdue",
                "priority": "urgent",
                "is_overdue": true,
                "overdue_days": 3
            })],
        );
        backend
    }

    fn app_with(backend: Arc<MockBackend>, processes: Vec<ProcessKey>) -> App {
        App::new(
            config(processes),
            backend,
            AppContext::new(5, 60),
            QueueFilter::default(),
        )
    }

    #[tokio::test]
    async fn test_refresh_fills_board_and_stats() {
        let backend = payment_backend();
        let mut app = app_with(backend, vec![ProcessKey::Payment]);

        app.request_refresh();
        assert!(app.refreshing);
        next_event(&mut app).await;
        next_event(&mut app).await;

        assert!(!app.refreshing);
        assert_eq!(app.dashboard.board.total_items(), 1);
        assert_eq!(
            app.dashboard.selected_item().map(|i| i.entity_id),
            Some(42)
        );
        assert!(app.last_refresh.is_some());
    }

    #[tokio::test]
    async fn test_primary_action_without_input_runs_and_refreshes() {
        let backend = payment_backend();
        backend.respond("crm_send_payment_reminder", json!({"success": true}));
        let mut app = app_with(backend.clone(), vec![ProcessKey::Payment]);

        app.request_refresh();
        next_event(&mut app).await;
        next_event(&mut app).await;

        press(&mut app, KeyCode::Char('a'));
        assert!(app.modal.is_none());
        next_event(&mut app).await;

        assert_eq!(
            backend.tool_calls(),
            vec![(
                "crm_send_payment_reminder".to_string(),
                json!({"payment_id": 42})
            )]
        );
        let latest = app.context.latest_notification().unwrap();
        assert_eq!(latest.level, NotificationLevel::Success);
        assert!(app.refreshing);
    }

    #[tokio::test]
    async fn test_action_during_refresh_queues_another_fetch() {
        let backend = payment_backend();
        let mut app = app_with(backend.clone(), vec![ProcessKey::Payment]);

        app.request_refresh();
        app.handle_event(AppEvent::ActionFinished {
            process: ProcessKey::Payment,
            entity_id: 42,
            action_key: "SEND_REMINDER".to_string(),
            result: Some(Ok(ActionOutcome::Rpc {
                tool: "crm_send_payment_reminder".to_string(),
                data: json!({"success": true}),
            })),
        });
        assert!(app.refresh_pending);

        // First board arrives and starts the queued fetch
        next_event(&mut app).await;
        assert!(app.refreshing);
        assert!(!app.refresh_pending);
        for _ in 0..3 {
            next_event(&mut app).await;
        }
        assert!(!app.refreshing);

        let board_fetches = backend
            .calls()
            .iter()
            .filter(|c| matches!(c, crate::backend::RecordedCall::Table { table, .. } if table == "v_payment_queue"))
            .count();
        assert_eq!(board_fetches, 2);
    }

    #[tokio::test]
    async fn test_form_actions_open_a_form() {
        let backend = payment_backend();
        backend.respond("crm_record_payment", json!({"success": true}));
        let mut app = app_with(backend.clone(), vec![ProcessKey::Payment]);

        app.request_refresh();
        next_event(&mut app).await;
        next_event(&mut app).await;

        press(&mut app, KeyCode::Enter);
        assert!(app.workspace.is_some());
        next_event(&mut app).await;
        assert!(app.workspace.as_ref().unwrap().item().is_some());

        press(&mut app, KeyCode::Char('A'));
        assert!(matches!(app.modal, Some(Modal::Menu { .. })));
        // First payment action is RECORD_PAYMENT, which takes input
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.modal, Some(Modal::Form { .. })));

        press(&mut app, KeyCode::Enter);
        assert!(app.modal.is_none());
        next_event(&mut app).await;

        let calls = backend.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "crm_record_payment");
        assert_eq!(calls[0].1["payment_method"], json!("bank_transfer"));
    }

    #[tokio::test]
    async fn test_escape_closes_modal_then_workspace() {
        let backend = payment_backend();
        let mut app = app_with(backend, vec![ProcessKey::Payment]);
        app.open_workspace(ProcessKey::Payment, 42);
        next_event(&mut app).await;

        press(&mut app, KeyCode::Char('A'));
        press(&mut app, KeyCode::Esc);
        assert!(app.modal.is_none());
        assert!(app.workspace.is_some());

        press(&mut app, KeyCode::Esc);
        assert!(app.workspace.is_none());
    }

    #[tokio::test]
    async fn test_navigation_adds_full_link() {
        let backend = Arc::new(MockBackend::new());
        backend.set_rows(
            "v_signing_queue",
            vec![json!({"contract_id": 4, "blocked_by": "pending_review", "action_key": "REVIEW_CONTRACT"})],
        );
        let mut config = config(vec![ProcessKey::Signing]);
        config.ui.web_base_url = Some("https://crm.example.com/".to_string());
        let mut app = App::new(
            config,
            backend.clone(),
            AppContext::new(5, 60),
            QueueFilter::default(),
        );

        app.request_refresh();
        next_event(&mut app).await;
        next_event(&mut app).await;

        press(&mut app, KeyCode::Char('a'));
        next_event(&mut app).await;

        assert!(backend.tool_calls().is_empty());
        let latest = app.context.latest_notification().unwrap();
        assert_eq!(latest.message, "https://crm.example.com/contracts/4");
    }

    #[tokio::test]
    async fn test_board_keys() {
        let backend = payment_backend();
        let mut app = app_with(backend, vec![ProcessKey::Payment]);
        let sidebar = app.context.sidebar_open();

        press(&mut app, KeyCode::Char('b'));
        assert_ne!(app.context.sidebar_open(), sidebar);

        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.dashboard.layout, crate::process::BoardLayout::List);

        press(&mut app, KeyCode::Char('?'));
        assert!(app.help_dialog.visible);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
