//! Payload form for actions that need input, and the action picker.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use serde_json::Value;
use tui_textarea::TextArea;

use super::dialogs::centered_rect;
use crate::process::payload::{payload_fields, payload_from_pairs, PaymentMethod};
use crate::process::{ProcessAction, ProcessKey};

fn field_label(name: &str) -> &str {
    match name {
        "payment_method" => "付款方式",
        "notes" => "備註",
        "reason" => "原因",
        "invoice_type" => "發票類型",
        "buyer_name" => "買受人",
        "buyer_tax_id" => "統一編號",
        "customer_id" => "客戶編號",
        "status" => "狀態",
        "deduction_amount" => "扣款金額",
        "payment_reference" => "付款參考",
        "paid_at" => "付款日期 (YYYY-MM-DD)",
        "signed_at" => "簽署日期 (YYYY-MM-DD)",
        "force" => "覆蓋既有草稿",
        "value" => "標記為",
        other => other,
    }
}

enum InputKind {
    Text(Box<TextArea<'static>>),
    Select {
        options: Vec<&'static str>,
        selected: usize,
    },
    Toggle(bool),
}

struct FormInput {
    name: &'static str,
    required: bool,
    kind: InputKind,
}

impl FormInput {
    fn new(name: &'static str, required: bool) -> Self {
        let kind = match name {
            "payment_method" => InputKind::Select {
                options: PaymentMethod::all().iter().map(PaymentMethod::as_str).collect(),
                selected: 0,
            },
            "invoice_type" => InputKind::Select {
                options: vec!["personal", "company"],
                selected: 0,
            },
            "force" => InputKind::Toggle(false),
            "value" => InputKind::Toggle(true),
            _ => InputKind::Text(Box::default()),
        };
        Self {
            name,
            required,
            kind,
        }
    }

    fn value(&self) -> String {
        match &self.kind {
            InputKind::Text(textarea) => textarea.lines().join(" "),
            InputKind::Select { options, selected } => {
                options.get(*selected).copied().unwrap_or_default().to_string()
            }
            InputKind::Toggle(on) => on.to_string(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match &mut self.kind {
            InputKind::Text(textarea) => {
                textarea.input(key);
            }
            InputKind::Select { options, selected } => match key.code {
                KeyCode::Left | KeyCode::Up => {
                    *selected = (*selected + options.len() - 1) % options.len();
                }
                KeyCode::Right | KeyCode::Down | KeyCode::Char(' ') => {
                    *selected = (*selected + 1) % options.len();
                }
                _ => {}
            },
            InputKind::Toggle(on) => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                    *on = !*on;
                }
            }
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let border_color = if focused { Color::Cyan } else { Color::Gray };
        let title = if self.required {
            format!(" {} * ", field_label(self.name))
        } else {
            format!(" {} ", field_label(self.name))
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));

        match &mut self.kind {
            InputKind::Text(textarea) => {
                textarea.set_cursor_line_style(Style::default());
                textarea.set_cursor_style(if focused {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                });
                textarea.set_block(block);
                frame.render_widget(&**textarea, area);
            }
            InputKind::Select { options, selected } => {
                let spans: Vec<Span> = options
                    .iter()
                    .enumerate()
                    .map(|(i, opt)| {
                        if i == *selected {
                            Span::styled(
                                format!("[{}] ", opt),
                                Style::default()
                                    .fg(Color::Cyan)
                                    .add_modifier(Modifier::BOLD),
                            )
                        } else {
                            Span::styled(format!(" {}  ", opt), Style::default().fg(Color::Gray))
                        }
                    })
                    .collect();
                frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
            }
            InputKind::Toggle(on) => {
                let text = if *on { "[x] 是" } else { "[ ] 否" };
                frame.render_widget(Paragraph::new(text).block(block), area);
            }
        }
    }
}

/// What the app should do after a key press in the form
#[derive(Debug, Clone, PartialEq)]
pub enum FormResult {
    Continue,
    Cancel,
    Submit(Value),
}

/// Collects the payload for one action on one entity
pub struct ActionForm {
    pub action: ProcessAction,
    pub entity_id: i64,
    inputs: Vec<FormInput>,
    focused: usize,
    pub error: Option<String>,
}

impl ActionForm {
    /// `None` when the action takes no input
    pub fn for_action(action: ProcessAction, entity_id: i64) -> Option<Self> {
        let fields = payload_fields(action);
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            action,
            entity_id,
            inputs: fields
                .iter()
                .map(|(name, required)| FormInput::new(name, *required))
                .collect(),
            focused: 0,
            error: None,
        })
    }

    pub fn focused_field(&self) -> &str {
        self.inputs[self.focused].name
    }

    pub fn payload(&self) -> Value {
        let values: Vec<(&str, String)> = self
            .inputs
            .iter()
            .map(|input| (input.name, input.value()))
            .collect();
        payload_from_pairs(values.iter().map(|(name, value)| (*name, value.as_str())))
    }

    fn missing_required(&self) -> Option<&'static str> {
        self.inputs
            .iter()
            .find(|input| input.required && input.value().trim().is_empty())
            .map(|input| input.name)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormResult {
        match key.code {
            KeyCode::Esc => FormResult::Cancel,
            KeyCode::Tab => {
                self.focused = (self.focused + 1) % self.inputs.len();
                FormResult::Continue
            }
            KeyCode::BackTab => {
                self.focused = (self.focused + self.inputs.len() - 1) % self.inputs.len();
                FormResult::Continue
            }
            KeyCode::Enter if !key.modifiers.contains(KeyModifiers::ALT) => {
                if let Some(name) = self.missing_required() {
                    self.error = Some(format!("請填寫{}", field_label(name)));
                    return FormResult::Continue;
                }
                FormResult::Submit(self.payload())
            }
            _ => {
                self.error = None;
                self.inputs[self.focused].handle_key(key);
                FormResult::Continue
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);

        let outer = Block::default()
            .title(format!(" {} #{} ", self.action.label(), self.entity_id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let mut constraints: Vec<Constraint> =
            self.inputs.iter().map(|_| Constraint::Length(3)).collect();
        constraints.push(Constraint::Min(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        let focused = self.focused;
        for (i, input) in self.inputs.iter_mut().enumerate() {
            input.render(frame, chunks[i], i == focused);
        }

        let footer = match self.error {
            Some(ref e) => Line::from(Span::styled(e.clone(), Style::default().fg(Color::Red))),
            None => Line::from(Span::styled(
                "[Tab] 切換欄位  [Enter] 送出  [Esc] 取消",
                Style::default().fg(Color::DarkGray),
            )),
        };
        frame.render_widget(Paragraph::new(footer), chunks[self.inputs.len()]);
    }
}

/// Pick any action of a workflow
pub struct ActionMenu {
    pub process: ProcessKey,
    pub entity_id: i64,
    actions: Vec<ProcessAction>,
    state: ListState,
}

impl ActionMenu {
    pub fn new(process: ProcessKey, entity_id: i64) -> Self {
        let mut state = ListState::default();
        state.select(Some(0));
        Self {
            process,
            entity_id,
            actions: ProcessAction::for_process(process),
            state,
        }
    }

    pub fn selected(&self) -> Option<ProcessAction> {
        self.state
            .selected()
            .and_then(|i| self.actions.get(i))
            .copied()
    }

    /// `Some(action)` once the user confirms, `None` otherwise
    pub fn handle_key(&mut self, key: KeyCode) -> Option<ProcessAction> {
        let len = self.actions.len();
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.state.selected().map_or(0, |i| (i + 1) % len);
                self.state.select(Some(i));
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.state.selected().map_or(0, |i| (i + len - 1) % len);
                self.state.select(Some(i));
                None
            }
            KeyCode::Enter => self.selected(),
            _ => None,
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = centered_rect(40, 50, frame.area());
        frame.render_widget(Clear, area);

        let items: Vec<ListItem> = self
            .actions
            .iter()
            .map(|a| {
                ListItem::new(Line::from(vec![
                    Span::raw(a.label()),
                    Span::styled(
                        format!("  {}", a.code()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} 行動 ", self.process.display_name()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{PaymentAction, SigningAction, TerminationAction};
    use serde_json::json;

    fn press(form: &mut ActionForm, code: KeyCode) -> FormResult {
        form.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(form: &mut ActionForm, text: &str) {
        for c in text.chars() {
            press(form, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_actions_without_fields_need_no_form() {
        assert!(ActionForm::for_action(ProcessAction::Signing(SigningAction::SendForSigning), 1)
            .is_none());
    }

    #[test]
    fn test_record_payment_form() {
        let mut form =
            ActionForm::for_action(ProcessAction::Payment(PaymentAction::RecordPayment), 42)
                .unwrap();
        assert_eq!(form.focused_field(), "payment_method");
        press(&mut form, KeyCode::Right);
        press(&mut form, KeyCode::Tab);
        type_text(&mut form, "ref-123");

        assert_eq!(
            press(&mut form, KeyCode::Enter),
            FormResult::Submit(json!({"payment_method": "cash", "notes": "ref-123"}))
        );
    }

    #[test]
    fn test_required_field_blocks_submit() {
        let mut form =
            ActionForm::for_action(ProcessAction::Payment(PaymentAction::WaivePayment), 3)
                .unwrap();
        assert_eq!(press(&mut form, KeyCode::Enter), FormResult::Continue);
        assert_eq!(form.error.as_deref(), Some("請填寫原因"));

        type_text(&mut form, "goodwill");
        assert!(form.error.is_none());
        assert_eq!(
            press(&mut form, KeyCode::Enter),
            FormResult::Submit(json!({"reason": "goodwill"}))
        );
    }

    #[test]
    fn test_numeric_field_is_typed() {
        let mut form = ActionForm::for_action(
            ProcessAction::Termination(TerminationAction::SettleDeposit),
            9,
        )
        .unwrap();
        type_text(&mut form, "1200");
        assert_eq!(form.payload(), json!({"deduction_amount": 1200}));
        assert_eq!(press(&mut form, KeyCode::Esc), FormResult::Cancel);
    }

    #[test]
    fn test_action_menu() {
        let mut menu = ActionMenu::new(ProcessKey::Signing, 5);
        assert_eq!(menu.handle_key(KeyCode::Down), None);
        assert_eq!(
            menu.handle_key(KeyCode::Enter),
            Some(ProcessAction::Signing(SigningAction::MarkSigned))
        );
        menu.handle_key(KeyCode::Up);
        menu.handle_key(KeyCode::Up);
        assert_eq!(
            menu.selected(),
            Some(ProcessAction::Signing(SigningAction::ReviewContract))
        );
    }
}
