//! Keyboard shortcut registry.
//!
//! Single source for the help dialog and the status bar hints.

use crossterm::event::KeyCode;

#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: KeyCode,
    /// Alternative key, e.g. an arrow for a vim key
    pub alt_key: Option<KeyCode>,
    pub description: &'static str,
    pub category: ShortcutCategory,
    pub context: ShortcutContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutCategory {
    General,
    Navigation,
    Actions,
}

/// Screen where a shortcut is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutContext {
    Board,
    Workspace,
    ActionForm,
}

impl ShortcutCategory {
    pub fn all() -> &'static [ShortcutCategory] {
        &[
            ShortcutCategory::General,
            ShortcutCategory::Navigation,
            ShortcutCategory::Actions,
        ]
    }
}

impl ShortcutContext {
    pub fn display_name(&self) -> &'static str {
        match self {
            ShortcutContext::Board => "看板",
            ShortcutContext::Workspace => "工作區",
            ShortcutContext::ActionForm => "行動表單",
        }
    }

    pub fn all() -> &'static [ShortcutContext] {
        &[
            ShortcutContext::Board,
            ShortcutContext::Workspace,
            ShortcutContext::ActionForm,
        ]
    }
}

impl Shortcut {
    /// e.g. "q", "Tab", "j/↓"
    pub fn key_display(&self) -> String {
        let primary = format_keycode(&self.key);
        match &self.alt_key {
            Some(alt) => format!("{}/{}", primary, format_keycode(alt)),
            None => primary,
        }
    }

    pub fn key_display_padded(&self) -> String {
        format!("{:<9}", self.key_display())
    }
}

fn format_keycode(key: &KeyCode) -> String {
    match key {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => format!("{:?}", key),
    }
}

const fn shortcut(
    key: KeyCode,
    alt_key: Option<KeyCode>,
    description: &'static str,
    category: ShortcutCategory,
    context: ShortcutContext,
) -> Shortcut {
    Shortcut {
        key,
        alt_key,
        description,
        category,
        context,
    }
}

use ShortcutCategory::{Actions, General, Navigation};
use ShortcutContext::{ActionForm, Board, Workspace};

pub static SHORTCUTS: &[Shortcut] = &[
    // Board
    shortcut(KeyCode::Char('q'), None, "離開", General, Board),
    shortcut(KeyCode::Char('?'), None, "顯示說明", General, Board),
    shortcut(KeyCode::Char('r'), None, "重新整理", General, Board),
    shortcut(KeyCode::Char('v'), None, "切換看板 / 清單", General, Board),
    shortcut(KeyCode::Char('b'), None, "切換側欄", General, Board),
    shortcut(KeyCode::Char('h'), Some(KeyCode::Left), "上一欄", Navigation, Board),
    shortcut(KeyCode::Char('l'), Some(KeyCode::Right), "下一欄", Navigation, Board),
    shortcut(KeyCode::Char('j'), Some(KeyCode::Down), "下移", Navigation, Board),
    shortcut(KeyCode::Char('k'), Some(KeyCode::Up), "上移", Navigation, Board),
    shortcut(KeyCode::Char('n'), Some(KeyCode::PageDown), "下一頁 (清單)", Navigation, Board),
    shortcut(KeyCode::Char('p'), Some(KeyCode::PageUp), "上一頁 (清單)", Navigation, Board),
    shortcut(KeyCode::Enter, None, "開啟工作區", Actions, Board),
    shortcut(KeyCode::Char('a'), None, "執行建議行動", Actions, Board),
    shortcut(KeyCode::Char('x'), None, "關閉最新通知", Actions, Board),
    // Workspace
    shortcut(KeyCode::Esc, Some(KeyCode::Char('q')), "返回看板", General, Workspace),
    shortcut(KeyCode::Char('a'), None, "執行建議行動", Actions, Workspace),
    shortcut(KeyCode::Char('A'), None, "選擇其他行動", Actions, Workspace),
    shortcut(KeyCode::Char('r'), None, "重新載入", Actions, Workspace),
    shortcut(KeyCode::Char('j'), Some(KeyCode::Down), "捲動", Navigation, Workspace),
    // Action form
    shortcut(KeyCode::Tab, Some(KeyCode::BackTab), "切換欄位", Navigation, ActionForm),
    shortcut(KeyCode::Char(' '), None, "切換選項", Actions, ActionForm),
    shortcut(KeyCode::Enter, None, "送出", Actions, ActionForm),
    shortcut(KeyCode::Esc, None, "取消", Actions, ActionForm),
];

pub fn shortcuts_for_context(context: ShortcutContext) -> impl Iterator<Item = &'static Shortcut> {
    SHORTCUTS.iter().filter(move |s| s.context == context)
}

pub fn shortcuts_by_category_for_context(
    context: ShortcutContext,
) -> Vec<(ShortcutCategory, Vec<&'static Shortcut>)> {
    let mut result = Vec::new();
    for category in ShortcutCategory::all() {
        let shortcuts: Vec<&Shortcut> = shortcuts_for_context(context)
            .filter(|s| s.category == *category)
            .collect();
        if !shortcuts.is_empty() {
            result.push((*category, shortcuts));
        }
    }
    result
}

/// Compact one-line hint for the status bar
pub fn status_hint(context: ShortcutContext) -> String {
    shortcuts_for_context(context)
        .filter(|s| s.category != ShortcutCategory::Navigation)
        .map(|s| format!("[{}]{}", format_keycode(&s.key), s.description))
        .collect::<Vec<_>>()
        .join(" ")
}
