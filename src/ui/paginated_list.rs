//! Page and selection bookkeeping for the list layout.
//!
//! The pager only tracks indices; the rows themselves stay in the board so a
//! refresh never has to copy them.

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    len: usize,
    page: usize,
    page_size: usize,
    /// Index within the current page
    selected: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            len: 0,
            page: 0,
            page_size: page_size.max(1),
            selected: 0,
        }
    }

    /// Update the item count, keeping the selection when it still fits
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.selected_index() >= len {
            self.page = 0;
            self.selected = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        if self.len == 0 {
            1
        } else {
            self.len.div_ceil(self.page_size)
        }
    }

    /// 1-indexed for display
    pub fn current_page(&self) -> usize {
        self.page + 1
    }

    /// Global index range of the current page
    pub fn page_range(&self) -> std::ops::Range<usize> {
        let start = (self.page * self.page_size).min(self.len);
        let end = (start + self.page_size).min(self.len);
        start..end
    }

    pub fn selected_in_page(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn selected_index(&self) -> usize {
        self.page * self.page_size + self.selected
    }

    pub fn select_next(&mut self) {
        let page_items = self.page_range().len();
        if page_items == 0 {
            return;
        }

        if self.selected + 1 < page_items {
            self.selected += 1;
        } else if self.page + 1 < self.total_pages() {
            self.page += 1;
            self.selected = 0;
        } else {
            self.page = 0;
            self.selected = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.is_empty() {
            return;
        }

        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.page = if self.page > 0 {
                self.page - 1
            } else {
                self.total_pages() - 1
            };
            self.selected = self.page_range().len().saturating_sub(1);
        }
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.total_pages() {
            self.page += 1;
            self.selected = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.selected = 0;
        }
    }

    pub fn footer_line(&self) -> Line<'static> {
        if self.total_pages() <= 1 {
            Line::from(Span::styled(
                format!("{} 筆", self.len),
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::from(vec![
                Span::styled(
                    format!("第 {}/{} 頁", self.current_page(), self.total_pages()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("  共 {} 筆  ", self.len),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled("[n]", Style::default().fg(Color::Yellow)),
                Span::styled(" 下一頁  ", Style::default().fg(Color::DarkGray)),
                Span::styled("[p]", Style::default().fg(Color::Yellow)),
                Span::styled(" 上一頁", Style::default().fg(Color::DarkGray)),
            ])
        }
    }
}
