//! Page arithmetic for the transactions table.
//!
//! Pages are 1-based. The service is asked for `limit = page_size` rows at
//! `offset = (page - 1) * page_size`; a next page exists while
//! `page * page_size < total_rows`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
    pub current_page: i64,
    pub page_size: i64,
    pub total_rows: i64,
}

impl PageState {
    pub fn new(page_size: i64) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_rows: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.current_page - 1).saturating_mul(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.current_page.saturating_mul(self.page_size) < self.total_rows
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    /// Advance one page if there is one. Returns whether the page changed.
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page if possible. Returns whether the page changed.
    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn set_total(&mut self, total_rows: i64) {
        self.total_rows = total_rows.max(0);
    }

    pub fn total_pages(&self) -> i64 {
        self.total_rows / self.page_size + i64::from(self.total_rows % self.page_size != 0)
    }

    /// "Page 2 of 5". An empty result still reads as one page.
    pub fn label(&self) -> String {
        format!(
            "Page {} of {}",
            self.current_page,
            self.total_pages().max(1)
        )
    }
}
