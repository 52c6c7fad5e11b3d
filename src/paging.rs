use std::time::Duration;

pub const DASHBOARD_PAGE_SIZE: usize = 10;
pub const LOAD_MORE_DELAY: Duration = Duration::from_millis(500);

/// A growing prefix over a list: page `n` shows the first `n * page_size` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    page_size: usize,
}

impl PageWindow {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    #[cfg(test)]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn advance(&mut self) {
        self.page += 1;
    }

    pub fn go_to(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn visible_len(&self, total: usize) -> usize {
        self.page.saturating_mul(self.page_size).min(total)
    }

    pub fn displayed<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible_len(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible_len(total) < total
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DASHBOARD_PAGE_SIZE)
    }
}
