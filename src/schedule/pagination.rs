use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 100;
const WINDOW: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page {page} is outside 1..={total_pages}")]
    OutOfRange { page: u32, total_pages: u32 },
}

/// Server-side pagination state. Changing page means refetching that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    current_page: u32,
    items_per_page: u32,
    total_count: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Pagination {
    pub fn new(items_per_page: u32) -> Self {
        Self {
            current_page: 1,
            items_per_page: items_per_page.clamp(1, MAX_PER_PAGE),
            total_count: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn items_per_page(&self) -> u32 {
        self.items_per_page
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        self.total_count.div_ceil(self.items_per_page as u64) as u32
    }

    /// No controls are rendered when everything fits on one page.
    pub fn shows_controls(&self) -> bool {
        self.total_count > self.items_per_page as u64
    }

    /// At most five consecutive page numbers, centred on the current page
    /// and clamped to `1..=total_pages`.
    pub fn page_window(&self) -> Vec<u32> {
        let total = self.total_pages();
        if total == 0 {
            return Vec::new();
        }
        let half = WINDOW / 2;
        let mut start = self.current_page.saturating_sub(half).max(1);
        let end = (start + WINDOW - 1).min(total);
        if end - start + 1 < WINDOW {
            start = end.saturating_sub(WINDOW - 1).max(1);
        }
        (start..=end).collect()
    }

    pub fn go_to(&mut self, page: u32) -> Result<(), PageError> {
        let total_pages = self.total_pages();
        if page == 0 || page > total_pages {
            return Err(PageError::OutOfRange { page, total_pages });
        }
        self.current_page = page;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn set_items_per_page(&mut self, items_per_page: u32) {
        self.items_per_page = items_per_page.clamp(1, MAX_PER_PAGE);
        self.reset();
    }

    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
        let total_pages = self.total_pages().max(1);
        if self.current_page > total_pages {
            self.current_page = total_pages;
        }
    }

    pub fn info(&self) -> PageInfo {
        PageInfo {
            current_page: self.current_page,
            items_per_page: self.items_per_page,
            total_count: self.total_count,
            total_pages: self.total_pages(),
            shows_controls: self.shows_controls(),
            window: self.page_window(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageInfo {
    #[schema(example = 1)]
    pub current_page: u32,
    #[schema(example = 50)]
    pub items_per_page: u32,
    #[schema(example = 120)]
    pub total_count: u64,
    #[schema(example = 3)]
    pub total_pages: u32,
    pub shows_controls: bool,
    #[schema(example = json!([1, 2, 3]))]
    pub window: Vec<u32>,
}
