use serde::{Deserialize, Serialize};

/// Externally configured bounds for page sizes and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PaginationLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
        }
    }
}

/// Window style of a canonical pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "camelCase")]
pub enum PaginationWindow {
    #[serde(rename_all = "camelCase")]
    Page { page: u64, page_size: u64 },
    Offset { start: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(flatten)]
    pub window: PaginationWindow,
    pub with_count: bool,
}

impl Pagination {
    pub fn page(page: u64, page_size: u64) -> Self {
        Self {
            window: PaginationWindow::Page { page, page_size },
            with_count: false,
        }
    }

    pub fn offset(start: u64, limit: u64) -> Self {
        Self {
            window: PaginationWindow::Offset { start, limit },
            with_count: false,
        }
    }

    pub fn default_for(limits: &PaginationLimits) -> Self {
        Self::page(1, limits.default_page_size)
    }

    /// Equivalent `(offset, limit)` for storage layers that only speak offsets
    pub fn as_offset_limit(&self) -> (u64, u64) {
        match self.window {
            PaginationWindow::Page { page, page_size } => {
                (page.saturating_sub(1).saturating_mul(page_size), page_size)
            }
            PaginationWindow::Offset { start, limit } => (start, limit),
        }
    }
}
