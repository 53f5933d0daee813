use crate::model::PaginationLimits;
use serde::{Deserialize, Serialize};

/// Bounds applied uniformly by every recursive resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionLimits {
    /// Maximum number of schema hops (populate levels, relation hops in
    /// filters, segments of a sort path)
    pub max_depth: usize,
    /// Maximum nesting of `$and`/`$or`/`$not` groups inside one filter
    pub max_filter_nesting: usize,
    pub pagination: PaginationLimits,
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_filter_nesting: 16,
            pagination: PaginationLimits::default(),
        }
    }
}

impl ResolutionLimits {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be at least 1".to_string());
        }
        if self.max_filter_nesting == 0 {
            return Err("max_filter_nesting must be at least 1".to_string());
        }
        if self.pagination.max_page_size == 0 {
            return Err("max_page_size must be at least 1".to_string());
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return Err(format!(
                "default_page_size must be between 1 and max_page_size ({})",
                self.pagination.max_page_size
            ));
        }
        Ok(())
    }
}
