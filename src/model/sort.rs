use crate::model::{AttributePath, SortDirection};
use serde::Serialize;
use std::fmt;

pub type SortList = Vec<SortTerm>;

/// One `(attribute-path, direction)` pair of a canonical sort list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SortTerm {
    pub path: AttributePath,
    pub direction: SortDirection,
}

impl SortTerm {
    pub fn new(path: impl Into<AttributePath>, direction: SortDirection) -> Self {
        Self {
            path: path.into(),
            direction,
        }
    }

    pub fn asc(path: &str) -> Self {
        Self::new(path, SortDirection::Asc)
    }

    pub fn desc(path: &str) -> Self {
        Self::new(path, SortDirection::Desc)
    }
}

impl fmt::Display for SortTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.direction)
    }
}
