//! Filters and pagination for listing executions

use serde::{Deserialize, Serialize};

use crate::record::{ExecutionRecord, ExecutionStatus};

/// Criteria for [`crate::store::ExecutionStore::list_executions`].
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionFilter {
    /// Only executions of this study.
    pub study_id: Option<String>,
    /// Only executions of this protocol.
    pub protocol_id: Option<String>,
    /// Only executions in this category.
    pub category: Option<String>,
    /// Only executions created by this operator.
    pub operator_id: Option<String>,
    /// Only executions in this status.
    pub status: Option<ExecutionStatus>,
}

impl ExecutionFilter {
    /// Filter matching every execution.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a study.
    #[must_use]
    pub fn study(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    /// Restrict to a protocol.
    #[must_use]
    pub fn protocol(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = Some(protocol_id.into());
        self
    }

    /// Restrict to a category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to an operator.
    #[must_use]
    pub fn operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    /// Restrict to a status.
    #[must_use]
    pub const fn status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` if `execution` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, execution: &ExecutionRecord) -> bool {
        fn eq(expected: Option<&String>, actual: &str) -> bool {
            expected.map_or(true, |e| e == actual)
        }

        eq(self.study_id.as_ref(), execution.study_id())
            && eq(self.protocol_id.as_ref(), execution.protocol_id())
            && eq(self.category.as_ref(), execution.category())
            && eq(self.operator_id.as_ref(), &execution.operator().id)
            && self.status.map_or(true, |s| s == execution.status())
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: u32,
    /// Maximum items per page.
    pub limit: u32,
}

impl Pagination {
    /// Create a page request; page 0 is treated as page 1.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            limit,
        }
    }

    /// Number of items preceding this page.
    #[must_use]
    pub const fn offset(self) -> usize {
        (self.page.saturating_sub(1) as usize) * (self.limit as usize)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Number of matching items across all pages.
    pub total: usize,
    /// Page number, starting at 1.
    pub page: u32,
    /// Maximum items per page.
    pub limit: u32,
}

impl<T> Page<T> {
    /// Slice `items` (already filtered and ordered) down to one page.
    #[must_use]
    pub fn from_ordered(items: Vec<T>, pagination: Pagination) -> Self {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }

    /// Number of pages needed for `total` items.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit as usize)
        }
    }
}
