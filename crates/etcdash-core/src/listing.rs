//! Client-side filtering and pagination for long listings.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: usize = 500;

/// Filter and page selection for a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring match on the display name.
    #[serde(default)]
    pub filter: Option<String>,
    /// One-based page number.
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl ListQuery {
    /// Effective page size after defaulting and clamping.
    #[must_use]
    pub fn page_size(&self) -> usize {
        match self.page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(n) => n.min(MAX_PAGE_SIZE),
        }
    }

    /// Whether `name` passes the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
        }
    }
}

/// One page of a larger result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Item count before paging, after filtering.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Filter `items` by `name` and cut out the requested page.
///
/// Page numbers past the end clamp to the last page; an empty result
/// still reports one (empty) page.
#[must_use]
pub fn paginate<T>(items: Vec<T>, query: &ListQuery, name: impl Fn(&T) -> &str) -> Page<T> {
    let filtered: Vec<T> = items.into_iter().filter(|i| query.matches(name(i))).collect();
    let total = filtered.len();
    let page_size = query.page_size();
    let total_pages = total.div_ceil(page_size).max(1);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);

    let items = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}
