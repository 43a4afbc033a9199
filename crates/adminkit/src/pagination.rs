//! Pagination for admin list views.
//!
//! Provides [`Paginator`] and [`Page`], which split the records returned by an
//! admin's `get_list_objects` into fixed-size pages, plus [`PageSummary`], the
//! serialisable view of a page handed to the list template.
//!
//! # Examples
//!
//! ```
//! use adminkit::pagination::Paginator;
//!
//! let items: Vec<i32> = (1..=100).collect();
//! let paginator = Paginator::new(items, 10);
//! assert_eq!(paginator.num_pages(), 10);
//! assert_eq!(paginator.count(), 100);
//!
//! let page = paginator.page(1).unwrap();
//! assert_eq!(page.object_list().len(), 10);
//! assert!(page.has_next());
//! assert!(!page.has_previous());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during pagination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The requested page is past the last page.
    #[error("That page contains no results")]
    EmptyPage,
    /// The page number is invalid (zero).
    #[error("{0}")]
    InvalidPage(String),
}

/// An item in an elided page range: either a page number or an ellipsis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "number", rename_all = "lowercase")]
pub enum PageRangeItem {
    /// A page number.
    Page(usize),
    /// An ellipsis (gap in the page range).
    Ellipsis,
}

/// Splits a collection of objects into pages.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    object_list: Vec<T>,
    per_page: usize,
    orphans: usize,
    allow_empty_first_page: bool,
}

impl<T: Clone> Paginator<T> {
    /// Creates a new `Paginator` with the given objects and page size.
    ///
    /// A page size of zero is clamped to one. Orphans default to 0 and empty
    /// first pages are allowed.
    pub fn new(object_list: Vec<T>, per_page: usize) -> Self {
        Self {
            object_list,
            per_page: per_page.max(1),
            orphans: 0,
            allow_empty_first_page: true,
        }
    }

    /// Sets the number of orphans.
    ///
    /// When the last page would hold `orphans` items or fewer, they are
    /// folded into the previous page.
    #[must_use]
    pub const fn orphans(mut self, orphans: usize) -> Self {
        self.orphans = orphans;
        self
    }

    /// Sets whether the first page is allowed to be empty.
    #[must_use]
    pub const fn allow_empty_first_page(mut self, allow: bool) -> Self {
        self.allow_empty_first_page = allow;
        self
    }

    /// Returns the page size.
    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    /// Returns the total number of objects across all pages.
    pub fn count(&self) -> usize {
        self.object_list.len()
    }

    /// Returns the total number of pages.
    pub fn num_pages(&self) -> usize {
        let count = self.count();
        if count == 0 {
            return usize::from(self.allow_empty_first_page);
        }

        // hits = max(1, count - orphans)
        let hits = count.saturating_sub(self.orphans).max(1);
        hits.div_ceil(self.per_page)
    }

    /// Returns the requested page (1-indexed).
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidPage`] if the page number is 0, and
    /// [`PaginationError::EmptyPage`] if it is beyond the last page.
    pub fn page(&self, number: usize) -> Result<Page<T>, PaginationError> {
        if number == 0 {
            return Err(PaginationError::InvalidPage(
                "That page number is less than 1".to_string(),
            ));
        }

        let num_pages = self.num_pages();
        if number > num_pages {
            return Err(PaginationError::EmptyPage);
        }

        let start = (number - 1) * self.per_page;
        let end = if number == num_pages {
            // Last page gets all remaining items (including orphans)
            self.count()
        } else {
            (start + self.per_page).min(self.count())
        };

        Ok(Page {
            object_list: self.object_list.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
            number,
            num_pages,
            per_page: self.per_page,
            count: self.count(),
        })
    }

    /// Returns an elided page range around the given page number.
    ///
    /// Shows `on_each_side` pages on each side of the current page and
    /// `on_ends` pages at the start and end, with ellipsis markers for gaps.
    pub fn elided_page_range(
        &self,
        number: usize,
        on_each_side: usize,
        on_ends: usize,
    ) -> Vec<PageRangeItem> {
        let num_pages = self.num_pages();
        if num_pages == 0 {
            return vec![PageRangeItem::Page(1)];
        }

        // If the total range is small enough, show all pages
        if num_pages <= (on_each_side + on_ends) * 2 {
            return (1..=num_pages).map(PageRangeItem::Page).collect();
        }

        let number = number.clamp(1, num_pages);
        let mut result = Vec::new();

        if number > 1 + on_each_side + on_ends + 1 {
            result.extend((1..=on_ends).map(PageRangeItem::Page));
            result.push(PageRangeItem::Ellipsis);
            result.extend((number - on_each_side..=number).map(PageRangeItem::Page));
        } else {
            result.extend((1..=number).map(PageRangeItem::Page));
        }

        if number + on_each_side + on_ends + 1 < num_pages {
            result.extend((number + 1..=number + on_each_side).map(PageRangeItem::Page));
            result.push(PageRangeItem::Ellipsis);
            result.extend((num_pages - on_ends + 1..=num_pages).map(PageRangeItem::Page));
        } else {
            result.extend((number + 1..=num_pages).map(PageRangeItem::Page));
        }

        result
    }
}

/// A single page of results from a [`Paginator`].
#[derive(Debug, Clone)]
#[allow(clippy::struct_field_names)]
pub struct Page<T> {
    object_list: Vec<T>,
    number: usize,
    num_pages: usize,
    per_page: usize,
    count: usize,
}

impl<T> Page<T> {
    /// Returns the items on this page.
    pub fn object_list(&self) -> &[T] {
        &self.object_list
    }

    /// Consumes the page, returning its items.
    pub fn into_object_list(self) -> Vec<T> {
        self.object_list
    }

    /// Returns the 1-based page number.
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the total number of pages of the paginator.
    pub const fn num_pages(&self) -> usize {
        self.num_pages
    }

    /// Returns `true` if there is a next page.
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Returns `true` if there is a previous page.
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Returns `true` if there are other pages (either next or previous).
    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    /// Returns the next page number, if any.
    pub const fn next_page_number(&self) -> Option<usize> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Returns the previous page number, if any.
    pub const fn previous_page_number(&self) -> Option<usize> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// Returns the 1-based index of the first item on this page, or 0 when empty.
    pub fn start_index(&self) -> usize {
        if self.object_list.is_empty() {
            return 0;
        }
        (self.number - 1) * self.per_page + 1
    }

    /// Returns the 1-based index of the last item on this page, or 0 when empty.
    pub fn end_index(&self) -> usize {
        if self.object_list.is_empty() {
            return 0;
        }
        self.start_index() + self.object_list.len() - 1
    }

    /// Builds the template-facing summary of this page.
    pub fn summary(&self, page_range: Vec<PageRangeItem>) -> PageSummary {
        PageSummary {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            has_other_pages: self.has_other_pages(),
            next_page_number: self.next_page_number(),
            previous_page_number: self.previous_page_number(),
            start_index: self.start_index(),
            end_index: self.end_index(),
            page_range,
        }
    }
}

/// What the list template knows about the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// Current page number.
    pub number: usize,
    /// Total number of pages.
    pub num_pages: usize,
    /// Total number of records across all pages.
    pub count: usize,
    /// Whether a next page exists.
    pub has_next: bool,
    /// Whether a previous page exists.
    pub has_previous: bool,
    /// Whether the listing spans more than one page.
    pub has_other_pages: bool,
    /// Next page number, if any.
    pub next_page_number: Option<usize>,
    /// Previous page number, if any.
    pub previous_page_number: Option<usize>,
    /// 1-based index of the first record on the page.
    pub start_index: usize,
    /// 1-based index of the last record on the page.
    pub end_index: usize,
    /// Page links to render, with gaps elided.
    pub page_range: Vec<PageRangeItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_items(n: i32) -> Vec<i32> {
        (1..=n).collect()
    }

    fn numbers(range: &[PageRangeItem]) -> Vec<Option<usize>> {
        range
            .iter()
            .map(|item| match item {
                PageRangeItem::Page(n) => Some(*n),
                PageRangeItem::Ellipsis => None,
            })
            .collect()
    }

    #[test]
    fn test_paginator_num_pages_uneven() {
        let paginator = Paginator::new(make_items(23), 10);
        assert_eq!(paginator.count(), 23);
        assert_eq!(paginator.num_pages(), 3);
    }

    #[test]
    fn test_paginator_pages_slice_in_order() {
        let paginator = Paginator::new(make_items(25), 10);
        let first = paginator.page(1).unwrap();
        assert_eq!(first.object_list(), &make_items(10)[..]);
        let last = paginator.page(3).unwrap();
        assert_eq!(last.object_list(), &[21, 22, 23, 24, 25]);
        assert_eq!(last.start_index(), 21);
        assert_eq!(last.end_index(), 25);
    }

    #[test]
    fn test_paginator_empty_list_has_one_empty_page() {
        let paginator: Paginator<i32> = Paginator::new(vec![], 10);
        assert_eq!(paginator.num_pages(), 1);
        let page = paginator.page(1).unwrap();
        assert!(page.object_list().is_empty());
        assert_eq!(page.start_index(), 0);
        assert_eq!(page.end_index(), 0);
        assert!(!page.has_other_pages());
    }

    #[test]
    fn test_paginator_empty_no_first_page() {
        let paginator: Paginator<i32> = Paginator::new(vec![], 10).allow_empty_first_page(false);
        assert_eq!(paginator.num_pages(), 0);
        assert_eq!(paginator.page(1).unwrap_err(), PaginationError::EmptyPage);
    }

    #[test]
    fn test_paginator_page_zero() {
        let paginator = Paginator::new(make_items(10), 5);
        let err = paginator.page(0).unwrap_err();
        assert_eq!(err.to_string(), "That page number is less than 1");
    }

    #[test]
    fn test_paginator_page_too_large() {
        let paginator = Paginator::new(make_items(10), 5);
        assert_eq!(paginator.page(99).unwrap_err(), PaginationError::EmptyPage);
        assert_eq!(
            PaginationError::EmptyPage.to_string(),
            "That page contains no results"
        );
    }

    #[test]
    fn test_paginator_orphans_merge_into_last_page() {
        let paginator = Paginator::new(make_items(23), 10).orphans(3);
        assert_eq!(paginator.num_pages(), 2);
        assert_eq!(paginator.page(2).unwrap().object_list().len(), 13);
    }

    #[test]
    fn test_paginator_per_page_zero_clamped() {
        let paginator = Paginator::new(make_items(5), 0);
        assert_eq!(paginator.per_page(), 1);
        assert_eq!(paginator.num_pages(), 5);
    }

    #[test]
    fn test_page_navigation() {
        let paginator = Paginator::new(make_items(30), 10);
        let first = paginator.page(1).unwrap();
        assert_eq!(first.next_page_number(), Some(2));
        assert_eq!(first.previous_page_number(), None);
        let middle = paginator.page(2).unwrap();
        assert!(middle.has_next() && middle.has_previous());
        let last = paginator.page(3).unwrap();
        assert_eq!(last.next_page_number(), None);
        assert_eq!(last.previous_page_number(), Some(2));
    }

    #[test]
    fn test_single_page_has_no_other_pages() {
        let paginator = Paginator::new(make_items(5), 10);
        assert!(!paginator.page(1).unwrap().has_other_pages());
    }

    #[test]
    fn test_elided_range_small_shows_everything() {
        let paginator = Paginator::new(make_items(50), 10);
        let range = paginator.elided_page_range(1, 2, 1);
        assert_eq!(
            numbers(&range),
            vec![Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
    }

    #[test]
    fn test_elided_range_middle() {
        let paginator = Paginator::new(make_items(200), 10);
        let range = paginator.elided_page_range(10, 2, 2);
        assert_eq!(
            numbers(&range),
            vec![
                Some(1),
                Some(2),
                None,
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                None,
                Some(19),
                Some(20)
            ]
        );
    }

    #[test]
    fn test_elided_range_start() {
        let paginator = Paginator::new(make_items(200), 10);
        let range = paginator.elided_page_range(1, 2, 2);
        assert_eq!(
            numbers(&range),
            vec![Some(1), Some(2), Some(3), None, Some(19), Some(20)]
        );
    }

    #[test]
    fn test_elided_range_end() {
        let paginator = Paginator::new(make_items(200), 10);
        let range = paginator.elided_page_range(20, 2, 2);
        assert_eq!(
            numbers(&range),
            vec![Some(1), Some(2), None, Some(18), Some(19), Some(20)]
        );
    }

    #[test]
    fn test_summary_serializes() {
        let paginator = Paginator::new(make_items(25), 10);
        let page = paginator.page(2).unwrap();
        let summary = page.summary(paginator.elided_page_range(2, 2, 1));
        assert_eq!(summary.count, 25);
        assert_eq!(summary.start_index, 11);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["next_page_number"], 3);
        assert_eq!(json["page_range"][0]["kind"], "page");
        assert_eq!(json["page_range"][0]["number"], 1);
    }
}
