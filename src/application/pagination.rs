//! Page-number pagination for HTML lists and limit/offset windows for the API.

use std::num::NonZeroU32;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Number of objects shown per page on paginated HTML lists.
pub const PAGINATION_OBJECTS_PER_PAGE: u32 = 25;

const LAST_PAGE_TOKEN: &str = "last";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page `{0}` is not a number")]
    InvalidPage(String),
    #[error("page {page} is out of range (1..={num_pages})")]
    EmptyPage { page: u64, num_pages: u64 },
}

/// Which page the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(u64),
    Last,
}

impl Default for PageSelector {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageSelector {
    /// Parse the raw `page` query value. An absent or empty value selects
    /// the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, PaginationError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for PageSelector {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == LAST_PAGE_TOKEN {
            return Ok(Self::Last);
        }
        s.parse::<u64>()
            .map(Self::Number)
            .map_err(|_| PaginationError::InvalidPage(s.to_string()))
    }
}

/// Fixed-size page slicing over a counted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

/// Offset/limit bounds of a resolved page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    /// Page count for `total` objects. An empty collection still has one
    /// (empty) page.
    pub fn num_pages(&self, total: u64) -> u64 {
        let per_page = u64::from(self.per_page.get());
        total.div_ceil(per_page).max(1)
    }

    pub fn resolve(
        &self,
        selector: PageSelector,
        total: u64,
    ) -> Result<PageWindow, PaginationError> {
        let num_pages = self.num_pages(total);
        let number = match selector {
            PageSelector::Last => num_pages,
            PageSelector::Number(page) if page >= 1 && page <= num_pages => page,
            PageSelector::Number(page) => {
                return Err(PaginationError::EmptyPage { page, num_pages });
            }
        };
        let limit = u64::from(self.per_page.get());
        Ok(PageWindow {
            number,
            num_pages,
            offset: (number - 1) * limit,
            limit,
        })
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroU32::new(PAGINATION_OBJECTS_PER_PAGE).unwrap_or(NonZeroU32::MIN))
    }
}

/// One page of a numbered listing.
#[derive(Debug, Clone, Serialize)]
pub struct NumberedPage<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> NumberedPage<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: u64) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u64> {
        1..=self.num_pages
    }
}

/// Limit/offset slice used by the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct OffsetPage<T> {
    pub count: u64,
    pub limit: u64,
    pub offset: u64,
    pub items: Vec<T>,
}

impl<T> OffsetPage<T> {
    pub fn next_offset(&self) -> Option<u64> {
        self.offset
            .checked_add(self.limit)
            .filter(|next| *next < self.count)
    }

    pub fn previous_offset(&self) -> Option<u64> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator() -> Paginator {
        Paginator::default()
    }

    #[test]
    fn absent_or_empty_page_selects_first() {
        assert_eq!(PageSelector::parse(None), Ok(PageSelector::Number(1)));
        assert_eq!(PageSelector::parse(Some("")), Ok(PageSelector::Number(1)));
    }

    #[test]
    fn last_token_selects_final_page() {
        assert_eq!(PageSelector::parse(Some("last")), Ok(PageSelector::Last));
        let window = paginator()
            .resolve(PageSelector::Last, 53)
            .expect("last page");
        assert_eq!(window.number, 3);
        assert_eq!(window.offset, 50);
    }

    #[test]
    fn non_numeric_page_is_rejected() {
        assert_eq!(
            PageSelector::parse(Some("foobar")),
            Err(PaginationError::InvalidPage("foobar".to_string()))
        );
        assert!(PageSelector::parse(Some("-1")).is_err());
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        let p = paginator();
        assert_eq!(
            p.resolve(PageSelector::Number(100), 53),
            Err(PaginationError::EmptyPage {
                page: 100,
                num_pages: 3
            })
        );
        assert!(p.resolve(PageSelector::Number(0), 53).is_err());
    }

    #[test]
    fn empty_collection_has_one_page() {
        let p = paginator();
        assert_eq!(p.num_pages(0), 1);
        assert!(p.resolve(PageSelector::Number(1), 0).is_ok());
        assert_eq!(p.resolve(PageSelector::Last, 0).map(|w| w.number), Ok(1));
    }

    #[test]
    fn page_sizes_follow_remaining_items() {
        let p = paginator();
        let total = 53;
        let sizes: Vec<u64> = (1..=3)
            .map(|n| {
                let window = p.resolve(PageSelector::Number(n), total).expect("page");
                window.limit.min(total - window.offset)
            })
            .collect();
        assert_eq!(sizes, vec![25, 25, 3]);
    }

    #[test]
    fn numbered_page_neighbours() {
        let window = paginator()
            .resolve(PageSelector::Number(2), 53)
            .expect("page 2");
        let page = NumberedPage::new(vec![(); 25], window, 53);
        assert_eq!(page.previous_number(), Some(1));
        assert_eq!(page.next_number(), Some(3));
        assert_eq!(page.page_numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn offset_page_links() {
        let page = OffsetPage {
            count: 53,
            limit: 20,
            offset: 20,
            items: Vec::<()>::new(),
        };
        assert_eq!(page.next_offset(), Some(40));
        assert_eq!(page.previous_offset(), Some(0));

        let last = OffsetPage { offset: 40, ..page };
        assert_eq!(last.next_offset(), None);
    }

    #[test]
    fn offset_near_u64_max_has_no_next_page() {
        let page = OffsetPage {
            count: 4,
            limit: 100,
            offset: u64::MAX - 15,
            items: Vec::<()>::new(),
        };
        assert_eq!(page.next_offset(), None);
        assert_eq!(page.previous_offset(), Some(u64::MAX - 115));
    }
}
