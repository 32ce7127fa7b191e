//! 1-based pagination.

use std::fmt;

/// Records per page for every list and search query.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Page(u32);

impl Page {
    pub const FIRST: Page = Page(1);

    /// Parse a request parameter. Missing, non-numeric and zero values
    /// fall back to the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .map(Page)
            .unwrap_or(Self::FIRST)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn offset(&self) -> usize {
        (self.0 as usize - 1) * PAGE_SIZE
    }

    /// Slice the page out of a full, already ordered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset()).take(PAGE_SIZE).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_first_page() {
        assert_eq!(Page::parse(None), Page::FIRST);
        assert_eq!(Page::parse(Some("abc")), Page::FIRST);
        assert_eq!(Page::parse(Some("")), Page::FIRST);
        assert_eq!(Page::parse(Some("0")), Page::FIRST);
        assert_eq!(Page::parse(Some("-3")), Page::FIRST);
        assert_eq!(Page::parse(Some(" 4 ")).number(), 4);
    }

    #[test]
    fn test_apply_slices() {
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(Page::parse(Some("1")).apply(items.clone()), (0..10).collect::<Vec<_>>());
        assert_eq!(Page::parse(Some("3")).apply(items.clone()), (20..25).collect::<Vec<_>>());
        assert!(Page::parse(Some("9")).apply(items).is_empty());
    }
}
