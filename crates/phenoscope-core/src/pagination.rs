//! Pagination controller.
//!
//! Tracks the 1-based current page against the last known total count.
//! Transitions outside the valid page range are guarded no-ops, so an
//! invalid page request can never reach the network layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    current_page: u32,
    page_size: u32,
    total_count: u64,
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Last known total, 0 before the first response.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        self.total_count.div_ceil(self.page_size as u64) as u32
    }

    /// Backend request offset for the current page.
    pub fn offset(&self) -> u64 {
        (self.current_page as u64 - 1) * self.page_size as u64
    }

    /// Advances one page. No-op when already on the last known page.
    pub fn next_page(&mut self) -> bool {
        if self.current_page >= self.total_pages() {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// Goes back one page. No-op when on page 1.
    pub fn previous_page(&mut self) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Jumps to an arbitrary page. Before the first response the upper bound
    /// is unknown and any page is accepted; afterwards the page is clamped.
    pub fn jump_to(&mut self, page: u32) -> bool {
        let mut target = page.max(1);
        if self.total_count > 0 {
            target = target.min(self.total_pages().max(1));
        }
        if target == self.current_page {
            return false;
        }
        self.current_page = target;
        true
    }

    /// A new filter invalidates the old page position.
    pub fn on_query_changed(&mut self) {
        self.current_page = 1;
    }

    /// Records the total from the latest response and clamps the current
    /// page into `[1, max(1, total_pages)]`, leaving it alone if valid.
    pub fn on_results_received(&mut self, total_count: u64) {
        self.total_count = total_count;
        let max_page = self.total_pages().max(1);
        if self.current_page > max_page {
            self.current_page = max_page;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let mut pagination = Pagination::new(15);
        assert_eq!(pagination.total_pages(), 0);

        pagination.on_results_received(37);
        assert_eq!(pagination.total_pages(), 3);

        pagination.on_results_received(45);
        assert_eq!(pagination.total_pages(), 3);

        pagination.on_results_received(46);
        assert_eq!(pagination.total_pages(), 4);
    }

    #[test]
    fn test_next_page_guard() {
        let mut pagination = Pagination::new(15);
        // No results known yet: nowhere to go.
        assert!(!pagination.next_page());

        pagination.on_results_received(37);
        assert!(pagination.next_page());
        assert!(pagination.next_page());
        assert_eq!(pagination.current_page(), 3);
        // On the last page: no-op.
        assert!(!pagination.next_page());
        assert_eq!(pagination.current_page(), 3);
    }

    #[test]
    fn test_previous_page_guard() {
        let mut pagination = Pagination::new(15);
        assert!(!pagination.previous_page());

        pagination.on_results_received(37);
        pagination.next_page();
        assert!(pagination.previous_page());
        assert_eq!(pagination.current_page(), 1);
        assert!(!pagination.previous_page());
    }

    #[test]
    fn test_query_change_resets_to_first_page() {
        let mut pagination = Pagination::new(15);
        pagination.on_results_received(100);
        pagination.next_page();
        pagination.next_page();

        pagination.on_query_changed();
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn test_shrinking_total_clamps_current_page() {
        let mut pagination = Pagination::new(15);
        pagination.on_results_received(50); // 4 pages
        pagination.jump_to(4);
        assert_eq!(pagination.current_page(), 4);

        pagination.on_results_received(37); // 3 pages
        assert_eq!(pagination.current_page(), 3);

        pagination.on_results_received(0);
        assert_eq!(pagination.current_page(), 1);
    }

    #[test]
    fn test_clamp_leaves_valid_page_alone() {
        let mut pagination = Pagination::new(15);
        pagination.on_results_received(50);
        pagination.jump_to(2);

        pagination.on_results_received(37);
        assert_eq!(pagination.current_page(), 2);
    }

    #[test]
    fn test_offset_derivation() {
        let mut pagination = Pagination::new(15);
        pagination.on_results_received(100);
        assert_eq!(pagination.offset(), 0);
        pagination.next_page();
        assert_eq!(pagination.offset(), 15);
        pagination.jump_to(5);
        assert_eq!(pagination.offset(), 60);
    }

    #[test]
    fn test_jump_before_first_response_is_unclamped() {
        let mut pagination = Pagination::new(15);
        assert!(pagination.jump_to(3));
        assert_eq!(pagination.current_page(), 3);
        assert_eq!(pagination.offset(), 30);
    }

    #[test]
    fn test_zero_page_size_is_coerced() {
        let pagination = Pagination::new(0);
        assert_eq!(pagination.page_size(), 1);
    }
}
