pub const LEADERBOARD_PAGE_SIZE: usize = 10;
pub const LOGS_PAGE_SIZE: usize = 10;
pub const CHALLENGES_PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Rows `[(page-1)*page_size, min(page*page_size, len))`. Pages are 1-based; anything out of
/// range is empty.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = page.saturating_mul(page_size).min(items.len());
    &items[start..end]
}

/// Keeps `page` within `1..=total`, treating an empty listing as one page.
pub fn clamp_page(page: usize, total: usize) -> usize {
    page.clamp(1, total.max(1))
}

/// Page buttons to show: every page when there are at most five, otherwise the first and last
/// pages with the neighbourhood of the current page between ellipses.
pub fn page_numbers(current: usize, total: usize) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total <= 5 {
        return (1..=total).map(Page).collect();
    }
    if current <= 3 {
        vec![Page(1), Page(2), Page(3), Ellipsis, Page(total)]
    } else if current >= total - 2 {
        vec![
            Page(1),
            Ellipsis,
            Page(total - 2),
            Page(total - 1),
            Page(total),
        ]
    } else {
        vec![Page(1), Ellipsis, Page(current), Ellipsis, Page(total)]
    }
}
