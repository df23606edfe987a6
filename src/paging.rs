//! Pure pagination arithmetic shared by the pager controls and the list
//! model. Pages are 0-based internally; the UI edge is 1-based.

/// 1-based inclusive display range, "start-end of total". An empty set
/// yields `start == end == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

/// Number of pages needed for `total` items; an empty set still has one
/// (empty) page so the pager never divides by or renders zero pages.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    usize::max(1, total.div_ceil(page_size))
}

pub fn page_range(page: usize, page_size: usize, total: usize) -> PageRange {
    if total == 0 || page_size == 0 {
        return PageRange { start: 0, end: 0, total };
    }
    let start = page * page_size;
    if start >= total {
        return PageRange { start: 0, end: 0, total };
    }
    PageRange {
        start: start + 1,
        end: usize::min(start + page_size, total),
        total,
    }
}

/// Half-open 0-based bounds of the current page slice.
pub fn slice_bounds(page: usize, page_size: usize, total: usize) -> (usize, usize) {
    if page_size == 0 {
        return (0, total);
    }
    let start = usize::min(page * page_size, total);
    (start, usize::min(start + page_size, total))
}

/// Clamp a 0-based page index so it stays valid after the filtered set
/// shrank or grew.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    usize::min(page, page_count(total, page_size) - 1)
}

/// Normalize free-form jump-to-page input to a 1-based page number in
/// `[1, max_page]`. Non-numeric input and a `max_page` of 0 both resolve
/// to page 1.
pub fn normalize_page(requested: &str, max_page: usize) -> usize {
    let requested: usize = requested.trim().parse().unwrap_or(1);
    requested.clamp(1, usize::max(max_page, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn range_is_one_based_and_clamped() {
        assert_eq!(
            page_range(0, 50, 120),
            PageRange { start: 1, end: 50, total: 120 }
        );
        assert_eq!(
            page_range(2, 50, 120),
            PageRange { start: 101, end: 120, total: 120 }
        );
    }

    #[test]
    fn empty_set_has_one_empty_page() {
        assert_eq!(page_count(0, 50), 1);
        assert_eq!(page_range(0, 50, 0), PageRange { start: 0, end: 0, total: 0 });
        assert_eq!(slice_bounds(0, 50, 0), (0, 0));
    }

    #[test]
    fn normalize_clamps_and_tolerates_garbage() {
        assert_eq!(normalize_page("3", 5), 3);
        assert_eq!(normalize_page("99", 5), 5);
        assert_eq!(normalize_page("0", 5), 1);
        assert_eq!(normalize_page("-2", 5), 1);
        assert_eq!(normalize_page("abc", 5), 1);
        assert_eq!(normalize_page("2", 0), 1);
    }

    #[test]
    fn clamp_page_revalidates_after_shrink() {
        // Page 2 of 120 items, filter shrinks to 30: only page 0 remains.
        assert_eq!(clamp_page(2, 30, 50), 0);
        assert_eq!(clamp_page(1, 80, 50), 1);
        assert_eq!(clamp_page(1, 0, 50), 0);
    }

    proptest! {
        #[test]
        fn normalized_page_is_always_in_range(input in "\\PC*", max_page in 0usize..1000) {
            let page = normalize_page(&input, max_page);
            prop_assert!(page >= 1);
            prop_assert!(page <= usize::max(max_page, 1));
        }

        #[test]
        fn clamped_page_slice_never_exceeds_total(
            page in 0usize..100,
            total in 0usize..10_000,
            page_size in 1usize..200,
        ) {
            let clamped = clamp_page(page, total, page_size);
            let (start, end) = slice_bounds(clamped, page_size, total);
            prop_assert!(start <= end);
            prop_assert!(end <= total);
            // A non-empty set always has a non-empty clamped page.
            if total > 0 {
                prop_assert!(start < total);
            }
        }
    }
}
