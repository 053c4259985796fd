//! Pagination Slicer
//!
//! Bounds-safe page windows over an ordered sequence. Every list
//! operation goes through [`paginate`].

use serde::Serialize;

/// Page size used when the caller asks for less than one item per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One window of an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Length of the whole sequence
    pub total: u32,
    /// `ceil(total / page_size)`, zero for an empty sequence
    pub max_page: u32,
    /// The windowed items
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            max_page: self.max_page,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Slice `items` to the 1-based `page` of `page_size` entries.
///
/// * `page_size < 1` is coerced to [`DEFAULT_PAGE_SIZE`].
/// * `page < 1` is the unpaged form: the entire sequence comes back.
/// * `page > max_page` is clamped to `max_page`.
pub fn paginate<T>(page: u32, page_size: u32, mut items: Vec<T>) -> Page<T> {
    let page_size = if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    let total = items.len() as u32;
    let max_page = total.div_ceil(page_size);

    if page < 1 || total == 0 {
        return Page {
            total,
            max_page,
            items,
        };
    }

    let page = page.min(max_page);
    let start = ((page - 1) * page_size) as usize;
    let end = (page.saturating_mul(page_size)).min(total) as usize;

    items.truncate(end);
    let items = items.split_off(start);

    Page {
        total,
        max_page,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_page() {
        let page = paginate(1, 3, (1..=7).collect::<Vec<_>>());
        assert_eq!(page.total, 7);
        assert_eq!(page.max_page, 3);
        assert_eq!(page.items, vec![1, 2, 3]);
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate(3, 3, (1..=7).collect::<Vec<_>>());
        assert_eq!(page.items, vec![7]);
    }

    #[test]
    fn test_page_beyond_max_is_clamped() {
        let page = paginate(99, 3, (1..=7).collect::<Vec<_>>());
        assert_eq!(page.items, vec![7]);
    }

    #[test]
    fn test_page_zero_returns_everything() {
        let page = paginate(0, 2, vec!["a", "b", "c"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.max_page, 2);
        assert_eq!(page.items, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_page_size_uses_default() {
        let page = paginate(1, 0, (0..25).collect::<Vec<_>>());
        assert_eq!(page.max_page, 3);
        assert_eq!(page.items.len(), DEFAULT_PAGE_SIZE as usize);
    }

    #[test]
    fn test_empty_sequence() {
        let page = paginate(4, 5, Vec::<u8>::new());
        assert_eq!(page.total, 0);
        assert_eq!(page.max_page, 0);
        assert!(page.items.is_empty());
    }

    proptest! {
        #[test]
        fn prop_window_never_exceeds_page_size(len in 0usize..200, size in 1u32..30, page in 1u32..20) {
            let page = paginate(page, size, (0..len).collect::<Vec<_>>());
            prop_assert!(page.items.len() <= size as usize);
        }

        #[test]
        fn prop_pages_partition_the_sequence(len in 0usize..200, size in 1u32..30) {
            let seq: Vec<usize> = (0..len).collect();
            let max_page = paginate(1, size, seq.clone()).max_page;

            let mut joined = Vec::new();
            for page in 1..=max_page {
                joined.extend(paginate(page, size, seq.clone()).items);
            }
            prop_assert_eq!(joined, seq);
        }

        #[test]
        fn prop_unpaged_returns_sequence_unchanged(len in 0usize..200, size in 0u32..30) {
            let seq: Vec<usize> = (0..len).collect();
            let page = paginate(0, size, seq.clone());
            prop_assert_eq!(page.items, seq);
        }
    }
}
