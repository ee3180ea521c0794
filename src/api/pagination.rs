use serde::Serialize;

/// One precomputed page link for a listing view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationLink {
    pub index: usize,
    pub link: String,
    pub current: bool,
}

/// Build the ordered page links for a paginated listing.
///
/// `total` is the number of rows, `current_index` the offset of the first
/// visible row and `page_size` the rows per page. No rows means no links;
/// fewer rows than a page means exactly one. Page count rounds up, link
/// offsets round down. Any arithmetic failure yields an empty sequence,
/// never a partial one.
#[must_use]
pub fn generate_pagination(
    total: usize,
    current_index: usize,
    page_size: usize,
    filter: Option<&str>,
) -> Vec<PaginationLink> {
    if total == 0 || page_size == 0 {
        return Vec::new();
    }

    let Some(rounded) = total.checked_add(page_size - 1) else {
        return Vec::new();
    };
    let page_count = rounded / page_size;

    let mut links = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let Some(start) = index.checked_mul(page_size) else {
            return Vec::new();
        };
        let Some(end) = start.checked_add(page_size) else {
            return Vec::new();
        };

        let link = match filter {
            Some(value) => format!(
                "?start={start}&count={page_size}&filter={}",
                urlencoding::encode(value)
            ),
            None => format!("?start={start}&count={page_size}"),
        };

        links.push(PaginationLink {
            index,
            link,
            current: current_index >= start && current_index < end,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_rows_make_three_pages() {
        let links = generate_pagination(12, 0, 5, None);

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].link, "?start=0&count=5");
        assert_eq!(links[1].link, "?start=5&count=5");
        assert_eq!(links[2].link, "?start=10&count=5");
        assert_eq!(links.iter().map(|l| l.index).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn test_current_flag_marks_containing_page() {
        let links = generate_pagination(12, 5, 5, None);
        assert_eq!(
            links.iter().map(|l| l.current).collect::<Vec<_>>(),
            [false, true, false]
        );

        // Offsets inside a page still mark that page
        let links = generate_pagination(12, 9, 5, None);
        assert!(links[1].current);

        let links = generate_pagination(12, 10, 5, None);
        assert!(links[2].current);
    }

    #[test]
    fn test_no_rows_no_links() {
        assert!(generate_pagination(0, 0, 5, None).is_empty());
    }

    #[test]
    fn test_partial_page_is_one_link() {
        let links = generate_pagination(4, 0, 5, None);
        assert_eq!(links.len(), 1);
        assert!(links[0].current);
    }

    #[test]
    fn test_exact_multiple_has_no_extra_page() {
        assert_eq!(generate_pagination(10, 0, 5, None).len(), 2);
    }

    #[test]
    fn test_filter_is_carried_and_encoded() {
        let links = generate_pagination(6, 0, 5, Some("a b"));
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.link.ends_with("&filter=a%20b")));
    }

    #[test]
    fn test_zero_page_size_is_empty_not_a_panic() {
        assert!(generate_pagination(12, 0, 0, None).is_empty());
    }

    #[test]
    fn test_overflow_yields_empty_sequence() {
        assert!(generate_pagination(usize::MAX, 0, usize::MAX, None).is_empty());
    }
}
