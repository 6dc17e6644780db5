//! GitHub REST API client
//!
//! Authenticated read-only access to the three endpoints the metrics
//! tools need: repository metadata, the paginated commit listing, and
//! per-language byte statistics.

mod client;

pub use client::{GithubClient, RepoInfo, BYTES_PER_LINE};

/// True when a `Link` response header advertises a `rel="next"` page.
///
/// A missing or unparseable header is treated as "no more pages" by the
/// callers; terminating the page loop is the fail-safe direction.
pub(crate) fn has_next_page(link_header: &str) -> bool {
    link_header
        .split(',')
        .any(|part| part.contains("rel=\"next\""))
}

/// Extract the page number of the `rel="last"` link, if present.
///
/// With `per_page=1`, that page number equals the total commit count.
pub(crate) fn last_page(link_header: &str) -> Option<u64> {
    for part in link_header.split(',') {
        if !part.contains("rel=\"last\"") {
            continue;
        }
        let url = part
            .split(';')
            .next()?
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        let (_, query) = url.split_once('?')?;
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("page=") {
                return value.parse().ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_WITH_NEXT: &str = "<https://api.github.com/repos/o/r/commits?page=2>; rel=\"next\", <https://api.github.com/repos/o/r/commits?page=9>; rel=\"last\"";
    const LINK_LAST_ONLY: &str =
        "<https://api.github.com/repos/o/r/commits?per_page=1&page=137>; rel=\"last\"";

    #[test]
    fn test_has_next_page() {
        assert!(has_next_page(LINK_WITH_NEXT));
        assert!(!has_next_page(LINK_LAST_ONLY));
        assert!(!has_next_page(""));
        assert!(!has_next_page("garbage"));
    }

    #[test]
    fn test_last_page() {
        assert_eq!(last_page(LINK_WITH_NEXT), Some(9));
        // per_page must not be mistaken for the page parameter
        assert_eq!(last_page(LINK_LAST_ONLY), Some(137));
        assert_eq!(last_page(""), None);
        assert_eq!(last_page("<https://x>; rel=\"next\""), None);
    }
}
