/// `LIMIT` and `OFFSET` for a zero-based page. Out-of-range input is clamped
/// so the query never sees a negative bound.
pub fn page_window(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
    let offset = page.unwrap_or(0).max(0).saturating_mul(limit);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        assert_eq!(page_window(None, None, 50, 200), (50, 0));
        assert_eq!(page_window(Some(2), Some(20), 50, 200), (20, 40));
    }

    #[test]
    fn negative_input_is_clamped() {
        assert_eq!(page_window(Some(-3), Some(-10), 50, 200), (1, 0));
        assert_eq!(page_window(Some(1), Some(0), 50, 200), (1, 1));
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(page_window(Some(1), Some(10_000), 50, 200), (200, 200));
        assert_eq!(page_window(Some(i64::MAX), Some(200), 50, 200).1, i64::MAX);
    }
}
