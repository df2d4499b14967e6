use serde::Serialize;

pub(crate) const fn default_limit() -> i64 {
    100
}

/// Clamps a requested window to `skip >= 0` and `1 <= limit <= max_limit`.
pub(crate) fn bounds(skip: i64, limit: i64, max_limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, max_limit))
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

#[cfg(test)]
mod tests {
    use super::bounds;

    #[test]
    fn bounds_clamp_window() {
        assert_eq!(bounds(-5, 0, 100), (0, 1));
        assert_eq!(bounds(40, 20, 100), (40, 20));
        assert_eq!(bounds(0, 5000, 100), (0, 100));
    }
}
