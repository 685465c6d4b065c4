use crate::types::Page;

/// Trims an over-fetched result set (queried with `limit + 1`) down to
/// `limit` rows. The next cursor is the last kept row's key, and is only set
/// when the extra row proved that more data exists.
pub fn paginate<T, F>(mut rows: Vec<T>, limit: i64, get_cursor: F) -> Page<T>
where
    F: Fn(&T) -> String,
{
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_more {
        rows.last().map(&get_cursor).unwrap_or_default()
    } else {
        String::new()
    };
    Page {
        items: rows,
        next_cursor,
    }
}
