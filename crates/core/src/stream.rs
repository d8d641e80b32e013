//! Stream name helpers.

/// Separates the category from the instance id in a stream name.
pub const STREAM_SEPARATOR: char = '-';

/// Category of a stream name: everything before the first [`STREAM_SEPARATOR`].
///
/// A stream without a separator is its own category; the empty stream
/// ("ungrouped") has the empty category.
pub fn stream_category(stream_name: &str) -> &str {
    match stream_name.split_once(STREAM_SEPARATOR) {
        Some((category, _)) => category,
        None => stream_name,
    }
}
