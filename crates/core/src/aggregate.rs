//! Aggregate types and their canonical event stream names.
//!
//! An aggregate *type* owns a stream category (`"Cart"`); each aggregate
//! *instance* writes to its own stream inside that category (`"Cart-<id>"`).
//! Event shapes declared "under" an aggregate filter on the category name.

use core::fmt::Display;

use crate::stream::STREAM_SEPARATOR;

/// Marker for types that own an event stream.
///
/// ```ignore
/// struct Cart;
///
/// impl AggregateType for Cart {
///     const AGGREGATE_TYPE: &'static str = "Cart";
/// }
///
/// assert_eq!(event_stream_name::<Cart>(), "Cart");
/// ```
pub trait AggregateType {
    /// Stable aggregate type name. Must not contain [`STREAM_SEPARATOR`].
    const AGGREGATE_TYPE: &'static str;
}

/// Canonical stream name for an aggregate type.
pub fn event_stream_name<A>() -> &'static str
where
    A: AggregateType + ?Sized,
{
    A::AGGREGATE_TYPE
}

/// Stream name of one aggregate instance (`<type>-<id>`).
pub fn instance_stream_name<A>(id: impl Display) -> String
where
    A: AggregateType + ?Sized,
{
    format!("{}{}{}", A::AGGREGATE_TYPE, STREAM_SEPARATOR, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_category;

    struct Cart;

    impl AggregateType for Cart {
        const AGGREGATE_TYPE: &'static str = "Cart";
    }

    #[test]
    fn canonical_stream_name_is_the_aggregate_type() {
        assert_eq!(event_stream_name::<Cart>(), "Cart");
    }

    #[test]
    fn instance_streams_belong_to_the_type_category() {
        let stream = instance_stream_name::<Cart>(123);

        assert_eq!(stream, "Cart-123");
        assert_eq!(stream_category(&stream), event_stream_name::<Cart>());
    }
}
