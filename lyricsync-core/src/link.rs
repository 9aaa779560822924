//! Directed dependency edges between cells.

use crate::store::{Observable, Subscription, Writable};

/// Keep `downstream` in sync with `upstream`.
///
/// `derive` runs synchronously on the current upstream value when the link is
/// made and again on every upstream change. `Some(value)` is written to
/// `downstream`; `None` leaves it untouched. The edge is removed when the
/// returned [`Subscription`] is dropped.
pub fn link<U, D, O, F>(upstream: &O, downstream: &Writable<D>, derive: F) -> Subscription
where
    U: 'static,
    O: Observable<U>,
    D: Clone + Send + Sync + 'static,
    F: Fn(&U) -> Option<D> + Send + Sync + 'static,
{
    let downstream = downstream.clone();
    upstream.subscribe(move |value: &U| {
        if let Some(derived) = derive(value) {
            downstream.set(derived);
        }
    })
}
