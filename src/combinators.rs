//! Aggregation of many promises into one.
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::Promise;

/// Fulfills with every value, in input order, once all inputs fulfill.
/// Rejects with the first rejection. Progress from any input is forwarded.
///
/// # Examples
///
/// ```
/// use promise_then::{combinators::all, Promise};
///
/// let (slow, resolver) = Promise::<i32, String>::pending();
/// let joined = all(vec![Promise::fulfilled(1), slow]);
/// assert_eq!(joined.outcome(), None);
/// resolver.resolve(2);
/// assert_eq!(joined.outcome(), Some(Ok(vec![1, 2])));
/// ```
pub fn all<T, E, P>(promises: impl IntoIterator<Item = Promise<T, E, P>>) -> Promise<Vec<T>, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    let promises: Vec<_> = promises.into_iter().collect();
    if promises.is_empty() {
        return Promise::fulfilled(Vec::new());
    }
    Promise::new(move |resolver| {
        let values = Rc::new(RefCell::new(vec![None; promises.len()]));
        let remaining = Rc::new(Cell::new(promises.len()));
        for (index, promise) in promises.into_iter().enumerate() {
            let values = Rc::clone(&values);
            let remaining = Rc::clone(&remaining);
            let on_fulfilled = resolver.clone();
            let on_rejected = resolver.clone();
            let on_progress = resolver.clone();
            promise.done_with(
                move |value| {
                    values.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let collected: Vec<T> = values.borrow_mut().drain(..).flatten().collect();
                        on_fulfilled.resolve(collected);
                    }
                },
                move |reason| on_rejected.reject(reason),
                move |update| on_progress.notify(update),
            );
        }
        Ok(())
    })
}

/// Settles the same way as whichever input settles first.
///
/// An empty input never settles.
pub fn race<T, E, P>(promises: impl IntoIterator<Item = Promise<T, E, P>>) -> Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    Promise::new(move |resolver| {
        for promise in promises {
            let on_fulfilled = resolver.clone();
            let on_rejected = resolver.clone();
            let on_progress = resolver.clone();
            promise.done_with(
                move |value| on_fulfilled.resolve(value),
                move |reason| on_rejected.reject(reason),
                move |update| on_progress.notify(update),
            );
        }
        Ok(())
    })
}
