//! Stateless helpers turning raw values and reasons into deferred values.
use crate::{IntoResolution, Promise, PromiseLike, Resolution};

/// An already fulfilled promise holding `value`.
pub fn resolve<T, E, P>(value: T) -> Promise<T, E, P> {
    Promise::fulfilled(value)
}

/// An already rejected promise holding `reason`.
pub fn reject<T, E, P>(reason: E) -> Promise<T, E, P> {
    Promise::rejected(reason)
}

/// Wraps plain values and reasons in terminal promises. Anything already
/// promise-like comes back unchanged.
pub fn normalize<T, E, P>(resolution: impl IntoResolution<T, E, P>) -> PromiseLike<T, E, P> {
    match resolution.into_resolution() {
        Resolution::Fulfill(value) => PromiseLike::Extended(resolve(value)),
        Resolution::Reject(reason) => PromiseLike::Extended(reject(reason)),
        Resolution::Adopt(like) => like,
    }
}
