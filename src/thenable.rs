//! The capability set shared by everything a [`Promise`] can adopt.
//!
//! A [`Thenable`] is the minimal shape: it will eventually report a value or
//! a reason and nothing else. [`Promise`] is the extended shape with progress
//! and `done`. [`PromiseLike`] holds either one, and settlement turns a basic
//! thenable into a promise before anything else touches it.
use std::rc::Rc;

use crate::Promise;

/// Something that eventually succeeds or fails exactly once.
///
/// # Examples
///
/// ```
/// use promise_then::{Promise, PromiseLike, Thenable};
///
/// struct Ready(i32);
///
/// impl Thenable<i32, String> for Ready {
///     fn then(&self, on_fulfilled: Box<dyn FnOnce(i32)>, _: Box<dyn FnOnce(String)>) {
///         on_fulfilled(self.0)
///     }
/// }
///
/// let (promise, resolver) = Promise::<i32, String>::pending();
/// resolver.adopt(PromiseLike::basic(Ready(7))).unwrap();
/// assert_eq!(promise.outcome(), Some(Ok(7)));
/// ```
pub trait Thenable<T, E> {
    fn then(&self, on_fulfilled: Box<dyn FnOnce(T)>, on_rejected: Box<dyn FnOnce(E)>);
}

/// A deferred value of either capability level.
pub enum PromiseLike<T, E, P = ()> {
    Basic(Rc<dyn Thenable<T, E>>),
    Extended(Promise<T, E, P>),
}

impl<T, E, P> PromiseLike<T, E, P> {
    pub fn basic(thenable: impl Thenable<T, E> + 'static) -> Self {
        PromiseLike::Basic(Rc::new(thenable))
    }
}

impl<T, E, P> PromiseLike<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    /// Lifts a basic thenable into a promise that forwards its outcome.
    pub(crate) fn into_extended(self) -> Promise<T, E, P> {
        match self {
            PromiseLike::Extended(promise) => promise,
            PromiseLike::Basic(thenable) => Promise::new(move |resolver| {
                let rejecter = resolver.clone();
                thenable.then(
                    Box::new(move |value| resolver.resolve(value)),
                    Box::new(move |reason| rejecter.reject(reason)),
                );
                Ok(())
            }),
        }
    }
}

impl<T, E, P> From<Promise<T, E, P>> for PromiseLike<T, E, P> {
    fn from(promise: Promise<T, E, P>) -> Self {
        PromiseLike::Extended(promise)
    }
}

/// What a handler hands back to the chain it feeds.
pub enum Resolution<T, E, P = ()> {
    Fulfill(T),
    Reject(E),
    Adopt(PromiseLike<T, E, P>),
}

/// Conversion of handler results into a [`Resolution`].
///
/// `Result` maps `Ok` to fulfillment and `Err` to rejection; promises are
/// adopted.
pub trait IntoResolution<T, E, P = ()> {
    fn into_resolution(self) -> Resolution<T, E, P>;
}

impl<T, E, P> IntoResolution<T, E, P> for Resolution<T, E, P> {
    fn into_resolution(self) -> Resolution<T, E, P> {
        self
    }
}

impl<T, E, P> IntoResolution<T, E, P> for Result<T, E> {
    fn into_resolution(self) -> Resolution<T, E, P> {
        match self {
            Ok(value) => Resolution::Fulfill(value),
            Err(reason) => Resolution::Reject(reason),
        }
    }
}

impl<T, E, P> IntoResolution<T, E, P> for Promise<T, E, P> {
    fn into_resolution(self) -> Resolution<T, E, P> {
        Resolution::Adopt(PromiseLike::Extended(self))
    }
}

impl<T, E, P> IntoResolution<T, E, P> for PromiseLike<T, E, P> {
    fn into_resolution(self) -> Resolution<T, E, P> {
        Resolution::Adopt(self)
    }
}
