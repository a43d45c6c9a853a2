use crate::{Error, IntoResolution, Promise, PromiseLike, Resolution};

/// The capabilities that settle one [`Promise`]: fulfill, reject and notify.
///
/// Handed to the closure given to [`Promise::new`], or returned by
/// [`Promise::pending`]. Every method is a no-op once the promise is settled.
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
///
/// let (promise, resolver) = Promise::<i32, String, u8>::pending();
/// resolver.notify(50);
/// resolver.resolve(1);
/// resolver.reject("ignored".to_string());
/// assert_eq!(promise.outcome(), Some(Ok(1)));
/// ```
#[derive(Debug)]
pub struct Resolver<T, E, P = ()> {
    promise: Promise<T, E, P>,
}

impl<T, E, P> Clone for Resolver<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T, E, P> Resolver<T, E, P> {
    pub(crate) fn new(promise: Promise<T, E, P>) -> Self {
        Self { promise }
    }

    /// The promise this resolver settles.
    pub fn promise(&self) -> Promise<T, E, P> {
        self.promise.clone()
    }

    /// Whether the promise has been settled, adopted promises included.
    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }
}

impl<T, E, P> Resolver<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    /// Fulfills the promise with `value`. Does nothing once settled.
    pub fn resolve(&self, value: T) {
        self.promise.resolve(value)
    }

    /// Rejects the promise with `reason`. Does nothing once settled.
    pub fn reject(&self, reason: E) {
        self.promise.reject(reason)
    }

    /// Emits a progress update to every listener, in registration order.
    /// Updates sent after settlement are dropped. An update sent from inside
    /// a listener is delivered once the current one has reached everyone.
    pub fn notify(&self, update: P) {
        self.promise.notify(update)
    }

    /// Settles by taking on the eventual outcome of `other`.
    ///
    /// Fails with [`Error::Cycle`] when `other` already resolves through this
    /// promise; the promise is left untouched in that case.
    pub fn adopt(&self, other: impl Into<PromiseLike<T, E, P>>) -> Result<(), Error> {
        self.promise.adopt(other.into())
    }

    /// Dispatches a handler-style result to [`resolve`](Self::resolve),
    /// [`reject`](Self::reject) or [`adopt`](Self::adopt).
    pub fn settle(&self, resolution: impl IntoResolution<T, E, P>) -> Result<(), Error> {
        match resolution.into_resolution() {
            Resolution::Fulfill(value) => self.resolve(value),
            Resolution::Reject(reason) => self.reject(reason),
            Resolution::Adopt(like) => return self.adopt(like),
        }
        Ok(())
    }
}
