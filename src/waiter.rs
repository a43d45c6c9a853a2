//! A waiter turns a [`Promise`] into a [`Future`] so it can be `.await`ed.
//!
//! The waiter does not keep the promise alive. If every handle to a pending
//! promise is dropped, nobody can settle it any more and the waiter finishes
//! with [`Error::Abandoned`].
use std::{
    cell::RefCell,
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use crate::{Error, Promise};

#[derive(Debug)]
enum WakerState {
    Fresh,
    Tainted,
}

#[derive(Debug)]
struct Slot<T, E> {
    value: Option<Result<T, E>>,
    waker: Result<Waker, WakerState>,
}

/// Future returned by [`Promise::waiter`].
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
/// use futures::executor::block_on;
///
/// let (promise, resolver) = Promise::<i32, String>::pending();
/// resolver.resolve(3);
/// assert_eq!(block_on(promise.waiter()), Ok(Ok(3)));
/// ```
#[derive(Debug)]
pub struct Waiter<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

/// Held by the `done` callbacks. Dropping it unfilled taints the slot.
struct Signal<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Signal<T, E> {
    fn fill(&self, value: Result<T, E>) {
        let waker = {
            let mut slot = self.slot.borrow_mut();
            slot.value = Some(value);
            std::mem::replace(&mut slot.waker, Err(WakerState::Tainted))
        };
        if let Ok(waker) = waker {
            waker.wake()
        }
    }
}

impl<T, E> Drop for Signal<T, E> {
    fn drop(&mut self) {
        let waker = {
            let mut slot = self.slot.borrow_mut();
            if slot.value.is_some() {
                return;
            }
            std::mem::replace(&mut slot.waker, Err(WakerState::Tainted))
        };
        if let Ok(waker) = waker {
            tracing::debug!("waited-on promise dropped while pending");
            waker.wake()
        }
    }
}

impl<T, E> Future for Waiter<T, E> {
    type Output = Result<Result<T, E>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        match slot.value.take() {
            Some(value) => Poll::Ready(Ok(value)),
            None => match std::mem::replace(&mut slot.waker, Ok(cx.waker().clone())) {
                Err(WakerState::Tainted) => Poll::Ready(Err(Error::Abandoned)),
                _ => Poll::Pending,
            },
        }
    }
}

impl<T, E, P> Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    /// A future that completes with this promise's flattened outcome.
    pub fn waiter(&self) -> Waiter<T, E> {
        let slot = Rc::new(RefCell::new(Slot {
            value: None,
            waker: Err(WakerState::Fresh),
        }));
        let signal = Rc::new(Signal {
            slot: Rc::clone(&slot),
        });
        let on_rejected = Rc::clone(&signal);
        self.done(
            move |value| signal.fill(Ok(value)),
            move |reason| on_rejected.fill(Err(reason)),
        );
        Waiter { slot }
    }
}

impl<T, E, P> IntoFuture for Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    type Output = Result<Result<T, E>, Error>;
    type IntoFuture = Waiter<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.waiter()
    }
}
