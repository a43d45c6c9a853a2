use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

use tracing::{debug, trace, warn};

use crate::{normalize, Error, IntoResolution, PromiseLike, Resolution, Resolver};

type Handler<T, E, P> = Box<dyn FnOnce(Promise<T, E, P>)>;
type ProgressHandler<P> = Rc<RefCell<dyn FnMut(P)>>;

enum State<T, E, P> {
    Pending {
        handlers: Vec<Handler<T, E, P>>,
        progress_handlers: Vec<ProgressHandler<P>>,
        /// `Some` while a progress dispatch is running; updates emitted from
        /// inside a listener wait here until the current one is delivered.
        backlog: Option<VecDeque<P>>,
    },
    Fulfilled(T),
    Rejected(E),
    /// Settled; the result lives in (or is still travelling to) another promise.
    Outcome(Promise<T, E, P>),
}

/// A copy of the state taken so no borrow is held while callbacks run.
enum Snapshot<T, E, P> {
    Pending,
    Fulfilled(T),
    Rejected(E),
    Outcome(Promise<T, E, P>),
}

struct Reaction<T, U, E, P> {
    on_fulfilled: Box<dyn FnOnce(T) -> Resolution<U, E, P>>,
    on_rejected: Box<dyn FnOnce(E) -> Resolution<U, E, P>>,
}

/// A value that is settled exactly once, with handlers that may be attached
/// before or after that happens.
///
/// `T` is the success value, `E` the rejection reason and `P` the type of
/// progress updates. Cloning a `Promise` clones the handle, not the state.
///
/// # Examples
///
/// ```
/// use promise_then::Promise;
///
/// let promise = Promise::<i32, String>::new(|resolver| {
///     resolver.resolve(42);
///     Ok(())
/// });
/// let next = promise.then(|value| Ok(value + 1));
/// assert_eq!(next.outcome(), Some(Ok(43)));
/// ```
pub struct Promise<T, E, P = ()> {
    state: Rc<RefCell<State<T, E, P>>>,
}

impl<T, E, P> Clone for Promise<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T, E, P> fmt::Debug for Promise<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.try_borrow() {
            Ok(state) => match &*state {
                State::Pending { .. } => "pending",
                State::Fulfilled(_) => "fulfilled",
                State::Rejected(_) => "rejected",
                State::Outcome(_) => "settled",
            },
            Err(_) => "busy",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T, E, P> Promise<T, E, P> {
    fn with_state(state: State<T, E, P>) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    fn empty() -> Self {
        Self::with_state(State::Pending {
            handlers: Vec::new(),
            progress_handlers: Vec::new(),
            backlog: None,
        })
    }

    /// An already fulfilled promise.
    pub fn fulfilled(value: T) -> Self {
        Self::with_state(State::Fulfilled(value))
    }

    /// An already rejected promise.
    pub fn rejected(reason: E) -> Self {
        Self::with_state(State::Rejected(reason))
    }

    /// `true` once an outcome has been recorded, even if that outcome is an
    /// adopted promise that has not finished yet.
    pub fn is_settled(&self) -> bool {
        !matches!(&*self.state.borrow(), State::Pending { .. })
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Walks the adoption chain starting here and reports whether it reaches
    /// `target`.
    fn leads_to(&self, target: &Self) -> bool {
        let mut current = self.clone();
        loop {
            if current.same_as(target) {
                return true;
            }
            let next = match &*current.state.borrow() {
                State::Outcome(next) => next.clone(),
                _ => return false,
            };
            current = next;
        }
    }
}

impl<T, E, P> Promise<T, E, P>
where
    T: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    /// Runs `resolver` immediately with the capabilities that settle the new
    /// promise. An `Err` returned from `resolver` rejects the promise unless it
    /// was already settled.
    pub fn new<F>(resolver: F) -> Self
    where
        F: FnOnce(Resolver<T, E, P>) -> Result<(), E>,
    {
        let promise = Self::empty();
        if let Err(reason) = resolver(Resolver::new(promise.clone())) {
            debug!("resolver returned an error, rejecting");
            promise.reject(reason);
        }
        promise
    }

    /// A pending promise paired with the handle that settles it.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_then::Promise;
    ///
    /// let (promise, resolver) = Promise::<&str, ()>::pending();
    /// assert!(!promise.is_settled());
    /// resolver.resolve("hi");
    /// assert_eq!(promise.outcome(), Some(Ok("hi")));
    /// ```
    pub fn pending() -> (Self, Resolver<T, E, P>) {
        let promise = Self::empty();
        let resolver = Resolver::new(promise.clone());
        (promise, resolver)
    }

    /// The flattened result, if the adoption chain has reached a value or a
    /// reason.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match self.snapshot() {
            Snapshot::Pending => None,
            Snapshot::Fulfilled(value) => Some(Ok(value)),
            Snapshot::Rejected(reason) => Some(Err(reason)),
            Snapshot::Outcome(outcome) => outcome.outcome(),
        }
    }

    /// Chains a fulfillment handler. Rejections pass through untouched.
    ///
    /// Settlement travels down a chain through nested calls, one group of
    /// stack frames per link. Chains tens of thousands of links long can
    /// exhaust the thread's stack when the head settles.
    pub fn then<U, F, R>(&self, on_fulfilled: F) -> Promise<U, E, P>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E, P>,
    {
        self.chain(
            Reaction {
                on_fulfilled: Box::new(move |value| on_fulfilled(value).into_resolution()),
                on_rejected: Box::new(Resolution::Reject),
            },
            None,
        )
    }

    /// Chains both a fulfillment and a rejection handler.
    pub fn then_or_else<U, F, G, R, S>(&self, on_fulfilled: F, on_rejected: G) -> Promise<U, E, P>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        G: FnOnce(E) -> S + 'static,
        R: IntoResolution<U, E, P>,
        S: IntoResolution<U, E, P>,
    {
        self.chain(
            Reaction {
                on_fulfilled: Box::new(move |value| on_fulfilled(value).into_resolution()),
                on_rejected: Box::new(move |reason| on_rejected(reason).into_resolution()),
            },
            None,
        )
    }

    /// Chains a rejection handler. Values pass through untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use promise_then::Promise;
    ///
    /// let failed = Promise::<String, String>::new(|resolver| {
    ///     resolver.reject("boom".to_string());
    ///     Ok(())
    /// });
    /// let handled = failed.otherwise(|reason| Ok(format!("handled:{reason}")));
    /// assert_eq!(handled.outcome(), Some(Ok("handled:boom".to_string())));
    /// ```
    pub fn otherwise<G, S>(&self, on_rejected: G) -> Self
    where
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<T, E, P>,
    {
        self.chain(
            Reaction {
                on_fulfilled: Box::new(Resolution::Fulfill),
                on_rejected: Box::new(move |reason| on_rejected(reason).into_resolution()),
            },
            None,
        )
    }

    /// Chains a progress transform. An `Err` from the transform is delivered
    /// downstream as a progress update, not as a rejection.
    pub fn progress<H>(&self, on_progress: H) -> Self
    where
        H: FnMut(P) -> Result<P, E> + 'static,
        P: From<E>,
    {
        self.chain(
            Reaction {
                on_fulfilled: Box::new(Resolution::Fulfill),
                on_rejected: Box::new(Resolution::Reject),
            },
            Some(surface_errors(on_progress)),
        )
    }

    /// The complete chaining operator: fulfillment, rejection and progress.
    pub fn then_with<U, F, G, H, R, S>(
        &self,
        on_fulfilled: F,
        on_rejected: G,
        on_progress: H,
    ) -> Promise<U, E, P>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        G: FnOnce(E) -> S + 'static,
        H: FnMut(P) -> Result<P, E> + 'static,
        R: IntoResolution<U, E, P>,
        S: IntoResolution<U, E, P>,
        P: From<E>,
    {
        self.chain(
            Reaction {
                on_fulfilled: Box::new(move |value| on_fulfilled(value).into_resolution()),
                on_rejected: Box::new(move |reason| on_rejected(reason).into_resolution()),
            },
            Some(surface_errors(on_progress)),
        )
    }

    /// Runs `on_settled` on either outcome and passes that outcome on. An
    /// `Err` from `on_settled` replaces it with a rejection.
    pub fn always<F>(&self, on_settled: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        let on_settled = Rc::new(Cell::new(Some(on_settled)));
        let on_failure = Rc::clone(&on_settled);
        self.then_or_else(
            move |value| run_once(&on_settled).map(|()| value),
            move |reason| run_once(&on_failure).and(Err(reason)),
        )
    }

    /// Terminal consumption. Nothing is returned and nothing raised inside the
    /// callbacks is caught here.
    pub fn done<F, G>(&self, on_fulfilled: F, on_rejected: G)
    where
        F: FnOnce(T) + 'static,
        G: FnOnce(E) + 'static,
    {
        self.forward(Box::new(on_fulfilled), Box::new(on_rejected), None)
    }

    /// [`done`](Self::done) with a progress listener.
    pub fn done_with<F, G, H>(&self, on_fulfilled: F, on_rejected: G, on_progress: H)
    where
        F: FnOnce(T) + 'static,
        G: FnOnce(E) + 'static,
        H: FnMut(P) + 'static,
    {
        let on_progress: ProgressHandler<P> = Rc::new(RefCell::new(on_progress));
        self.forward(Box::new(on_fulfilled), Box::new(on_rejected), Some(on_progress))
    }

    fn snapshot(&self) -> Snapshot<T, E, P> {
        match &*self.state.borrow() {
            State::Pending { .. } => Snapshot::Pending,
            State::Fulfilled(value) => Snapshot::Fulfilled(value.clone()),
            State::Rejected(reason) => Snapshot::Rejected(reason.clone()),
            State::Outcome(outcome) => Snapshot::Outcome(outcome.clone()),
        }
    }

    fn chain<U>(
        &self,
        reaction: Reaction<T, U, E, P>,
        on_progress: Option<Box<dyn FnMut(P) -> P>>,
    ) -> Promise<U, E, P>
    where
        U: Clone + 'static,
    {
        match self.snapshot() {
            Snapshot::Fulfilled(value) => {
                normalize::normalize((reaction.on_fulfilled)(value)).into_extended()
            }
            Snapshot::Rejected(reason) => {
                normalize::normalize((reaction.on_rejected)(reason)).into_extended()
            }
            Snapshot::Outcome(outcome) => outcome.chain(reaction, on_progress),
            Snapshot::Pending => {
                let source = self.clone();
                Promise::new(move |resolver| {
                    let progress_handler = relay(resolver.clone(), on_progress);
                    let forwarded = Rc::clone(&progress_handler);
                    let rejecter = resolver.clone();
                    source.enqueue(
                        Box::new(move |outcome: Promise<T, E, P>| {
                            outcome.chain(reaction, None).forward(
                                Box::new(move |value| resolver.resolve(value)),
                                Box::new(move |reason| rejecter.reject(reason)),
                                Some(forwarded),
                            )
                        }),
                        Some(progress_handler),
                    );
                    Ok(())
                })
            }
        }
    }

    fn forward(
        &self,
        on_fulfilled: Box<dyn FnOnce(T)>,
        on_rejected: Box<dyn FnOnce(E)>,
        on_progress: Option<ProgressHandler<P>>,
    ) {
        match self.snapshot() {
            Snapshot::Fulfilled(value) => on_fulfilled(value),
            Snapshot::Rejected(reason) => on_rejected(reason),
            Snapshot::Outcome(outcome) => outcome.forward(on_fulfilled, on_rejected, on_progress),
            Snapshot::Pending => self.enqueue(
                Box::new(move |outcome: Promise<T, E, P>| outcome.forward(on_fulfilled, on_rejected, None)),
                on_progress,
            ),
        }
    }

    /// Queues `handler` while pending. Once settled it runs right away with
    /// the recorded outcome instead.
    fn enqueue(&self, handler: Handler<T, E, P>, on_progress: Option<ProgressHandler<P>>) {
        let outcome = match &mut *self.state.borrow_mut() {
            State::Pending {
                handlers,
                progress_handlers,
                ..
            } => {
                handlers.push(handler);
                progress_handlers.extend(on_progress);
                return;
            }
            State::Outcome(outcome) => outcome.clone(),
            State::Fulfilled(_) | State::Rejected(_) => self.clone(),
        };
        handler(outcome)
    }

    pub(crate) fn resolve(&self, value: T) {
        if self.is_settled() {
            return;
        }
        self.settle(PromiseLike::Extended(normalize::resolve(value)));
    }

    pub(crate) fn reject(&self, reason: E) {
        if self.is_settled() {
            return;
        }
        self.settle(PromiseLike::Extended(normalize::reject(reason)));
    }

    pub(crate) fn adopt(&self, like: PromiseLike<T, E, P>) -> Result<(), Error> {
        if self.is_settled() {
            return Ok(());
        }
        if let PromiseLike::Extended(candidate) = &like {
            if candidate.leads_to(self) {
                warn!("refusing to adopt a promise that resolves through itself");
                return Err(Error::Cycle);
            }
        }
        trace!("adopting another promise");
        self.settle(like);
        Ok(())
    }

    pub(crate) fn notify(&self, update: P) {
        let mut handlers = match &mut *self.state.borrow_mut() {
            State::Pending {
                progress_handlers,
                backlog,
                ..
            } => match backlog {
                Some(backlog) => {
                    backlog.push_back(update);
                    return;
                }
                None => {
                    *backlog = Some(VecDeque::new());
                    progress_handlers.clone()
                }
            },
            _ => return,
        };
        let mut update = update;
        loop {
            trace!(listeners = handlers.len(), "dispatching progress");
            for handler in &handlers {
                if self.is_settled() {
                    return;
                }
                match handler.try_borrow_mut() {
                    Ok(mut handler) => (&mut *handler)(update.clone()),
                    Err(_) => warn!("progress listener is already running, update skipped"),
                }
            }
            let next = match &mut *self.state.borrow_mut() {
                State::Pending {
                    progress_handlers,
                    backlog,
                    ..
                } => match backlog.as_mut().and_then(VecDeque::pop_front) {
                    Some(next) => {
                        handlers = progress_handlers.clone();
                        next
                    }
                    None => {
                        *backlog = None;
                        return;
                    }
                },
                _ => return,
            };
            update = next;
        }
    }

    fn settle(&self, result: PromiseLike<T, E, P>) {
        let outcome = result.into_extended();
        let previous = {
            let mut state = self.state.borrow_mut();
            if !matches!(&*state, State::Pending { .. }) {
                return;
            }
            std::mem::replace(&mut *state, State::Outcome(outcome.clone()))
        };
        let State::Pending { handlers, .. } = previous else {
            return;
        };
        trace!(handlers = handlers.len(), "promise settled");
        for handler in handlers {
            handler(outcome.clone());
        }
    }
}

/// Feeds progress into `resolver`, through `transform` when one is given.
fn relay<U, E, P>(
    resolver: Resolver<U, E, P>,
    transform: Option<Box<dyn FnMut(P) -> P>>,
) -> ProgressHandler<P>
where
    U: Clone + 'static,
    E: Clone + 'static,
    P: Clone + 'static,
{
    let Some(mut transform) = transform else {
        return Rc::new(RefCell::new(move |update| resolver.notify(update)));
    };
    Rc::new(RefCell::new(move |update| resolver.notify(transform(update))))
}

/// Folds a fallible progress transform into one whose errors become updates.
fn surface_errors<E, P, H>(mut on_progress: H) -> Box<dyn FnMut(P) -> P>
where
    H: FnMut(P) -> Result<P, E> + 'static,
    P: From<E> + 'static,
{
    Box::new(move |update| match on_progress(update) {
        Ok(update) => update,
        Err(error) => P::from(error),
    })
}

fn run_once<E, F>(slot: &Cell<Option<F>>) -> Result<(), E>
where
    F: FnOnce() -> Result<(), E>,
{
    match slot.take() {
        Some(callback) => callback(),
        None => Ok(()),
    }
}
