//! Deferred values for rust.
//!
//! A [`Promise`] starts pending and is settled exactly once, either fulfilled
//! with a value or rejected with a reason. Handlers attached with
//! [`Promise::then`] and friends run with the eventual outcome no matter
//! whether they were attached before or after settlement. Settling with
//! another promise adopts its outcome, however deep the chain goes. Progress
//! updates can be emitted while a promise is pending.
//!
//! Everything runs synchronously on the calling thread; there is no
//! scheduler. Promises are `Rc`-based and stay on one thread.
//!
//! ```
//! use promise_then::Promise;
//!
//! let (promise, resolver) = Promise::<i32, String, u8>::pending();
//! let doubled = promise.then(|value| Ok(value * 2));
//! resolver.notify(50);
//! resolver.resolve(21);
//! assert_eq!(doubled.outcome(), Some(Ok(42)));
//! ```
pub mod combinators;
mod error;
pub mod normalize;
mod promise;
mod resolver;
mod thenable;
mod waiter;

pub use error::Error;
pub use normalize::{reject, resolve};
pub use promise::Promise;
pub use resolver::Resolver;
pub use thenable::{IntoResolution, PromiseLike, Resolution, Thenable};
pub use waiter::Waiter;
