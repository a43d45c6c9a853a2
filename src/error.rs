use thiserror::Error;

/// Failures raised by the crate itself. Rejection reasons supplied by callers
/// are carried as their own `E` and never wrapped in this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("promise adoption chain leads back to the adopting promise")]
    Cycle,
    #[error("promise was dropped before it settled")]
    Abandoned,
}
