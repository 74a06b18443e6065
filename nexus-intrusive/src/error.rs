use std::collections::TryReserveError;

/// Recoverable failures.
///
/// Contract violations (linking an element twice, unlinking one that was
/// never linked, an index that is not in storage) panic instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("failed to allocate {buckets} hash buckets")]
    Alloc {
        buckets: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("{buckets} buckets cannot be addressed by an index type whose maximum is {max}")]
    TooManyBuckets { buckets: usize, max: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
