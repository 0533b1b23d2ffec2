//! The result-state type emitted by every repository operation.
//!
//! A single logical request produces an ordered sequence of `DataState`
//! values: `Loading`, then possibly a cached `Success`, then a refreshed
//! `Success` or an `Error`. No panic or raw error ever crosses the
//! repository boundary - everything is folded into a `DataState`.

use std::sync::Arc;

use crate::error::LotteryError;

#[derive(Debug, Clone)]
pub enum DataState<T> {
    /// Fetch in progress; no payload yet.
    Loading,
    /// Payload available (cached or freshly fetched).
    Success(T),
    /// Nothing to show; carries the diagnostic cause.
    Error(Arc<LotteryError>),
}

impl<T> DataState<T> {
    /// Wrap any repository-level failure as an `Error` state.
    pub fn failed(cause: impl Into<LotteryError>) -> Self {
        DataState::Error(Arc::new(cause.into()))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DataState::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DataState::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DataState::Error(_))
    }

    /// Consume the state, yielding the payload if present.
    pub fn into_success(self) -> Option<T> {
        match self {
            DataState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LotteryError> {
        match self {
            DataState::Error(cause) => Some(cause),
            _ => None,
        }
    }
}
