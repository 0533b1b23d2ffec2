//! Crate-level error taxonomy.
//!
//! `LotteryError` is the single cause type carried by [`DataState::Error`];
//! it folds the API and store failure domains together so consumers never
//! need to know which stage of the pipeline degraded.
//!
//! [`DataState::Error`]: crate::state::DataState::Error

use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("unknown lottery code: {0}")]
    UnknownCode(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LotteryError {
    /// True for failures that came from the remote service itself
    /// (application-level status), as opposed to transport or local faults.
    pub fn is_service_error(&self) -> bool {
        matches!(self, LotteryError::Api(ApiError::Service { .. }))
    }
}
