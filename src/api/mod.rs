//! Remote fetch boundary: HTTP client, wire DTOs, and API errors.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{FetchClient, LotteryApiClient};
pub use dto::{DrawPayload, Envelope, PrizeTierPayload, WinnerDetailPayload, ENVELOPE_SUCCESS};
pub use error::ApiError;
