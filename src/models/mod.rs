//! Domain models for lottery draw data.
//!
//! - `DrawRecord`: one decoded drawing, immutable once constructed
//! - `WinnerDetail` / `PrizeTier`: optional prize-breakdown structure
//! - `GameKind`: the fixed enumeration of known game types and their rules

pub mod draw;
pub mod game;

pub use draw::{DrawRecord, PrizeTier, WinnerDetail};
pub use game::GameKind;
