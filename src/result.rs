//! Result type shared by the plumbing of the crate.
//!
//! Fallible plumbing (CLI validation, report loading, platform client
//! construction) returns this alias so context can be attached with
//! `.wrap_err()` as errors propagate. The platform adapters never let
//! these errors reach the reconcilers: they log and downgrade them.

use color_eyre::eyre::Result as EyreResult;

/// Standard result type used throughout gitbot.
pub type Result<T> = EyreResult<T>;
