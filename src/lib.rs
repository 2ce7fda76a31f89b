pub mod branch;
pub mod changes;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod platform;
pub mod reconciler;
pub mod recorder;
pub mod result;

pub use cli::{Action, Args};
pub use result::Result;

#[cfg(test)]
pub mod test_helpers;
