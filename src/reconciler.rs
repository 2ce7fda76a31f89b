//! Contribution reconciliation: decides, for each change-set or finding,
//! whether a request already exists or a new one must be opened.

/// Issue path.
pub mod issue;

/// Pull/merge request path.
pub mod pull_request;
