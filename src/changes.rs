//! Detection of the dependency fixes the scanner applied on disk.

/// Sentinel report discovery and change-set assembly.
pub mod collector;

/// Locally modified tracked files.
pub mod git;

/// Scanner JSON report model.
pub mod report;

/// Dependency, file change and change-set value types.
pub mod types;
