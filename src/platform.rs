//! Remote code-hosting platforms: the capability set the reconcilers
//! depend on and its GitHub and GitLab implementations.

/// Platform selection and connection settings.
pub mod config;
/// Builds the adapter matching a [`config::RemoteConfig`].
pub mod factory;
/// GitHub adapter backed by octocrab.
pub mod github;
/// GitLab adapter backed by the async gitlab client.
pub mod gitlab;
/// Request and handle types exchanged with platforms.
pub mod request;
/// The [`traits::Platform`] capability trait.
pub mod traits;
