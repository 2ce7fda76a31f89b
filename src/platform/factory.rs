//! Factory for creating platform implementations based on configuration.
use log::*;

use crate::{
    Result,
    platform::{
        config::{PlatformType, RemoteConfig},
        github::Github,
        gitlab::Gitlab,
        traits::Platform,
    },
};

/// Factory for creating platform implementations.
pub struct PlatformFactory;

impl PlatformFactory {
    /// Create the platform adapter for `config`, authenticating and loading
    /// the repository metadata.
    pub async fn create(config: &RemoteConfig) -> Result<Box<dyn Platform>> {
        debug!(
            "connecting to {} at {} for {}",
            config.platform, config.api_base_url, config.repository
        );

        let platform: Box<dyn Platform> = match config.platform {
            PlatformType::Github => Self::create_github(config).await?,
            PlatformType::Gitlab => Self::create_gitlab(config).await?,
        };

        info!(
            "loaded repository {} (default branch {})",
            platform.full_name(),
            platform.default_branch()
        );

        Ok(platform)
    }

    async fn create_github(config: &RemoteConfig) -> Result<Box<dyn Platform>> {
        Ok(Box::new(Github::new(config.clone()).await?))
    }

    async fn create_gitlab(config: &RemoteConfig) -> Result<Box<dyn Platform>> {
        Ok(Box::new(Gitlab::new(config.clone()).await?))
    }
}
