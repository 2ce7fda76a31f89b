//! Configuration for remote platform connections.
use clap::ValueEnum;
use secrecy::SecretString;

/// Default API url of GitHub.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
/// Default url of GitLab.
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
/// Supported code-hosting platforms.
pub enum PlatformType {
    #[default]
    Github,
    Gitlab,
}

impl PlatformType {
    /// Environment variable the access token is read from when not passed
    /// on the command line.
    pub fn token_env_var(&self) -> &'static str {
        match self {
            PlatformType::Github => "GITHUB_TOKEN",
            PlatformType::Gitlab => "GITLAB_TOKEN",
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            PlatformType::Github => DEFAULT_GITHUB_API_URL,
            PlatformType::Gitlab => DEFAULT_GITLAB_API_URL,
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::Github => f.write_str("GitHub"),
            PlatformType::Gitlab => f.write_str("GitLab"),
        }
    }
}

/// Remote repository connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub platform: PlatformType,
    /// API base url, e.g. `https://api.github.com`.
    pub api_base_url: String,
    /// `owner/name` or `group/project` path of the repository.
    pub repository: String,
    /// Access token for authentication.
    pub token: SecretString,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            platform: PlatformType::Github,
            api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
            repository: "".to_string(),
            token: SecretString::from("".to_string()),
        }
    }
}
