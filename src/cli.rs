//! CLI argument parsing and platform configuration.
use std::{env, path::PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use secrecy::SecretString;

use crate::{
    config::CommitAuthor,
    error::GitbotError,
    platform::config::{PlatformType, RemoteConfig},
    recorder::RECORD_ENDPOINT,
    result::Result,
};

/// Contribution to open on the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Open pull/merge requests for the dependency fixes found locally.
    Pr,
    /// Open an issue describing the findings of the report.
    Issue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for simplelog::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => simplelog::LevelFilter::Error,
            LogLevel::Warn => simplelog::LevelFilter::Warn,
            LogLevel::Info => simplelog::LevelFilter::Info,
            LogLevel::Debug => simplelog::LevelFilter::Debug,
            LogLevel::Trace => simplelog::LevelFilter::Trace,
        }
    }
}

/// Opens pull requests, merge requests and issues from scan results.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Contribution to open.
    #[arg(value_enum)]
    pub action: Action,

    /// Path to the JSON scan report. The issue text is generated from it;
    /// for the pr action it is only validated, the text comes from the
    /// reports left beside each fixed manifest.
    pub report: PathBuf,

    /// Repository as owner/name (GitHub) or group/project (GitLab).
    pub repository: String,

    /// Base branch the contribution targets. Must exist remotely.
    pub branch: String,

    #[arg(long, value_enum, default_value_t = PlatformType::Github)]
    /// Code-hosting platform of the repository.
    pub platform: PlatformType,

    #[arg(long, default_value = "")]
    /// API base url. Defaults to the public instance of the platform.
    pub api_base_url: String,

    #[arg(long, default_value = "")]
    /// Access token. Falls back to GITHUB_TOKEN or GITLAB_TOKEN env var.
    pub token: String,

    #[arg(long, default_value = ".")]
    /// Working directory holding the fixed manifests.
    pub workdir: PathBuf,

    #[arg(long)]
    /// PDF report committed alongside the fixes (pr action only).
    pub with_pdf_report: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    /// Always open new pull requests, never reusing earlier branches.
    pub always_open_prs: bool,

    #[arg(long)]
    /// Commit author name.
    pub author_name: Option<String>,

    #[arg(long)]
    /// Commit author email.
    pub author_email: Option<String>,

    #[arg(long)]
    /// Exclusion filter forwarded to the text generation service.
    pub exclude: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Record opened pull requests. Requires METERIAN_API_TOKEN.
    pub record_prs: bool,

    #[arg(long, default_value = RECORD_ENDPOINT)]
    /// Endpoint opened pull requests are recorded to.
    pub record_endpoint: String,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    /// Log level.
    pub log: LogLevel,
}

impl Args {
    /// Configure the remote repository connection from CLI arguments.
    pub fn get_remote(&self) -> Result<RemoteConfig> {
        if self.repository.trim_matches('/').split('/').count() < 2 {
            return Err(GitbotError::InvalidArgs(format!(
                "repository {} must be in the form owner/name",
                self.repository
            ))
            .into());
        }

        let mut token = self.token.clone();

        if token.is_empty()
            && let Ok(env_var_token) = env::var(self.platform.token_env_var())
        {
            token = env_var_token;
        }

        if token.is_empty() {
            return Err(GitbotError::PlatformUnavailable {
                platform: self.platform.to_string(),
                env_var: self.platform.token_env_var(),
            }
            .into());
        }

        let api_base_url = if self.api_base_url.is_empty() {
            self.platform.default_api_url().to_string()
        } else {
            self.api_base_url.trim_end_matches('/').to_string()
        };

        if !api_base_url.starts_with("http://")
            && !api_base_url.starts_with("https://")
        {
            return Err(eyre!(
                "only http and https schemes are supported for api urls"
            ));
        }

        Ok(RemoteConfig {
            platform: self.platform,
            api_base_url,
            repository: self.repository.trim_matches('/').to_string(),
            token: SecretString::from(token),
        })
    }

    /// Commit author, the platform's bot identity unless overridden.
    pub fn author(&self) -> CommitAuthor {
        let default = match self.platform {
            PlatformType::Github => CommitAuthor::github_default(),
            PlatformType::Gitlab => CommitAuthor::gitlab_default(),
        };

        CommitAuthor::new(
            self.author_name.clone().unwrap_or(default.username),
            self.author_email.clone().unwrap_or(default.email),
        )
    }
}
