//! Static contribution settings: labels, commit authors and naming
//! constants. Built once at start-up and handed to the reconcilers.

/// Prefix of every branch opened for a pull/merge request.
pub const PR_BRANCH_PREFIX: &str = "meterian-bot/pr/";
/// Maximum number of commit attempts for a single change-set.
pub const COMMIT_RETRY_LIMIT: u32 = 10;
/// Delay between two commit attempts, in milliseconds.
pub const COMMIT_RETRY_DELAY_MS: u64 = 1000;

/// Background color shared by both labels, as a bare hex string.
pub const LABEL_COLOR: &str = "2883fa";
/// Text color shared by both labels, as a bare hex string.
pub const LABEL_TEXT_COLOR: &str = "ffffff";
pub const PR_LABEL_NAME: &str = "meterian-bot-pr";
pub const PR_LABEL_DESCRIPTION: &str =
    "Pull requests that update dependency files based on Meterian's analysis";
pub const ISSUE_LABEL_NAME: &str = "meterian-bot-issue";
pub const ISSUE_LABEL_DESCRIPTION: &str = "Issue opened to highlight outdated dependencies found by Meterian's analysis";

const BOT_USERNAME: &str = "meterian-bot";
const GITHUB_BOT_EMAIL: &str = "bot.github@meterian.io";
const GITLAB_BOT_EMAIL: &str = "bot.gitlab@meterian.io";

/// Identity used for the commits pushed to contribution branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub username: String,
    pub email: String,
}

impl CommitAuthor {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }

    pub fn github_default() -> Self {
        Self::new(BOT_USERNAME, GITHUB_BOT_EMAIL)
    }

    pub fn gitlab_default() -> Self {
        Self::new(BOT_USERNAME, GITLAB_BOT_EMAIL)
    }
}

/// Attributes of a label applied to opened requests. Colors are stored as
/// bare hex strings; each platform adapter formats them as it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub name: String,
    pub description: String,
    pub color: String,
    pub text_color: String,
}

/// The two labels used process-wide: one for pull/merge requests and one
/// for issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionLabels {
    pub pr: LabelSpec,
    pub issue: LabelSpec,
}

impl Default for ContributionLabels {
    fn default() -> Self {
        Self {
            pr: LabelSpec {
                name: PR_LABEL_NAME.into(),
                description: PR_LABEL_DESCRIPTION.into(),
                color: LABEL_COLOR.into(),
                text_color: LABEL_TEXT_COLOR.into(),
            },
            issue: LabelSpec {
                name: ISSUE_LABEL_NAME.into(),
                description: ISSUE_LABEL_DESCRIPTION.into(),
                color: LABEL_COLOR.into(),
                text_color: LABEL_TEXT_COLOR.into(),
            },
        }
    }
}
