use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NamespaceInfo {
    pub full_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectInfo {
    pub path_with_namespace: String,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub issues_enabled: bool,
    pub namespace: NamespaceInfo,
}

#[derive(Debug, Deserialize)]
pub struct FileInfo {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct BranchInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequestInfo {
    pub iid: u64,
    pub web_url: String,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueInfo {
    pub iid: u64,
    pub web_url: String,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatedCommit {
    pub id: String,
}
