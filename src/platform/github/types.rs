use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct GithubBlob {
    pub content: String,
    pub encoding: String,
}

#[derive(Debug, Serialize)]
pub struct GithubTreeEntry {
    pub path: String,
    pub mode: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct GithubTree {
    pub base_tree: String,
    pub tree: Vec<GithubTreeEntry>,
}

#[derive(Debug, Serialize)]
pub struct GithubCommitAuthor {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct GithubCommit {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: GithubCommitAuthor,
}

/// Any git object reply where only the sha matters (blob, tree, commit).
#[derive(Debug, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

pub const TREE_BLOB_MODE: &str = "100644";
pub const TREE_BLOB_TYPE: &str = "blob";
pub const BLOB_ENCODING: &str = "base64";
