//! Typed view over the scanner's JSON report.
use serde::Deserialize;
use url::Url;

use crate::changes::types::Dependency;

/// Query parameter of the report url carrying the project identifier.
const PROJECT_ID_PARAM: &str = "pid";

#[derive(Debug, Default, Deserialize)]
pub struct ScanReport {
    pub url: Option<String>,
    #[serde(default)]
    pub autofix: Option<Autofix>,
    #[serde(default, rename = "manifestInfo")]
    pub manifest_info: Option<ManifestInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Autofix {
    #[serde(default)]
    pub changes: Vec<AutofixChange>,
}

#[derive(Debug, Deserialize)]
pub struct AutofixChange {
    pub name: String,
    #[serde(alias = "ecosystem")]
    pub language: Option<String>,
    pub version: String,
    #[serde(rename = "upgradedTo")]
    pub upgraded_to: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestInfo {
    pub solution: Option<Solution>,
}

#[derive(Debug, Deserialize)]
pub struct Solution {
    pub path: String,
}

impl ScanReport {
    /// Project identifier read from the `pid` query parameter of `url`.
    pub fn project_id(&self) -> Option<String> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == PROJECT_ID_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|pid| !pid.is_empty())
    }

    pub fn changes(&self) -> &[AutofixChange] {
        self.autofix
            .as_ref()
            .map(|autofix| autofix.changes.as_slice())
            .unwrap_or_default()
    }

    /// Dependency bumps declared by the autofix section.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.changes()
            .iter()
            .map(|change| {
                Dependency::new(
                    change.language.clone().unwrap_or_default(),
                    change.name.clone(),
                    change.version.clone(),
                    change.upgraded_to.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn solution_path(&self) -> Option<String> {
        self.manifest_info
            .as_ref()?
            .solution
            .as_ref()
            .map(|solution| solution.path.clone())
    }
}
