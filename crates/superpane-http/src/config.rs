use serde::{Deserialize, Serialize};
use superpane_api::{PaneError, Result};

/// Where and how to reach the query API.
///
/// Either `project_id` (hosted API) or `base_url` (anything else, e.g. a
/// local proxy) must be set. `base_url` wins when both are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    pub project_id: Option<String>,
    pub base_url: Option<String>,
    pub dataset: String,
    pub api_version: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            base_url: None,
            dataset: "production".to_string(),
            api_version: "v1".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl HttpStoreConfig {
    pub fn for_project(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn for_base_url(base_url: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `{base}/{api_version}`
    pub fn api_root(&self) -> Result<String> {
        let base = match (&self.base_url, &self.project_id) {
            (Some(base), _) => base.trim_end_matches('/').to_string(),
            (None, Some(project)) => format!("https://{}.api.sanity.io", project),
            (None, None) => {
                return Err(PaneError::fetch(
                    "Store config needs either project_id or base_url",
                ));
            }
        };
        Ok(format!("{}/{}", base, self.api_version.trim_matches('/')))
    }

    pub fn query_url(&self) -> Result<String> {
        Ok(format!("{}/data/query/{}", self.api_root()?, self.dataset))
    }

    pub fn listen_url(&self) -> Result<String> {
        Ok(format!("{}/data/listen/{}", self.api_root()?, self.dataset))
    }
}
