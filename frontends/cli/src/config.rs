use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use superpane::PaneConfig;
use superpane_http::HttpStoreConfig;

/// Everything the browser reads from its config file.
///
/// Without a `store` section the browser runs against the demo dataset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub pane: Option<PaneConfig>,
    pub store: Option<HttpStoreConfig>,
}

impl BrowserConfig {
    /// Load browser configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;
        let config: BrowserConfig = serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        if let Some(pane) = &config.pane {
            pane.validate()
                .map_err(|e| anyhow::anyhow!("Invalid pane in {}: {}", path.display(), e))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_pane_and_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "pane:\n  type_name: article\n  page_size: 5\nstore:\n  project_id: abc\n  dataset: staging\n"
        )
        .unwrap();

        let config = BrowserConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.pane.unwrap().page_size, 5);
        assert_eq!(config.store.unwrap().dataset, "staging");
    }

    #[test]
    fn invalid_pane_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "pane:\n  type_name: article\n  page_size: 0\n").unwrap();
        let err = BrowserConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid pane"));
    }
}
