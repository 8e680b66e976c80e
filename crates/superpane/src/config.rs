use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use superpane_api::FieldPath;

/// Configuration of one pane: which document type it lists and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    /// Document type listed by the pane
    pub type_name: String,
    pub page_size: usize,
    /// Fields projected into each row, besides `_id`, `_type` and `_updatedAt`
    pub columns: Vec<FieldPath>,
    /// Field the user query is matched against
    pub search_field: Option<FieldPath>,
    pub live_debounce_ms: u64,
    pub search_debounce_ms: u64,
    pub live_updates: bool,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            page_size: 25,
            columns: Vec::new(),
            search_field: None,
            live_debounce_ms: 1000,
            search_debounce_ms: 700,
            live_updates: true,
        }
    }
}

impl PaneConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_columns(mut self, columns: Vec<FieldPath>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_search_field(mut self, field: Option<FieldPath>) -> Self {
        self.search_field = field;
        self
    }

    pub fn with_live_updates(mut self, enabled: bool) -> Self {
        self.live_updates = enabled;
        self
    }

    pub fn live_debounce(&self) -> Duration {
        Duration::from_millis(self.live_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Load a pane configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read pane config {}: {}", path.display(), e)
        })?;
        let config = Self::from_yaml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid pane config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PaneConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.type_name.is_empty() {
            anyhow::bail!("type_name must be set");
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        Ok(())
    }
}
