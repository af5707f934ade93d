use serde::{Deserialize, Serialize};

/// Configuration from `.tasktree/config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasteConfig {
    /// Appended to the name of a single pasted root
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,
}

impl Default for PasteConfig {
    fn default() -> Self {
        PasteConfig {
            copy_suffix: default_copy_suffix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_true")]
    pub show_completed: bool,
    /// Whether the detail pane is visible (gates task list → detail focus)
    #[serde(default = "default_true")]
    pub detail_pane: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            show_completed: true,
            detail_pane: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdConfig {
    /// Prefix for generated task IDs
    #[serde(default = "default_id_prefix")]
    pub prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        IdConfig {
            prefix: default_id_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, overridden by `TASKTREE_LOG`
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_copy_suffix() -> String {
    " (copy)".to_string()
}

fn default_id_prefix() -> String {
    "t".to_string()
}
