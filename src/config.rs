use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::process::{BoardLayout, ProcessKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub kanban: KanbanConfig,
    pub ui: UiConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the table API and tool endpoint live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `https://crm.example.com`
    pub base_url: String,
    /// Path prefix of the PostgREST-like table API
    #[serde(default = "default_table_path")]
    pub table_path: String,
    /// Path of the generic "call tool" endpoint
    #[serde(default = "default_tool_path")]
    pub tool_path: String,
    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Request timeout in seconds (0 = no timeout)
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_table_path() -> String {
    "/rest/v1".to_string()
}

fn default_tool_path() -> String {
    "/api/tools/call".to_string()
}

fn default_api_key_env() -> String {
    "BACKOFFICE_API_KEY".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanConfig {
    /// Seconds between background refreshes of the queue views (default: 60)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Maximum rows fetched per queue view
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Processes shown on the board, in column order
    #[serde(default = "default_processes")]
    pub processes: Vec<ProcessKey>,
    /// View holding per-process counters for the header
    #[serde(default = "default_stats_view")]
    pub stats_view: String,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_page_size() -> usize {
    50
}

fn default_processes() -> Vec<ProcessKey> {
    ProcessKey::all().to_vec()
}

fn default_stats_view() -> String {
    "v_process_dashboard_stats".to_string()
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            page_size: default_page_size(),
            processes: default_processes(),
            stats_view: default_stats_view(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub refresh_rate_ms: u64,
    /// Web console origin used to expand navigation intents into links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_base_url: Option<String>,
    /// Seconds a toast stays on screen
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl_secs: u64,
    /// Toasts kept at once; the oldest is dropped first
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
    /// Initial board layout
    #[serde(default)]
    pub layout: BoardLayout,
}

fn default_notification_ttl() -> u64 {
    8
}

fn default_max_notifications() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in TUI mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

/// Local REST facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    7018
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

impl Config {
    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".backoffice/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Embedded defaults so the console starts without any config file
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/backoffice/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("backoffice").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. BACKOFFICE__BACKEND__BASE_URL
        builder = builder.add_source(
            config::Environment::with_prefix("BACKOFFICE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to `.backoffice/config.toml`
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::project_config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    /// Expand a console-relative path into a full web link when an origin is configured
    pub fn web_link(&self, path: &str) -> String {
        match self.ui.web_base_url {
            Some(ref base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:3000".to_string(),
                table_path: default_table_path(),
                tool_path: default_tool_path(),
                api_key_env: default_api_key_env(),
                timeout_secs: 0,
            },
            kanban: KanbanConfig::default(),
            ui: UiConfig {
                refresh_rate_ms: 250,
                web_base_url: None,
                notification_ttl_secs: default_notification_ttl(),
                max_notifications: default_max_notifications(),
                layout: BoardLayout::default(),
            },
            paths: PathsConfig {
                state: ".backoffice".to_string(),
            },
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
