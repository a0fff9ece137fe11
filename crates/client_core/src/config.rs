use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

use crate::workflow::{EndpointFlow, ErrorRecovery, WorkflowOptions};

pub const SETTINGS_FILE: &str = "labelgen.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub manual_mode: bool,
    pub legacy_flow: bool,
    pub reset_on_error: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            manual_mode: true,
            legacy_flow: false,
            reset_on_error: false,
        }
    }
}

impl ClientSettings {
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            manual_mode: self.manual_mode,
            flow: if self.legacy_flow {
                EndpointFlow::LegacyUpload
            } else {
                EndpointFlow::Split
            },
            error_recovery: if self.reset_on_error {
                ErrorRecovery::ResetToStart
            } else {
                ErrorRecovery::PreserveInput
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    manual_mode: Option<bool>,
    legacy_flow: Option<bool>,
    reset_on_error: Option<bool>,
}

/// Defaults, then `labelgen.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.server_url {
                    settings.server_url = v;
                }
                if let Some(v) = file_cfg.manual_mode {
                    settings.manual_mode = v;
                }
                if let Some(v) = file_cfg.legacy_flow {
                    settings.legacy_flow = v;
                }
                if let Some(v) = file_cfg.reset_on_error {
                    settings.reset_on_error = v;
                }
            }
            Err(err) => warn!(path = %path.display(), %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("LABELGEN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__MANUAL_MODE").and_then(|v| parse_flag(&v)) {
        settings.manual_mode = v;
    }
    if let Some(v) = env("APP__LEGACY_FLOW").and_then(|v| parse_flag(&v)) {
        settings.legacy_flow = v;
    }
    if let Some(v) = env("APP__RESET_ON_ERROR").and_then(|v| parse_flag(&v)) {
        settings.reset_on_error = v;
    }

    settings.server_url = normalize_server_url(&settings.server_url);
    settings
}

pub fn normalize_server_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return ClientSettings::default().server_url;
    }
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
