//! Backend-to-UI events and error modeling for the desktop GUI controller.

use std::path::PathBuf;

use shared::{
    error::{RemoteError, WorkflowError},
    protocol::{GeneratedLabel, LegacyUploadResponse, ParsedReport},
};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    ParseSettled(Result<ParsedReport, RemoteError>),
    GenerateSettled(Result<GeneratedLabel, RemoteError>),
    LegacyUploadSettled(Result<LegacyUploadResponse, RemoteError>),
    PreviewLoaded { url: String, bytes: Vec<u8> },
    ArtifactSaved { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    Server,
    Transport,
    Io,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Workflow,
    Preview,
    Download,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("could not reach")
            || message_lower.contains("connection")
            || message_lower.contains("timed out")
            || message_lower.contains("dns")
            || message_lower.contains("disconnected")
            || message_lower.contains("queue is full")
        {
            UiErrorCategory::Transport
        } else if message_lower.contains("could not write")
            || message_lower.contains("permission denied")
            || message_lower.contains("no such file")
        {
            UiErrorCategory::Io
        } else if message_lower.contains("unexpected response")
            || message_lower.contains("status")
            || message_lower.contains("http 5")
        {
            UiErrorCategory::Server
        } else if message_lower.contains("must not be blank")
            || message_lower.contains("select a report")
            || message_lower.contains("invalid")
        {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_workflow(error: &WorkflowError) -> Self {
        let category = match error {
            WorkflowError::LocalValidation(_) => UiErrorCategory::Validation,
            WorkflowError::Remote(RemoteError::Server(_) | RemoteError::Malformed(_)) => {
                UiErrorCategory::Server
            }
            WorkflowError::Remote(RemoteError::Transport(_)) => UiErrorCategory::Transport,
        };
        Self {
            category,
            context: UiErrorContext::Workflow,
            message: error.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category,
            UiErrorCategory::Transport | UiErrorCategory::Server
        )
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
