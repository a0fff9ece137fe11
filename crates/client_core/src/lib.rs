use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::ReportFile,
    error::RemoteError,
    protocol::{
        decode_response, GenerateRequest, GeneratedLabel, LegacyUploadResponse, ParsedReport,
        FILE_PART_NAME, GENERATE_PATH, PARSE_PATH, UPLOAD_PATH,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod driver;
pub mod workflow;

pub use driver::WorkflowDriver;
pub use workflow::{
    EndpointFlow, ErrorRecovery, Event, Intent, PendingRequest, Workflow, WorkflowOptions,
};

#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid label server url '{url}': {source}")]
    InvalidServerUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("label server url '{0}' cannot be used as a base url")]
    NotABaseUrl(String),
}

/// The label server as seen by the workflow: three opaque transforms plus
/// artifact download.
#[async_trait]
pub trait LabelService: Send + Sync {
    async fn parse_report(&self, file: &ReportFile) -> Result<ParsedReport, RemoteError>;
    async fn generate_label(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedLabel, RemoteError>;
    async fn upload_report(&self, file: &ReportFile) -> Result<LegacyUploadResponse, RemoteError>;
    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, RemoteError>;
}

/// Parses a server URL into a base that relative paths can be joined onto.
/// The path always ends with `/`.
pub fn parse_base_url(server_url: &str) -> Result<Url, ClientSetupError> {
    let mut base_url =
        Url::parse(server_url).map_err(|source| ClientSetupError::InvalidServerUrl {
            url: server_url.to_string(),
            source,
        })?;
    if base_url.cannot_be_a_base() {
        return Err(ClientSetupError::NotABaseUrl(server_url.to_string()));
    }
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    Ok(base_url)
}

/// Resolves an artifact URL the way a browser would against the page
/// origin: absolute URLs pass through, `/generated/..` is origin-relative.
pub fn resolve_artifact_url(base_url: &Url, url: &str) -> Result<Url, RemoteError> {
    base_url
        .join(url.trim())
        .map_err(|err| RemoteError::Malformed(format!("invalid artifact url '{url}': {err}")))
}

#[derive(Debug, Clone)]
pub struct LabelClient {
    http: Client,
    base_url: Url,
}

impl LabelClient {
    pub fn new(server_url: &str) -> Result<Self, ClientSetupError> {
        Self::with_http_client(Client::new(), server_url)
    }

    pub fn with_http_client(http: Client, server_url: &str) -> Result<Self, ClientSetupError> {
        let base_url = parse_base_url(server_url)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn resolve_url(&self, url: &str) -> Result<Url, RemoteError> {
        resolve_artifact_url(&self.base_url, url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| RemoteError::Malformed(format!("invalid endpoint '{path}': {err}")))
    }

    async fn post_report<T: DeserializeOwned>(
        &self,
        path: &str,
        file: &ReportFile,
    ) -> Result<T, RemoteError> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part(FILE_PART_NAME, part);
        let url = self.endpoint(path)?;
        info!(endpoint = path, file = %file.name, size_bytes = file.bytes.len(), "submitting report");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        read_json(path, response).await
    }
}

#[async_trait]
impl LabelService for LabelClient {
    async fn parse_report(&self, file: &ReportFile) -> Result<ParsedReport, RemoteError> {
        self.post_report(PARSE_PATH, file).await
    }

    async fn generate_label(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedLabel, RemoteError> {
        let url = self.endpoint(GENERATE_PATH)?;
        info!(endpoint = GENERATE_PATH, model = %request.model, "requesting label");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        read_json(GENERATE_PATH, response).await
    }

    async fn upload_report(&self, file: &ReportFile) -> Result<LegacyUploadResponse, RemoteError> {
        self.post_report(UPLOAD_PATH, file).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.resolve_url(url)?;
        let bytes = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;
        info!(%url, size_bytes = bytes.len(), "fetched label artifact");
        Ok(bytes.to_vec())
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport)?;
    decode_response(&body).map_err(|err| {
        warn!(endpoint, %status, error = %err, "label server returned an error");
        match err {
            RemoteError::Malformed(message) if !status.is_success() => {
                RemoteError::Malformed(format!("HTTP {status}: {message}"))
            }
            other => other,
        }
    })
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
