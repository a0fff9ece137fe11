use thiserror::Error;

/// Rejections raised before any request leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select a report file before uploading")]
    MissingFile,
    #[error("the IMEI must not be blank")]
    BlankImei,
    #[error("the battery life must not be blank")]
    BlankBatteryLife,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server answered with an `error` field.
    #[error("{0}")]
    Server(String),
    #[error("could not reach the label server: {0}")]
    Transport(String),
    #[error("unexpected response from the label server: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    LocalValidation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl WorkflowError {
    pub fn is_local(&self) -> bool {
        matches!(self, WorkflowError::LocalValidation(_))
    }
}
